pub mod file;
pub mod lock;
pub mod postgres;

use crate::config::Settings;
use crate::domain::snapshot::Snapshot;
use anyhow::Context;
use chrono::NaiveDate;
use std::sync::Arc;

/// Day-keyed snapshot history.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    fn store_name(&self) -> &'static str;

    /// Most recent snapshot dated strictly before `day`.
    async fn read_previous(&self, day: NaiveDate) -> anyhow::Result<Option<Snapshot>>;

    async fn read_latest(&self) -> anyhow::Result<Option<Snapshot>>;

    async fn read_day(&self, day: NaiveDate) -> anyhow::Result<Option<Snapshot>>;

    async fn write(&self, day: NaiveDate, snapshot: &Snapshot) -> anyhow::Result<()>;
}

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Connects and applies the embedded migrations.
pub async fn connect_pool(db_url: &str) -> anyhow::Result<sqlx::PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Postgres when `DATABASE_URL` is configured, the ranking directory otherwise.
pub async fn open_history_store(settings: &Settings) -> anyhow::Result<Arc<dyn HistoryStore>> {
    match settings.database_url.as_deref() {
        Some(db_url) => {
            let pool = connect_pool(db_url).await?;
            Ok(Arc::new(postgres::PgHistoryStore::new(pool)))
        }
        None => Ok(Arc::new(file::FileHistoryStore::new(&settings.ranking_dir))),
    }
}
