use crate::domain::snapshot::{MarketMeta, RankedRow, Snapshot};
use crate::storage::HistoryStore;
use anyhow::Context;
use chrono::NaiveDate;
use uuid::Uuid;

type SnapshotHeader = (Uuid, NaiveDate, Option<NaiveDate>, serde_json::Value);
type RowTuple = (i64, String, String, String, i64, i64, serde_json::Value, Option<i64>);

#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: sqlx::PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    async fn load_snapshot(
        &self,
        header: Option<SnapshotHeader>,
    ) -> anyhow::Result<Option<Snapshot>> {
        let Some((id, day, prev_day, methodology)) = header else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, RowTuple>(
            "SELECT rank, name, website, category, score, market_delta, market_meta, delta_rank \
             FROM ranking_rows \
             WHERE snapshot_id = $1 \
             ORDER BY rank ASC",
        )
        .persistent(false)
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("select ranking_rows failed (snapshot_id={id})"))?;

        let mut out = Vec::with_capacity(rows.len());
        for (rank, name, website, category, score, market_delta, meta, delta_rank) in rows {
            let market_meta = serde_json::from_value::<MarketMeta>(meta)
                .with_context(|| format!("invalid market_meta for {name} on {day}"))?;
            out.push(RankedRow {
                name,
                website,
                category,
                score,
                market_delta,
                market_meta,
                rank,
                delta_rank,
            });
        }

        Ok(Some(Snapshot {
            date: day,
            prev_date: prev_day,
            methodology,
            rows: out,
        }))
    }
}

#[async_trait::async_trait]
impl HistoryStore for PgHistoryStore {
    fn store_name(&self) -> &'static str {
        "postgres"
    }

    async fn read_previous(&self, day: NaiveDate) -> anyhow::Result<Option<Snapshot>> {
        let header: Option<SnapshotHeader> = sqlx::query_as(
            "SELECT id, day, prev_day, methodology \
             FROM ranking_snapshots \
             WHERE day < $1 \
             ORDER BY day DESC \
             LIMIT 1",
        )
        .persistent(false)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .context("select previous ranking_snapshots failed")?;
        self.load_snapshot(header).await
    }

    async fn read_latest(&self) -> anyhow::Result<Option<Snapshot>> {
        let header: Option<SnapshotHeader> = sqlx::query_as(
            "SELECT id, day, prev_day, methodology \
             FROM ranking_snapshots \
             ORDER BY day DESC \
             LIMIT 1",
        )
        .persistent(false)
        .fetch_optional(&self.pool)
        .await
        .context("select latest ranking_snapshots failed")?;
        self.load_snapshot(header).await
    }

    async fn read_day(&self, day: NaiveDate) -> anyhow::Result<Option<Snapshot>> {
        let header: Option<SnapshotHeader> = sqlx::query_as(
            "SELECT id, day, prev_day, methodology \
             FROM ranking_snapshots \
             WHERE day = $1",
        )
        .persistent(false)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .context("select ranking_snapshots by day failed")?;
        self.load_snapshot(header).await
    }

    /// Replaces the day's snapshot and rows in one transaction.
    async fn write(&self, day: NaiveDate, snapshot: &Snapshot) -> anyhow::Result<()> {
        anyhow::ensure!(
            snapshot.date == day,
            "snapshot date mismatch: expected {day}, got {}",
            snapshot.date
        );

        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        sqlx::query("DELETE FROM ranking_snapshots WHERE day = $1")
            .persistent(false)
            .bind(day)
            .execute(&mut *tx)
            .await
            .context("delete ranking_snapshots failed")?;

        let snapshot_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO ranking_snapshots (id, day, prev_day, methodology, generated_at) \
             VALUES ($1, $2, $3, $4, now())",
        )
        .persistent(false)
        .bind(snapshot_id)
        .bind(day)
        .bind(snapshot.prev_date)
        .bind(&snapshot.methodology)
        .execute(&mut *tx)
        .await
        .context("insert ranking_snapshots failed")?;

        for row in &snapshot.rows {
            insert_row(&mut tx, snapshot_id, row).await?;
        }

        tx.commit().await.context("commit transaction failed")?;
        tracing::debug!(%day, %snapshot_id, rows = snapshot.rows.len(), "ranking snapshot persisted");
        Ok(())
    }
}

async fn insert_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    snapshot_id: Uuid,
    row: &RankedRow,
) -> anyhow::Result<()> {
    let meta = serde_json::to_value(row.market_meta).context("serialize market_meta failed")?;

    sqlx::query(
        "INSERT INTO ranking_rows (snapshot_id, rank, name, website, category, score, market_delta, market_meta, delta_rank) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .persistent(false)
    .bind(snapshot_id)
    .bind(row.rank)
    .bind(&row.name)
    .bind(&row.website)
    .bind(&row.category)
    .bind(row.score)
    .bind(row.market_delta)
    .bind(meta)
    .bind(row.delta_rank)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("insert ranking_rows failed (name={})", row.name))?;

    Ok(())
}
