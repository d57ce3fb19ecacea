use anyhow::Context;
use clap::Parser;
use solrank_core::signal::collector::SignalCollector;
use solrank_core::signal::feed::HttpFeedSource;
use solrank_core::signal::sentiment::KeywordTables;
use solrank_core::storage::file::FileHistoryStore;
use solrank_core::storage::postgres::PgHistoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod run;

#[derive(Debug, Parser)]
#[command(name = "solrank_worker")]
struct Args {
    /// Entity list (JSON array of solutions).
    #[arg(long, default_value = "solutions.json")]
    solutions: PathBuf,

    /// Ranking day (YYYY-MM-DD or YYYYMMDD). Defaults to today's local date.
    #[arg(long)]
    date: Option<String>,

    /// Compute and log the ranking without writing history.
    #[arg(long)]
    dry_run: bool,

    /// Skip feed retrieval; every entity gets a zero market signal.
    #[arg(long)]
    offline: bool,

    /// Override FEED_CONCURRENCY.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = solrank_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run_worker(args, settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "ranking run failed");
    }
    result
}

async fn run_worker(args: Args, settings: solrank_core::config::Settings) -> anyhow::Result<()> {
    let now = chrono::Local::now();
    let day = solrank_core::time::day_key::resolve_run_day(args.date.as_deref(), now)?;

    // The only fatal input: nothing is written when the entity list is unusable.
    let entities = solrank_core::domain::entity::load_entities(&args.solutions).await?;
    tracing::info!(%day, entities = entities.len(), solutions = %args.solutions.display(), "entity list loaded");

    let collector = if args.offline {
        tracing::info!("offline run; skipping feed retrieval");
        None
    } else {
        let source = HttpFeedSource::from_settings(&settings.feed)?;
        let concurrency = args.concurrency.unwrap_or(settings.feed.concurrency);
        Some(SignalCollector::new(
            Arc::new(source),
            KeywordTables::default(),
            concurrency,
        ))
    };

    let opts = run::RunOptions {
        day,
        now: now.with_timezone(&chrono::Utc),
        dry_run: args.dry_run,
    };

    let Some(db_url) = settings.database_url.as_deref() else {
        let store = FileHistoryStore::new(&settings.ranking_dir);
        let outcome = run::run_ranking(&entities, collector.as_ref(), &store, &opts).await?;
        log_outcome(&outcome);
        return Ok(());
    };

    let pool = solrank_core::storage::connect_pool(db_url).await?;
    let store = PgHistoryStore::new(pool);

    let mut lock_conn = store
        .pool()
        .acquire()
        .await
        .context("acquire lock connection failed")?;
    let acquired = solrank_core::storage::lock::try_acquire_day_lock(&mut lock_conn, day).await?;
    ensure_day_lock(acquired, day)?;

    let result = run::run_ranking(&entities, collector.as_ref(), &store, &opts).await;

    if let Err(err) = solrank_core::storage::lock::release_day_lock(&mut lock_conn, day).await {
        tracing::warn!(%day, error = %err, "failed to release day lock");
    }

    log_outcome(&result?);
    Ok(())
}

/// A run that loses the day lock writes nothing and must not report success.
fn ensure_day_lock(acquired: bool, day: chrono::NaiveDate) -> anyhow::Result<()> {
    anyhow::ensure!(
        acquired,
        "day lock for {day} not acquired; another ranking run in progress"
    );
    Ok(())
}

fn log_outcome(outcome: &run::RunOutcome) {
    tracing::info!(
        day = %outcome.snapshot.date,
        rows = outcome.snapshot.rows.len(),
        failed_fetches = outcome.failed_fetches,
        written = outcome.written,
        "ranking run finished"
    );
}

fn init_sentry(settings: &solrank_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
