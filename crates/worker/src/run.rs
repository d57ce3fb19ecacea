use chrono::{DateTime, NaiveDate, Utc};
use solrank_core::domain::entity::Entity;
use solrank_core::domain::snapshot::Snapshot;
use solrank_core::rank::engine::build_snapshot;
use solrank_core::signal::collector::{SignalCollector, SignalReport};
use solrank_core::storage::HistoryStore;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub day: NaiveDate,
    pub now: DateTime<Utc>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: Snapshot,
    pub failed_fetches: usize,
    pub written: bool,
}

/// One daily ranking pass. Only a history write failure is returned as an error here;
/// signal and history-read problems degrade to neutral inputs.
pub async fn run_ranking(
    entities: &[Entity],
    collector: Option<&SignalCollector>,
    store: &dyn HistoryStore,
    opts: &RunOptions,
) -> anyhow::Result<RunOutcome> {
    let prior = match store.read_previous(opts.day).await {
        Ok(prior) => prior,
        Err(err) => {
            tracing::warn!(
                day = %opts.day,
                store = store.store_name(),
                error = %format!("{err:#}"),
                "prior snapshot unreadable; ranking without reference"
            );
            None
        }
    };
    match prior.as_ref() {
        Some(p) => tracing::info!(prev_date = %p.date, rows = p.rows.len(), "loaded prior snapshot"),
        None => tracing::info!("no prior snapshot; delta_rank and daily cap disabled"),
    }

    let report = match collector {
        Some(collector) => collector.collect(entities, opts.now).await,
        None => SignalReport::offline(entities.len()),
    };

    let snapshot = build_snapshot(opts.day, entities, &report.signals, prior.as_ref());

    let top = snapshot.rows.first();
    tracing::info!(
        day = %opts.day,
        entities = snapshot.rows.len(),
        failed_fetches = report.failed_fetches,
        top = top.map(|r| r.name.as_str()).unwrap_or(""),
        top_score = top.map(|r| r.score).unwrap_or(0),
        "ranking computed"
    );

    if opts.dry_run {
        tracing::info!(day = %opts.day, dry_run = true, "skipping snapshot write");
        return Ok(RunOutcome {
            snapshot,
            failed_fetches: report.failed_fetches,
            written: false,
        });
    }

    store.write(opts.day, &snapshot).await?;
    tracing::info!(day = %opts.day, store = store.store_name(), "snapshot persisted");

    Ok(RunOutcome {
        snapshot,
        failed_fetches: report.failed_fetches,
        written: true,
    })
}
