use crate::domain::entity::Entity;
use crate::signal::feed::{FeedKind, FeedSource};
use crate::signal::parser::{dedup_items, parse_feed};
use crate::signal::sentiment::{score_items, KeywordTables};
use crate::signal::types::{NewsItem, SignalSummary};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_CONCURRENCY: usize = 6;

/// Output of one collection pass, aligned with the input entity order.
#[derive(Debug, Clone, Default)]
pub struct SignalReport {
    /// `None` means no signal could be produced for that entity (worker failure).
    pub signals: Vec<Option<SignalSummary>>,
    pub failed_fetches: usize,
}

impl SignalReport {
    /// Report for runs that skip retrieval entirely.
    pub fn offline(len: usize) -> Self {
        Self {
            signals: vec![None; len],
            failed_fetches: 0,
        }
    }
}

#[derive(Clone)]
pub struct SignalCollector {
    source: Arc<dyn FeedSource>,
    tables: Arc<KeywordTables>,
    concurrency: usize,
}

impl SignalCollector {
    pub fn new(source: Arc<dyn FeedSource>, tables: KeywordTables, concurrency: usize) -> Self {
        Self {
            source,
            tables: Arc::new(tables),
            concurrency: concurrency.max(1),
        }
    }

    /// Fetches and scores every entity under the concurrency ceiling and waits for all of
    /// them before returning.
    pub async fn collect(&self, entities: &[Entity], now: DateTime<Utc>) -> SignalReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (idx, entity) in entities.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let source = Arc::clone(&self.source);
            let tables = Arc::clone(&self.tables);
            let name = entity.name.clone();

            tasks.spawn(async move {
                // The semaphore is never closed; a failed acquire only drops the limit.
                let _permit = semaphore.acquire_owned().await.ok();
                let (items, failures) = fetch_entity_items(source.as_ref(), &name).await;
                let summary = score_items(&items, &tables, now);
                tracing::debug!(
                    entity = %name,
                    mentions = summary.mentions,
                    delta = summary.delta,
                    "entity signal computed"
                );
                (idx, summary, failures)
            });
        }

        let mut report = SignalReport {
            signals: vec![None; entities.len()],
            failed_fetches: 0,
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, summary, failures)) => {
                    report.signals[idx] = Some(summary);
                    report.failed_fetches += failures;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "signal worker failed; entity falls back to zero signal");
                }
            }
        }

        report
    }
}

/// Runs both sub-fetches for one entity concurrently. A failed sub-fetch contributes no items.
async fn fetch_entity_items(source: &dyn FeedSource, name: &str) -> (Vec<NewsItem>, usize) {
    let (market, authority) = tokio::join!(
        fetch_kind(source, name, FeedKind::Market),
        fetch_kind(source, name, FeedKind::Authority),
    );

    let mut failures = 0;
    let mut feeds = Vec::with_capacity(2);
    for res in [market, authority] {
        match res {
            Some(items) => feeds.push(items),
            None => failures += 1,
        }
    }

    (dedup_items(feeds), failures)
}

async fn fetch_kind(source: &dyn FeedSource, name: &str, kind: FeedKind) -> Option<Vec<NewsItem>> {
    let query = kind.query_for(name);
    match source.fetch(&query).await {
        Ok(text) => {
            let items = parse_feed(&text);
            tracing::debug!(entity = %name, feed = kind.as_str(), items = items.len(), "feed parsed");
            Some(items)
        }
        Err(err) => {
            tracing::warn!(
                entity = %name,
                feed = kind.as_str(),
                source = source.source_name(),
                error = %err,
                "feed fetch failed; using empty item set"
            );
            None
        }
    }
}
