use crate::domain::snapshot::Snapshot;
use crate::storage::HistoryStore;
use crate::time::day_key::{format_day_key, parse_day};
use anyhow::Context;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

const LATEST_FILE: &str = "ranking.json";
const HISTORY_DIR: &str = "history";

/// `ranking.json` holds the latest snapshot; `history/<YYYYMMDD>.json` keeps one file per day.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    root: PathBuf,
}

impl FileHistoryStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn latest_path(&self) -> PathBuf {
        self.root.join(LATEST_FILE)
    }

    fn history_dir(&self) -> PathBuf {
        self.root.join(HISTORY_DIR)
    }

    fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.history_dir().join(format!("{}.json", format_day_key(day)))
    }

    /// Archived days, ascending.
    async fn archived_days(&self) -> anyhow::Result<Vec<NaiveDate>> {
        let dir = self.history_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to list {}", dir.display()))
            }
        };

        let mut days = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("failed to list {}", dir.display()))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(day) = parse_day(stem) {
                days.push(day);
            }
        }
        days.sort_unstable();
        Ok(days)
    }
}

#[async_trait::async_trait]
impl HistoryStore for FileHistoryStore {
    fn store_name(&self) -> &'static str {
        "file"
    }

    async fn read_previous(&self, day: NaiveDate) -> anyhow::Result<Option<Snapshot>> {
        let archived = self
            .archived_days()
            .await?
            .into_iter()
            .rev()
            .find(|d| *d < day);
        if let Some(prev) = archived {
            return read_snapshot(&self.day_path(prev)).await;
        }

        // Directories written before the archive existed only carry the latest pointer.
        let latest = read_snapshot(&self.latest_path()).await?;
        Ok(latest.filter(|s| s.date < day))
    }

    async fn read_latest(&self) -> anyhow::Result<Option<Snapshot>> {
        read_snapshot(&self.latest_path()).await
    }

    async fn read_day(&self, day: NaiveDate) -> anyhow::Result<Option<Snapshot>> {
        if let Some(snapshot) = read_snapshot(&self.day_path(day)).await? {
            return Ok(Some(snapshot));
        }
        let latest = read_snapshot(&self.latest_path()).await?;
        Ok(latest.filter(|s| s.date == day))
    }

    async fn write(&self, day: NaiveDate, snapshot: &Snapshot) -> anyhow::Result<()> {
        anyhow::ensure!(
            snapshot.date == day,
            "snapshot date mismatch: expected {day}, got {}",
            snapshot.date
        );

        let body = serde_json::to_vec_pretty(snapshot).context("serialize snapshot failed")?;

        let dir = self.history_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        write_atomic(&self.day_path(day), &body).await?;

        // Backfills of older days must not move the latest pointer backwards.
        let latest_date = match read_snapshot(&self.latest_path()).await {
            Ok(latest) => latest.map(|s| s.date),
            Err(err) => {
                tracing::warn!(error = %err, "unreadable latest ranking; overwriting");
                None
            }
        };
        if latest_date.map_or(true, |d| d <= day) {
            write_atomic(&self.latest_path(), &body).await?;
        }

        Ok(())
    }
}

async fn read_snapshot(path: &Path) -> anyhow::Result<Option<Snapshot>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("failed to read {}", path.display())),
    };

    let snapshot = serde_json::from_str::<Snapshot>(&text)
        .with_context(|| format!("invalid snapshot JSON in {}", path.display()))?;
    Ok(Some(snapshot))
}

async fn write_atomic(path: &Path, body: &[u8]) -> anyhow::Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move snapshot into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::{MarketMeta, RankedRow};

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("solrank-test-{}", uuid::Uuid::new_v4()))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn snapshot(d: u32, score: i64) -> Snapshot {
        Snapshot {
            date: day(d),
            prev_date: None,
            methodology: serde_json::json!({}),
            rows: vec![RankedRow {
                name: "Acme".to_string(),
                website: String::new(),
                category: String::new(),
                score,
                market_delta: 0,
                market_meta: MarketMeta::default(),
                rank: 1,
                delta_rank: None,
            }],
        }
    }

    #[tokio::test]
    async fn empty_directory_has_no_history() {
        let store = FileHistoryStore::new(temp_root());
        assert!(store.read_previous(day(2)).await.unwrap().is_none());
        assert!(store.read_latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn previous_is_strictly_before_run_day() {
        let root = temp_root();
        let store = FileHistoryStore::new(&root);
        store.write(day(1), &snapshot(1, 80)).await.unwrap();
        store.write(day(3), &snapshot(3, 82)).await.unwrap();

        let prev = store.read_previous(day(3)).await.unwrap().unwrap();
        assert_eq!(prev.date, day(1));
        let prev = store.read_previous(day(4)).await.unwrap().unwrap();
        assert_eq!(prev.date, day(3));
        assert!(store.read_previous(day(1)).await.unwrap().is_none());

        assert_eq!(store.read_latest().await.unwrap().unwrap().date, day(3));
        assert_eq!(store.read_day(day(1)).await.unwrap().unwrap().rows[0].score, 80);
        assert!(store.read_day(day(2)).await.unwrap().is_none());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn backfill_keeps_latest_pointer() {
        let root = temp_root();
        let store = FileHistoryStore::new(&root);
        store.write(day(5), &snapshot(5, 80)).await.unwrap();
        store.write(day(2), &snapshot(2, 70)).await.unwrap();

        assert_eq!(store.read_latest().await.unwrap().unwrap().date, day(5));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn falls_back_to_latest_pointer_without_archive() {
        let root = temp_root();
        tokio::fs::create_dir_all(&root).await.unwrap();
        let body = serde_json::to_vec(&snapshot(1, 77)).unwrap();
        tokio::fs::write(root.join(LATEST_FILE), body).await.unwrap();

        let store = FileHistoryStore::new(&root);
        let prev = store.read_previous(day(2)).await.unwrap().unwrap();
        assert_eq!(prev.rows[0].score, 77);
        assert!(store.read_previous(day(1)).await.unwrap().is_none());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error_not_absent() {
        let root = temp_root();
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(root.join(LATEST_FILE), b"{not json").await.unwrap();

        let store = FileHistoryStore::new(&root);
        assert!(store.read_latest().await.is_err());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn rejects_mismatched_day() {
        let store = FileHistoryStore::new(temp_root());
        assert!(store.write(day(2), &snapshot(1, 80)).await.is_err());
    }
}
