pub mod domain;
pub mod rank;
pub mod signal;
pub mod storage;
pub mod time;

pub mod config {
    use crate::signal::collector::DEFAULT_CONCURRENCY;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_FEED_BASE_URL: &str = "https://news.google.com/rss/search";
    const DEFAULT_FEED_TIMEOUT_SECS: u64 = 12;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub ranking_dir: PathBuf,
        pub feed: FeedSettings,
    }

    #[derive(Debug, Clone)]
    pub struct FeedSettings {
        pub base_url: String,
        pub timeout: Duration,
        pub concurrency: usize,
        pub language: String,
        pub region: String,
    }

    impl Default for FeedSettings {
        fn default() -> Self {
            Self {
                base_url: DEFAULT_FEED_BASE_URL.to_string(),
                timeout: Duration::from_secs(DEFAULT_FEED_TIMEOUT_SECS),
                concurrency: DEFAULT_CONCURRENCY,
                language: "en-US".to_string(),
                region: "US".to_string(),
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = FeedSettings::default();

            let timeout_secs = std::env::var("FEED_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_FEED_TIMEOUT_SECS);

            let concurrency = std::env::var("FEED_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(DEFAULT_CONCURRENCY);

            let feed = FeedSettings {
                base_url: non_empty_var("FEED_BASE_URL").unwrap_or(defaults.base_url),
                timeout: Duration::from_secs(timeout_secs),
                concurrency,
                language: non_empty_var("FEED_LANGUAGE").unwrap_or(defaults.language),
                region: non_empty_var("FEED_REGION").unwrap_or(defaults.region),
            };

            Ok(Self {
                database_url: non_empty_var("DATABASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                ranking_dir: non_empty_var("RANKING_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
                feed,
            })
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
