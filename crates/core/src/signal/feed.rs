use crate::config::FeedSettings;
use anyhow::{Context, Result};
use std::time::Duration;

const MARKET_QUALIFIERS: &[&str] = &["AI", "agent", "copilot", "assistant", "automation", "platform"];
const AUTHORITY_QUALIFIERS: &[&str] = &["G2", "TrustRadius", "Gartner", "\"Magic Quadrant\"", "Forrester"];

/// Which of an entity's two feed queries a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Market,
    Authority,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Market => "market",
            FeedKind::Authority => "authority",
        }
    }

    pub fn query_for(&self, name: &str) -> String {
        let qualifiers = match self {
            FeedKind::Market => MARKET_QUALIFIERS,
            FeedKind::Authority => AUTHORITY_QUALIFIERS,
        };
        format!("\"{}\" ({})", name.trim(), qualifiers.join(" OR "))
    }
}

/// A text endpoint answering free-text queries with an RSS-style payload.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch(&self, query: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    http: reqwest::Client,
    base_url: String,
    language: String,
    region: String,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn from_settings(settings: &FeedSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("solrank/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build feed http client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
            region: settings.region.clone(),
            timeout: settings.timeout,
        })
    }

    fn edition(&self) -> String {
        let lang = self.language.split('-').next().unwrap_or("en");
        format!("{}:{}", self.region, lang)
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    fn source_name(&self) -> &'static str {
        "http_rss"
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let edition = self.edition();
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("hl", self.language.as_str()),
                ("gl", self.region.as_str()),
                ("ceid", edition.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .context("feed request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read feed response")?;
        if !status.is_success() {
            anyhow::bail!("feed HTTP {status}");
        }

        Ok(text)
    }
}
