use crate::domain::snapshot::MarketMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub publish_date: Option<DateTime<Utc>>,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, publish_date: Option<DateTime<Utc>>) -> Self {
        Self {
            title: title.into(),
            publish_date,
        }
    }
}

/// Per-entity market signal. `Default` is the zero signal used for degraded entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub delta: i64,
    pub mentions: u32,
    pub recent: u32,
    pub pos: u32,
    pub neg: u32,
    pub central_hits: u32,
}

impl SignalSummary {
    pub fn meta(&self) -> MarketMeta {
        MarketMeta {
            mentions: self.mentions,
            recent: self.recent,
            pos: self.pos,
            neg: self.neg,
            central_hits: self.central_hits,
        }
    }
}
