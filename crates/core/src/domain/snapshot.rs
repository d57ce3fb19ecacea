use crate::time::day_key::serde_day_key;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted daily ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "serde_day_key")]
    pub date: NaiveDate,
    #[serde(default, with = "serde_day_key::option")]
    pub prev_date: Option<NaiveDate>,
    #[serde(default)]
    pub methodology: serde_json::Value,
    pub rows: Vec<RankedRow>,
}

impl Snapshot {
    pub fn row(&self, name: &str) -> Option<&RankedRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub category: String,
    pub score: i64,
    #[serde(default)]
    pub market_delta: i64,
    #[serde(default)]
    pub market_meta: MarketMeta,
    pub rank: i64,
    /// `prior_rank - rank`; `None` (serialized as `null`) when there is no prior reference.
    #[serde(default)]
    pub delta_rank: Option<i64>,
}

/// Descriptive counters behind a row's market delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMeta {
    pub mentions: u32,
    pub recent: u32,
    pub pos: u32,
    pub neg: u32,
    #[serde(rename = "centralHits")]
    pub central_hits: u32,
}
