use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One ranked solution as supplied by the entity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub category: String,
    /// Raw quality baseline. Non-numeric values are treated as absent.
    #[serde(default, deserialize_with = "lenient_number")]
    pub base: Option<f64>,
    /// Raw agentic-capability signal. Non-numeric values are treated as absent.
    #[serde(default, deserialize_with = "lenient_number")]
    pub agentic: Option<f64>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: String::new(),
            category: String::new(),
            base: None,
            agentic: None,
        }
    }

    pub fn with_scores(mut self, base: Option<f64>, agentic: Option<f64>) -> Self {
        self.base = base;
        self.agentic = agentic;
        self
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_f64()).filter(|n| n.is_finite()))
}

/// Parses and validates the entity list. Any failure here is fatal for the run.
pub fn parse_entities(text: &str) -> anyhow::Result<Vec<Entity>> {
    let entities: Vec<Entity> =
        serde_json::from_str(text).context("entity list is not a valid JSON array of solutions")?;

    let mut seen = BTreeSet::new();
    for e in &entities {
        let name = e.name.trim();
        anyhow::ensure!(!name.is_empty(), "solution name must be non-empty");
        anyhow::ensure!(seen.insert(name.to_string()), "duplicate solution name: {name}");
    }

    Ok(entities)
}

pub async fn load_entities(path: &Path) -> anyhow::Result<Vec<Entity>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read entity list {}", path.display()))?;
    parse_entities(&text).with_context(|| format!("invalid entity list {}", path.display()))
}
