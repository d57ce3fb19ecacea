use crate::domain::entity::Entity;
use crate::domain::snapshot::{RankedRow, Snapshot};
use crate::rank::baseline::{self, Baseline, SCORE_MAX, SCORE_MIN};
use crate::signal::sentiment::MAX_MARKET_DELTA;
use crate::signal::types::SignalSummary;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Largest score change allowed against the prior snapshot for the same entity.
pub const DAILY_MOVE_CAP: i64 = 2;

const BASE_WEIGHT: f64 = 0.70;
const AGENTIC_WEIGHT: f64 = 0.30;

const SCORE_MIN_INT: i64 = SCORE_MIN as i64;
const SCORE_MAX_INT: i64 = SCORE_MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorEntry {
    pub score: i64,
    pub rank: i64,
}

/// Score and rank lookup over the previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct PriorRanking {
    pub date: Option<NaiveDate>,
    by_name: HashMap<String, PriorEntry>,
}

impl PriorRanking {
    pub fn from_snapshot(snapshot: Option<&Snapshot>) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::default();
        };

        let mut by_name = HashMap::with_capacity(snapshot.rows.len());
        for row in &snapshot.rows {
            // Keep the first row if a corrupted snapshot repeats a name.
            by_name.entry(row.name.clone()).or_insert(PriorEntry {
                score: row.score,
                rank: row.rank,
            });
        }

        Self {
            date: Some(snapshot.date),
            by_name,
        }
    }

    pub fn get(&self, name: &str) -> Option<PriorEntry> {
        self.by_name.get(name).copied()
    }
}

/// `clamp(round(0.70*clamp(base + delta) + 0.30*agentic))` on the score scale.
pub fn fuse_score(baseline: Baseline, market_delta: i64) -> i64 {
    let base_market = baseline::clamp_score(baseline.base + market_delta as f64);
    let raw = BASE_WEIGHT * base_market + AGENTIC_WEIGHT * baseline.agentic;
    clamp_score_int(raw.round() as i64)
}

/// Limits movement against the prior score; entities without one pass through.
pub fn cap_daily_move(raw_score: i64, prior_score: Option<i64>) -> i64 {
    let capped = match prior_score {
        Some(p) => raw_score.clamp(
            p.saturating_sub(DAILY_MOVE_CAP),
            p.saturating_add(DAILY_MOVE_CAP),
        ),
        None => raw_score,
    };
    clamp_score_int(capped)
}

fn clamp_score_int(v: i64) -> i64 {
    v.clamp(SCORE_MIN_INT, SCORE_MAX_INT)
}

/// Scores, caps, ranks and diffs every entity. `signals` is index-aligned with `entities`;
/// a missing slot is a zero signal.
pub fn rank_entities(
    entities: &[Entity],
    signals: &[Option<SignalSummary>],
    prior: &PriorRanking,
) -> Vec<RankedRow> {
    let mut scored: Vec<(usize, RankedRow)> = entities
        .iter()
        .enumerate()
        .map(|(idx, entity)| {
            let signal = signals.get(idx).copied().flatten().unwrap_or_default();
            let market_delta = signal.delta.clamp(-MAX_MARKET_DELTA, MAX_MARKET_DELTA);

            let normalized = baseline::normalize(entity.base, entity.agentic);
            let raw_score = fuse_score(normalized, market_delta);
            let prior_score = prior.get(&entity.name).map(|p| p.score);
            let score = cap_daily_move(raw_score, prior_score);

            let row = RankedRow {
                name: entity.name.clone(),
                website: entity.website.clone(),
                category: entity.category.clone(),
                score,
                market_delta,
                market_meta: signal.meta(),
                rank: 0,
                delta_rank: None,
            };
            (idx, row)
        })
        .collect();

    // Exact ties keep entity-list order.
    scored.sort_by(|(ia, a), (ib, b)| b.score.cmp(&a.score).then_with(|| ia.cmp(ib)));

    scored
        .into_iter()
        .enumerate()
        .map(|(pos, (_, mut row))| {
            row.rank = pos as i64 + 1;
            row.delta_rank = prior.get(&row.name).map(|p| p.rank - row.rank);
            row
        })
        .collect()
}

pub fn build_snapshot(
    day: NaiveDate,
    entities: &[Entity],
    signals: &[Option<SignalSummary>],
    prior: Option<&Snapshot>,
) -> Snapshot {
    let prior_ranking = PriorRanking::from_snapshot(prior);
    let rows = rank_entities(entities, signals, &prior_ranking);

    Snapshot {
        date: day,
        prev_date: prior_ranking.date,
        methodology: methodology(),
        rows,
    }
}

pub fn methodology() -> serde_json::Value {
    serde_json::json!({
        "formula": "score = clamp(round(0.70*clamp(base + market_delta, 60, 95) + 0.30*agentic), 60, 95)",
        "base": "clamp(base ?? 75, 60, 95)",
        "agentic": "clamp(60 + (agentic ?? 10)*1.1, 60, 95)",
        "market_delta": "clamp(round((pos-neg)*0.5 + ln(mentions+1)*0.6 + recent*0.10 + centralHits*0.45), -6, 6)",
        "daily_move_cap": DAILY_MOVE_CAP,
        "tie_break": "entity list order",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn signal(delta: i64) -> Option<SignalSummary> {
        Some(SignalSummary {
            delta,
            ..SignalSummary::default()
        })
    }

    #[test]
    fn worked_example_without_prior() {
        let acme = Entity::new("Acme").with_scores(Some(80.0), Some(20.0));
        let snap = build_snapshot(day(1), &[acme], &[signal(0)], None);

        assert_eq!(snap.prev_date, None);
        assert_eq!(snap.rows[0].score, 81);
        assert_eq!(snap.rows[0].rank, 1);
        assert_eq!(snap.rows[0].delta_rank, None);
    }

    #[test]
    fn worked_example_capped_against_prior() {
        let acme = Entity::new("Acme").with_scores(Some(80.0), Some(20.0));
        let prior = Snapshot {
            date: day(1),
            prev_date: None,
            methodology: serde_json::Value::Null,
            rows: vec![RankedRow {
                name: "Acme".to_string(),
                website: String::new(),
                category: String::new(),
                score: 70,
                market_delta: 0,
                market_meta: Default::default(),
                rank: 1,
                delta_rank: None,
            }],
        };

        let snap = build_snapshot(day(2), &[acme], &[signal(0)], Some(&prior));
        assert_eq!(snap.prev_date, Some(day(1)));
        assert_eq!(snap.rows[0].score, 72);
        assert_eq!(snap.rows[0].delta_rank, Some(0));
    }

    #[test]
    fn missing_signal_slot_is_zero_signal() {
        let acme = Entity::new("Acme").with_scores(Some(80.0), Some(20.0));
        let rows = rank_entities(&[acme], &[], &PriorRanking::default());
        assert_eq!(rows[0].score, 81);
        assert_eq!(rows[0].market_delta, 0);
    }

    #[test]
    fn inverted_scores_flip_delta_rank() {
        let entities = [
            Entity::new("A").with_scores(Some(90.0), None),
            Entity::new("B").with_scores(Some(85.0), None),
        ];
        let first = build_snapshot(day(1), &entities, &[None, None], None);
        let ranks: Vec<_> = first
            .rows
            .iter()
            .map(|r| (r.name.as_str(), r.score, r.rank))
            .collect();
        assert_eq!(ranks, vec![("A", 84, 1), ("B", 81, 2)]);

        // Swapped baselines: raw scores 81 / 84, capped to 82 / 83 against the prior day.
        let entities = [
            Entity::new("A").with_scores(Some(85.0), None),
            Entity::new("B").with_scores(Some(90.0), None),
        ];
        let second = build_snapshot(day(2), &entities, &[None, None], Some(&first));

        let b = second.row("B").unwrap();
        let a = second.row("A").unwrap();
        assert_eq!((b.score, b.rank, b.delta_rank), (83, 1, Some(1)));
        assert_eq!((a.score, a.rank, a.delta_rank), (82, 2, Some(-1)));
    }

    #[test]
    fn exact_ties_keep_entity_order() {
        let entities = [
            Entity::new("Zeta").with_scores(Some(80.0), Some(20.0)),
            Entity::new("Alpha").with_scores(Some(80.0), Some(20.0)),
            Entity::new("Mid").with_scores(Some(90.0), Some(20.0)),
        ];
        let rows = rank_entities(&entities, &[None, None, None], &PriorRanking::default());
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Mid", "Zeta", "Alpha"]);
        assert_eq!(rows[1].score, rows[2].score);
    }

    #[test]
    fn delta_rank_absent_only_for_new_entities() {
        let prior = Snapshot {
            date: day(1),
            prev_date: None,
            methodology: serde_json::Value::Null,
            rows: vec![RankedRow {
                name: "Old".to_string(),
                website: String::new(),
                category: String::new(),
                score: 80,
                market_delta: 0,
                market_meta: Default::default(),
                rank: 2,
                delta_rank: None,
            }],
        };
        let entities = [
            Entity::new("New").with_scores(Some(95.0), Some(40.0)),
            Entity::new("Old").with_scores(Some(80.0), Some(20.0)),
        ];

        let snap = build_snapshot(day(2), &entities, &[None, None], Some(&prior));
        assert_eq!(snap.row("New").unwrap().delta_rank, None);
        assert_eq!(snap.row("Old").unwrap().delta_rank, Some(0));
    }

    #[test]
    fn market_delta_moves_fused_score() {
        let b = baseline::normalize(Some(80.0), Some(20.0));
        assert_eq!(fuse_score(b, 0), 81);
        assert_eq!(fuse_score(b, 6), 85);
        assert_eq!(fuse_score(b, -6), 76);
    }

    #[test]
    fn cap_passes_through_without_prior() {
        assert_eq!(cap_daily_move(90, None), 90);
        assert_eq!(cap_daily_move(90, Some(80)), 82);
        assert_eq!(cap_daily_move(70, Some(80)), 78);
        assert_eq!(cap_daily_move(81, Some(80)), 81);
    }

    proptest! {
        #[test]
        fn scores_stay_on_scale(
            base in proptest::option::of(-500.0f64..500.0),
            agentic in proptest::option::of(-500.0f64..500.0),
            delta in -6i64..=6,
            prior in proptest::option::of(60i64..=95),
        ) {
            let raw = fuse_score(baseline::normalize(base, agentic), delta);
            prop_assert!((60..=95).contains(&raw));
            let score = cap_daily_move(raw, prior);
            prop_assert!((60..=95).contains(&score));
            if let Some(p) = prior {
                prop_assert!((score - p).abs() <= DAILY_MOVE_CAP);
            }
        }

        #[test]
        fn ranks_are_a_permutation_in_score_order(
            bases in proptest::collection::vec(50.0f64..100.0, 1..40),
        ) {
            let entities: Vec<Entity> = bases
                .iter()
                .enumerate()
                .map(|(i, b)| Entity::new(format!("E{i}")).with_scores(Some(*b), None))
                .collect();
            let rows = rank_entities(&entities, &[], &PriorRanking::default());

            let mut ranks: Vec<i64> = rows.iter().map(|r| r.rank).collect();
            ranks.sort_unstable();
            prop_assert_eq!(ranks, (1..=entities.len() as i64).collect::<Vec<_>>());
            prop_assert!(rows.windows(2).all(|w| w[0].score >= w[1].score));
            prop_assert!(rows.iter().all(|r| r.delta_rank.is_none()));
        }
    }
}
