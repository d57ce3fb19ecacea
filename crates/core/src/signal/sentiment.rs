use crate::signal::types::{NewsItem, SignalSummary};
use chrono::{DateTime, Duration, Utc};

pub const MAX_MARKET_DELTA: i64 = 6;
pub const RECENT_WINDOW_DAYS: i64 = 7;

const POSITIVE_TERMS: &[&str] = &[
    "launch",
    "launched",
    "release",
    "released",
    "ga",
    "generally available",
    "update",
    "updated",
    "introduces",
    "introducing",
    "new",
    "partner",
    "partnership",
    "certified",
    "wins",
    "award",
    "improves",
    "improved",
    "secure",
    "security update",
    "performance",
];

const NEGATIVE_TERMS: &[&str] = &[
    "outage",
    "incident",
    "downtime",
    "breach",
    "vulnerability",
    "cve",
    "lawsuit",
    "fine",
    "bug",
    "issue",
    "degraded",
    "disruption",
    "leak",
    "hack",
    "compromised",
    "regression",
];

const AUTHORITY_TERMS: &[&str] = &[
    "g2",
    "trustradius",
    "trust radius",
    "gartner",
    "magic quadrant",
    "forrester",
    "forrester wave",
];

/// Term tables consulted by the scorer. All terms are matched lower-case as whole words.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTables {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub authority: Vec<String>,
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            positive: owned_terms(POSITIVE_TERMS),
            negative: owned_terms(NEGATIVE_TERMS),
            authority: owned_terms(AUTHORITY_TERMS),
        }
    }
}

fn owned_terms(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

/// Reduces a deduplicated item list to a bounded market delta plus counters.
pub fn score_items(items: &[NewsItem], tables: &KeywordTables, now: DateTime<Utc>) -> SignalSummary {
    let mut pos = 0u32;
    let mut neg = 0u32;
    let mut central_hits = 0u32;
    let mut recent = 0u32;
    let window_start = now - Duration::days(RECENT_WINDOW_DAYS);

    for item in items {
        let title = item.title.to_lowercase();
        pos += count_terms(&title, &tables.positive);
        neg += count_terms(&title, &tables.negative);
        central_hits += count_terms(&title, &tables.authority);

        if item.publish_date.is_some_and(|d| d >= window_start) {
            recent += 1;
        }
    }

    let mentions = u32::try_from(items.len()).unwrap_or(u32::MAX);
    let delta = market_delta(pos, neg, mentions, recent, central_hits);

    SignalSummary {
        delta,
        mentions,
        recent,
        pos,
        neg,
        central_hits,
    }
}

/// `clamp(round((pos-neg)*0.5 + ln(mentions+1)*0.6 + recent*0.10 + central*0.45), -6, 6)`.
///
/// Volume only enters through the log term, so polarity and authority mentions
/// dominate a pile of neutral coverage.
pub fn market_delta(pos: u32, neg: u32, mentions: u32, recent: u32, central_hits: u32) -> i64 {
    let polarity = f64::from(pos) - f64::from(neg);
    let raw = polarity * 0.5
        + (f64::from(mentions) + 1.0).ln() * 0.6
        + f64::from(recent) * 0.10
        + f64::from(central_hits) * 0.45;

    (raw.round() as i64).clamp(-MAX_MARKET_DELTA, MAX_MARKET_DELTA)
}

fn count_terms(haystack: &str, terms: &[String]) -> u32 {
    terms.iter().map(|t| count_term(haystack, t)).sum()
}

/// Counts non-overlapping occurrences of `term` bounded by non-alphanumeric chars.
fn count_term(haystack: &str, term: &str) -> u32 {
    if term.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut offset = 0;
    while let Some(pos) = haystack[offset..].find(term) {
        let start = offset + pos;
        let end = start + term.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());

        if before_ok && after_ok {
            count += 1;
            offset = end;
        } else {
            // Step past the first char of this match; keep on a char boundary.
            offset = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn counts_whole_terms_only() {
        assert_eq!(count_term("new release is ga", "ga"), 1);
        assert_eq!(count_term("gartner and garage", "ga"), 0);
        assert_eq!(count_term("news of the day", "new"), 0);
        assert_eq!(count_term("new, new and new!", "new"), 3);
        assert_eq!(count_term("g2 grid leader", "g2"), 1);
        assert_eq!(count_term("ship a security update", "security update"), 1);
        assert_eq!(count_term("café launch", "launch"), 1);
    }

    #[test]
    fn empty_items_produce_zero_signal() {
        let s = score_items(&[], &KeywordTables::default(), now());
        assert_eq!(s, SignalSummary::default());
    }

    #[test]
    fn scores_polarity_authority_and_recency() {
        let items = vec![
            NewsItem::new(
                "Acme launched new copilot",
                Some(Utc.with_ymd_and_hms(2026, 3, 9, 8, 0, 0).unwrap()),
            ),
            NewsItem::new(
                "Acme named a leader in Gartner Magic Quadrant",
                Some(Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()),
            ),
            NewsItem::new("Acme outage hits customers", None),
        ];

        let s = score_items(&items, &KeywordTables::default(), now());
        assert_eq!(s.mentions, 3);
        assert_eq!(s.pos, 2);
        assert_eq!(s.neg, 1);
        assert_eq!(s.central_hits, 2);
        assert_eq!(s.recent, 1);
        // (2-1)*0.5 + ln(4)*0.6 + 0.1 + 2*0.45 = 0.5 + 0.832 + 0.1 + 0.9 = 2.33
        assert_eq!(s.delta, 2);
    }

    #[test]
    fn undated_items_are_never_recent() {
        let items = vec![NewsItem::new("plain story", None)];
        let s = score_items(&items, &KeywordTables::default(), now());
        assert_eq!(s.recent, 0);
    }

    #[test]
    fn fixture_tables_replace_defaults() {
        let tables = KeywordTables {
            positive: vec!["shiny".to_string()],
            negative: vec![],
            authority: vec![],
        };
        let items = vec![NewsItem::new("Shiny launch", None)];
        let s = score_items(&items, &tables, now());
        assert_eq!(s.pos, 1);
    }

    #[test]
    fn delta_is_clamped() {
        assert_eq!(market_delta(100, 0, 50, 50, 50), MAX_MARKET_DELTA);
        assert_eq!(market_delta(0, 100, 0, 0, 0), -MAX_MARKET_DELTA);
        assert_eq!(market_delta(0, 0, 0, 0, 0), 0);
    }

    proptest! {
        #[test]
        fn delta_is_bounded(pos in 0u32..500, neg in 0u32..500, mentions in 0u32..500, recent in 0u32..500, central in 0u32..500) {
            let d = market_delta(pos, neg, mentions, recent, central);
            prop_assert!((-MAX_MARKET_DELTA..=MAX_MARKET_DELTA).contains(&d));
        }

        #[test]
        fn delta_is_monotone_per_input(pos in 0u32..100, neg in 0u32..100, mentions in 0u32..100, recent in 0u32..100, central in 0u32..100) {
            let d = market_delta(pos, neg, mentions, recent, central);
            prop_assert!(market_delta(pos + 1, neg, mentions, recent, central) >= d);
            prop_assert!(market_delta(pos, neg + 1, mentions, recent, central) <= d);
            prop_assert!(market_delta(pos, neg, mentions + 1, recent, central) >= d);
            prop_assert!(market_delta(pos, neg, mentions, recent + 1, central) >= d);
            prop_assert!(market_delta(pos, neg, mentions, recent, central + 1) >= d);
        }
    }
}
