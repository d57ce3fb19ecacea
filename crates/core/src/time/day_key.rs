use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate};

/// Compact day key used for snapshot dates and archive file names.
pub const DAY_KEY_FORMAT: &str = "%Y%m%d";

pub fn format_day_key(day: NaiveDate) -> String {
    day.format(DAY_KEY_FORMAT).to_string()
}

/// Accepts either the compact `YYYYMMDD` key or an ISO `YYYY-MM-DD` date.
pub fn parse_day(s: &str) -> anyhow::Result<NaiveDate> {
    let t = s.trim();
    NaiveDate::parse_from_str(t, DAY_KEY_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(t, "%Y-%m-%d"))
        .with_context(|| format!("invalid day key: {t}"))
}

/// Run day: explicit argument wins, otherwise the local calendar date.
pub fn resolve_run_day(day_arg: Option<&str>, now: DateTime<Local>) -> anyhow::Result<NaiveDate> {
    match day_arg {
        Some(s) => parse_day(s),
        None => Ok(now.date_naive()),
    }
}

/// Serde adapter storing a `NaiveDate` as a `YYYYMMDD` string.
pub mod serde_day_key {
    use super::{format_day_key, parse_day};
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_day_key(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        parse_day(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::super::{format_day_key, parse_day};
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(day: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
            match day {
                Some(d) => s.serialize_str(&format_day_key(*d)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            raw.filter(|s| !s.trim().is_empty())
                .map(|s| parse_day(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
