use anyhow::Context;
use chrono::{Datelike, NaiveDate};

// Session-scoped advisory lock; keeps two ranking runs for the same day from interleaving writes.
const LOCK_NAMESPACE: i64 = 0x534F_4C52_414E; // "SOLRAN"

fn lock_key_for_day(day: NaiveDate) -> i64 {
    LOCK_NAMESPACE ^ i64::from(day.num_days_from_ce())
}

/// Takes the lock on `conn`; release it on the same connection.
pub async fn try_acquire_day_lock(
    conn: &mut sqlx::PgConnection,
    day: NaiveDate,
) -> anyhow::Result<bool> {
    let key = lock_key_for_day(day);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_day_lock(conn: &mut sqlx::PgConnection, day: NaiveDate) -> anyhow::Result<()> {
    let key = lock_key_for_day(day);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to release advisory lock (key={key})"))?;
    Ok(())
}
