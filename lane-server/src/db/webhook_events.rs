//! Gateway callback idempotency

use sqlx::PgPool;

/// Record a callback event. Returns `false` when it was already processed.
///
/// INSERT first and inspect `rows_affected`, so concurrent retries of the
/// same event cannot both pass.
pub async fn record(
    pool: &PgPool,
    provider: &str,
    event_id: &str,
    event_type: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, provider, event_type, processed_at)
         VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(provider)
    .bind(event_type)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Forget an event so the gateway's retry is processed again
pub async fn forget(pool: &PgPool, provider: &str, event_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE provider = $1 AND event_id = $2")
        .bind(provider)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}
