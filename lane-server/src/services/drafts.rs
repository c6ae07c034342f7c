//! Removal of checkout drafts that were never paid

use std::time::Duration;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Creation time before which an unpaid draft is stale
pub fn draft_cutoff(now: i64, ttl_minutes: i64) -> i64 {
    now - ttl_minutes.max(0) * 60_000
}

/// Delete stale drafts and announce their removal
pub async fn sweep(state: &AppState) -> ServiceResult<usize> {
    let cutoff = draft_cutoff(shared::util::now_millis(), state.draft_order_ttl_minutes);
    let deleted = db::orders::delete_stale_drafts(&state.pool, cutoff).await?;

    for id in &deleted {
        state.live_orders.publish_remove(*id);
    }
    if !deleted.is_empty() {
        tracing::info!(count = deleted.len(), "Stale draft orders deleted");
    }
    Ok(deleted.len())
}

/// Run `sweep` every 10 minutes for the lifetime of the process
pub fn spawn_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sweep(&state).await {
                let err: shared::error::AppError = e.into();
                tracing::warn!(error = %err, "Draft sweep failed");
            }
        }
    })
}
