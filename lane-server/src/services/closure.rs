//! Restaurant open/closed state
//!
//! Stored as three `theme_settings` rows in the global scope. Manual closure
//! wins over a scheduled window; window bounds are inclusive.

use chrono::{DateTime, Utc};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ClosureReason, ClosureSettings, ClosureStatus, GLOBAL_SCOPE, ScheduledClosureUpdate,
    SettingUpsert,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

pub const MANUAL_KEY: &str = "restaurant_manually_closed";
pub const SCHEDULED_START_KEY: &str = "restaurant_scheduled_start";
pub const SCHEDULED_END_KEY: &str = "restaurant_scheduled_end";
pub const CLOSURE_KEYS: [&str; 3] = [MANUAL_KEY, SCHEDULED_START_KEY, SCHEDULED_END_KEY];

const CATEGORY: &str = "closure";
const MANUAL_MESSAGE: &str = "We are temporarily closed. Please check back later.";
const SCHEDULED_MESSAGE: &str = "We are closed as scheduled. We will reopen soon.";

/// Closure keys may only be written through the closure endpoints
pub fn is_reserved(page_scope: &str, key: &str) -> bool {
    page_scope == GLOBAL_SCOPE && CLOSURE_KEYS.contains(&key)
}

/// Evaluate the stored flags at `now`
pub fn evaluate(
    manual: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> ClosureStatus {
    if manual.map(str::trim) == Some("true") {
        return ClosureStatus {
            is_closed: true,
            reason: ClosureReason::Manual,
            message: Some(MANUAL_MESSAGE.to_string()),
            scheduled_end: None,
        };
    }

    let start_at = start.and_then(|v| parse_bound(SCHEDULED_START_KEY, v));
    let end_at = end.and_then(|v| parse_bound(SCHEDULED_END_KEY, v));
    if let (Some(start_at), Some(end_at)) = (start_at, end_at)
        && start_at <= now
        && now <= end_at
    {
        return ClosureStatus {
            is_closed: true,
            reason: ClosureReason::Scheduled,
            message: Some(SCHEDULED_MESSAGE.to_string()),
            scheduled_end: end.map(|e| e.trim().to_string()),
        };
    }

    ClosureStatus::open()
}

fn parse_bound(key: &str, value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(key, value, error = %e, "Ignoring unparseable closure bound");
            None
        }
    }
}

/// Raw flags plus the evaluated status
pub async fn load_settings(pool: &PgPool) -> Result<ClosureSettings, sqlx::Error> {
    let rows = db::settings::values(pool, GLOBAL_SCOPE, &CLOSURE_KEYS).await?;
    let get = |key: &str| {
        rows.iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.clone())
            .filter(|v| !v.trim().is_empty())
    };

    let manual = get(MANUAL_KEY);
    let start = get(SCHEDULED_START_KEY);
    let end = get(SCHEDULED_END_KEY);
    let status = evaluate(manual.as_deref(), start.as_deref(), end.as_deref(), Utc::now());

    Ok(ClosureSettings {
        manually_closed: manual.as_deref().map(str::trim) == Some("true"),
        scheduled_start: start,
        scheduled_end: end,
        status,
    })
}

pub async fn current_status(pool: &PgPool) -> Result<ClosureStatus, sqlx::Error> {
    Ok(load_settings(pool).await?.status)
}

/// Reject with `StoreClosed` if ordering is blocked right now
pub async fn ensure_open(pool: &PgPool) -> ServiceResult<()> {
    let status = current_status(pool).await?;
    if status.is_closed {
        let message = status
            .message
            .unwrap_or_else(|| ErrorCode::StoreClosed.message().to_string());
        return Err(AppError::with_message(ErrorCode::StoreClosed, message)
            .with_detail("reason", status.reason.as_db())
            .into());
    }
    Ok(())
}

pub async fn set_manual(
    state: &AppState,
    closed: bool,
    updated_by: Uuid,
) -> ServiceResult<ClosureSettings> {
    let now = shared::util::now_millis();
    let mut conn = state.pool.acquire().await?;
    db::settings::upsert(
        &mut conn,
        &closure_setting(MANUAL_KEY, closed.to_string()),
        Some(updated_by),
        now,
    )
    .await?;
    drop(conn);

    tracing::info!(closed, user_id = %updated_by, "Manual closure updated");
    publish(state).await
}

pub async fn set_schedule(
    state: &AppState,
    window: &ScheduledClosureUpdate,
    updated_by: Uuid,
) -> ServiceResult<ClosureSettings> {
    let (start, end) = parse_window(window)?;
    let now = shared::util::now_millis();

    let mut tx = state.pool.begin().await?;
    db::settings::upsert(
        &mut tx,
        &closure_setting(SCHEDULED_START_KEY, start.to_rfc3339()),
        Some(updated_by),
        now,
    )
    .await?;
    db::settings::upsert(
        &mut tx,
        &closure_setting(SCHEDULED_END_KEY, end.to_rfc3339()),
        Some(updated_by),
        now,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(%start, %end, user_id = %updated_by, "Scheduled closure set");
    publish(state).await
}

pub async fn clear_schedule(state: &AppState) -> ServiceResult<ClosureSettings> {
    let mut conn = state.pool.acquire().await?;
    db::settings::delete_keys(
        &mut conn,
        GLOBAL_SCOPE,
        &[SCHEDULED_START_KEY, SCHEDULED_END_KEY],
    )
    .await?;
    drop(conn);

    tracing::info!("Scheduled closure cleared");
    publish(state).await
}

fn parse_window(
    window: &ScheduledClosureUpdate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let parse = |field: &str, value: &str| {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| {
                AppError::with_message(
                    ErrorCode::InvalidClosureSchedule,
                    format!("{field} must be an RFC 3339 timestamp"),
                )
            })
    };
    let start = parse("start", &window.start)?;
    let end = parse("end", &window.end)?;
    if start >= end {
        return Err(AppError::with_message(
            ErrorCode::InvalidClosureSchedule,
            "start must be before end",
        ));
    }
    Ok((start, end))
}

fn closure_setting(key: &str, value: String) -> SettingUpsert {
    SettingUpsert {
        setting_key: key.to_string(),
        setting_value: Some(value),
        page_scope: GLOBAL_SCOPE.to_string(),
        category: Some(CATEGORY.to_string()),
    }
}

async fn publish(state: &AppState) -> ServiceResult<ClosureSettings> {
    let settings = load_settings(&state.pool).await?;
    state.live_orders.publish_closure(settings.status.clone());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    const START: &str = "2025-06-01T10:00:00Z";
    const END: &str = "2025-06-01T14:00:00+00:00";

    #[test]
    fn open_without_flags() {
        assert_eq!(evaluate(None, None, None, at(12, 0)), ClosureStatus::open());
        assert_eq!(
            evaluate(Some("false"), None, None, at(12, 0)),
            ClosureStatus::open()
        );
    }

    #[test]
    fn manual_closure_beats_schedule() {
        let status = evaluate(Some("true"), Some(START), Some(END), at(12, 0));
        assert!(status.is_closed);
        assert_eq!(status.reason, ClosureReason::Manual);
        assert_eq!(status.message.as_deref(), Some(MANUAL_MESSAGE));
        assert_eq!(status.scheduled_end, None);
    }

    #[test]
    fn scheduled_window_is_inclusive() {
        for now in [at(10, 0), at(12, 30), at(14, 0)] {
            let status = evaluate(None, Some(START), Some(END), now);
            assert!(status.is_closed, "closed at {now}");
            assert_eq!(status.reason, ClosureReason::Scheduled);
            assert_eq!(status.scheduled_end.as_deref(), Some(END));
        }
        assert!(!evaluate(None, Some(START), Some(END), at(9, 59)).is_closed);
        assert!(!evaluate(None, Some(START), Some(END), at(14, 1)).is_closed);
    }

    #[test]
    fn offsets_are_normalised() {
        // 12:00+02:00 is 10:00Z
        let status = evaluate(None, Some("2025-06-01T12:00:00+02:00"), Some(END), at(10, 0));
        assert!(status.is_closed);
    }

    #[test]
    fn incomplete_or_unparseable_schedule_is_ignored() {
        assert!(!evaluate(None, Some(START), None, at(12, 0)).is_closed);
        assert!(!evaluate(None, Some("tomorrow"), Some(END), at(12, 0)).is_closed);
        assert!(!evaluate(None, Some(START), Some(""), at(12, 0)).is_closed);
    }

    #[test]
    fn reserved_keys_only_in_global_scope() {
        assert!(is_reserved("global", MANUAL_KEY));
        assert!(is_reserved("global", SCHEDULED_END_KEY));
        assert!(!is_reserved("homepage", MANUAL_KEY));
        assert!(!is_reserved("global", "hero_title"));
    }

    #[test]
    fn schedule_window_validation() {
        let ok = ScheduledClosureUpdate {
            start: START.into(),
            end: END.into(),
        };
        assert!(parse_window(&ok).is_ok());

        let reversed = ScheduledClosureUpdate {
            start: END.into(),
            end: START.into(),
        };
        let err = parse_window(&reversed).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidClosureSchedule);

        let garbage = ScheduledClosureUpdate {
            start: "soon".into(),
            end: END.into(),
        };
        assert!(parse_window(&garbage).is_err());
    }
}
