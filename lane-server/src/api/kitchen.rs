//! Staff kitchen dashboard endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{KitchenAnalytics, OrderDetail, OrderStatus, StatusUpdate};
use uuid::Uuid;

use crate::auth::StaffIdentity;
use crate::db;
use crate::error::internal;
use crate::services::orders;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/staff/orders?status=preparing,ready
#[derive(Debug, Deserialize)]
pub struct KitchenQuery {
    pub status: Option<String>,
}

/// Comma-separated status filter; empty means the active board
fn parse_status_filter(raw: Option<&str>) -> Result<Vec<OrderStatus>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(OrderStatus::ACTIVE.to_vec());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            OrderStatus::from_db(s).ok_or_else(|| {
                AppError::validation(format!("Unknown order status: {s}"))
                    .with_detail("field", "status")
            })
        })
        .collect()
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<KitchenQuery>,
) -> ApiResult<Vec<OrderDetail>> {
    let statuses = parse_status_filter(query.status.as_deref())?;
    let list = db::orders::list_by_statuses(&state.pool, &statuses)
        .await
        .map_err(internal)?;
    let details = orders::load_details(&state.pool, list)
        .await
        .map_err(internal)?;
    Ok(Json(details))
}

/// PATCH /api/staff/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(staff): Extension<StaffIdentity>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<OrderDetail> {
    if update.status == OrderStatus::Draft {
        return Err(AppError::invalid_transition("any", OrderStatus::Draft.as_db()));
    }
    let detail = orders::change_status(&state, id, &update, staff.user_id).await?;
    Ok(Json(detail))
}

/// GET /api/staff/analytics
pub async fn analytics(State(state): State<AppState>) -> ApiResult<KitchenAnalytics> {
    let day_start = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::new(ErrorCode::InternalError))?;
    let day_end = day_start + Duration::days(1);

    let stats = db::orders::analytics_between(
        &state.pool,
        day_start.timestamp_millis(),
        day_end.timestamp_millis(),
    )
    .await
    .map_err(internal)?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_defaults_to_active_board() {
        assert_eq!(parse_status_filter(None).unwrap(), OrderStatus::ACTIVE.to_vec());
        assert_eq!(parse_status_filter(Some("  ")).unwrap(), OrderStatus::ACTIVE.to_vec());
    }

    #[test]
    fn status_filter_parses_list() {
        assert_eq!(
            parse_status_filter(Some("ready, completed")).unwrap(),
            vec![OrderStatus::Ready, OrderStatus::Completed]
        );
        assert!(parse_status_filter(Some("ready,shipped")).is_err());
    }
}
