//! Restaurant closure endpoints

use axum::{Extension, Json, extract::State};
use shared::models::{ClosureSettings, ClosureStatus, ManualClosureUpdate, ScheduledClosureUpdate};

use crate::auth::StaffIdentity;
use crate::error::internal;
use crate::services::closure;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/closure
pub async fn get_status(State(state): State<AppState>) -> ApiResult<ClosureStatus> {
    let status = closure::current_status(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(status))
}

/// GET /api/admin/closure
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<ClosureSettings> {
    let settings = closure::load_settings(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(settings))
}

/// PUT /api/admin/closure/manual
pub async fn set_manual(
    State(state): State<AppState>,
    Extension(admin): Extension<StaffIdentity>,
    Json(req): Json<ManualClosureUpdate>,
) -> ApiResult<ClosureSettings> {
    let settings = closure::set_manual(&state, req.is_closed, admin.user_id).await?;
    Ok(Json(settings))
}

/// PUT /api/admin/closure/schedule
pub async fn set_schedule(
    State(state): State<AppState>,
    Extension(admin): Extension<StaffIdentity>,
    Json(req): Json<ScheduledClosureUpdate>,
) -> ApiResult<ClosureSettings> {
    let settings = closure::set_schedule(&state, &req, admin.user_id).await?;
    Ok(Json(settings))
}

/// DELETE /api/admin/closure/schedule
pub async fn clear_schedule(State(state): State<AppState>) -> ApiResult<ClosureSettings> {
    let settings = closure::clear_schedule(&state).await?;
    Ok(Json(settings))
}
