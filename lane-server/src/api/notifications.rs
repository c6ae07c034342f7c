//! Notification preference endpoints

use axum::{Extension, Json, extract::State};
use shared::models::{NotificationPreferences, NotificationPreferencesUpdate};

use crate::auth::UserIdentity;
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/notifications/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<NotificationPreferences> {
    let prefs = db::notification_prefs::find(&state.pool, user.user_id)
        .await
        .map_err(internal)?
        .unwrap_or_default();
    Ok(Json(prefs))
}

/// POST /api/notifications/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(update): Json<NotificationPreferencesUpdate>,
) -> ApiResult<NotificationPreferences> {
    let current = db::notification_prefs::find(&state.pool, user.user_id)
        .await
        .map_err(internal)?
        .unwrap_or_default();
    let merged = current.merge(&update);

    let saved = db::notification_prefs::upsert(
        &state.pool,
        user.user_id,
        &merged,
        shared::util::now_millis(),
    )
    .await
    .map_err(internal)?;
    Ok(Json(saved))
}
