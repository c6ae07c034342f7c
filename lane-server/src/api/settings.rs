//! Visual editor settings: public reads, admin writes

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{SettingBatch, SettingQuery, SettingUpsert, ThemeSetting};

use crate::auth::StaffIdentity;
use crate::db;
use crate::error::internal;
use crate::services::closure;
use crate::state::AppState;

use super::ApiResult;

const MAX_KEY_LEN: usize = 100;
const MAX_SCOPE_LEN: usize = 100;
const MAX_VALUE_LEN: usize = 10_000;
const MAX_BATCH: usize = 100;

fn validate_key(key: &str) -> Result<(), AppError> {
    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if key.is_empty() || key.len() > MAX_KEY_LEN || !valid_chars {
        return Err(AppError::validation(format!(
            "setting_key must be 1-{MAX_KEY_LEN} characters of [A-Za-z0-9_.-]"
        ))
        .with_detail("setting_key", key));
    }
    Ok(())
}

fn validate_scope(scope: &str) -> Result<(), AppError> {
    if scope.trim().is_empty() || scope.chars().count() > MAX_SCOPE_LEN {
        return Err(AppError::validation(format!(
            "page_scope must be 1-{MAX_SCOPE_LEN} characters"
        ))
        .with_detail("page_scope", scope));
    }
    Ok(())
}

fn validate_upsert(data: &SettingUpsert) -> Result<(), AppError> {
    validate_key(&data.setting_key)?;
    validate_scope(&data.page_scope)?;
    if let Some(value) = &data.setting_value
        && value.chars().count() > MAX_VALUE_LEN
    {
        return Err(AppError::validation(format!(
            "setting_value must be at most {MAX_VALUE_LEN} characters"
        ))
        .with_detail("setting_key", data.setting_key.as_str()));
    }
    if closure::is_reserved(&data.page_scope, &data.setting_key) {
        return Err(AppError::new(ErrorCode::SettingKeyReserved)
            .with_detail("setting_key", data.setting_key.as_str()));
    }
    Ok(())
}

/// GET /api/settings?page_scope=&category=
pub async fn list_settings(
    State(state): State<AppState>,
    Query(query): Query<SettingQuery>,
) -> ApiResult<Vec<ThemeSetting>> {
    let settings = db::settings::list(&state.pool, &query)
        .await
        .map_err(internal)?;
    Ok(Json(settings))
}

/// GET /api/settings/{page_scope}/{key}
pub async fn get_setting(
    State(state): State<AppState>,
    Path((page_scope, key)): Path<(String, String)>,
) -> ApiResult<ThemeSetting> {
    let setting = db::settings::find(&state.pool, &page_scope, &key)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::SettingNotFound))?;
    Ok(Json(setting))
}

/// PUT /api/admin/settings
pub async fn upsert_setting(
    State(state): State<AppState>,
    Extension(admin): Extension<StaffIdentity>,
    Json(data): Json<SettingUpsert>,
) -> ApiResult<ThemeSetting> {
    validate_upsert(&data)?;

    let mut conn = state.pool.acquire().await.map_err(internal)?;
    let setting = db::settings::upsert(
        &mut conn,
        &data,
        Some(admin.user_id),
        shared::util::now_millis(),
    )
    .await
    .map_err(internal)?;

    tracing::debug!(key = %setting.setting_key, scope = %setting.page_scope, "Setting saved");
    Ok(Json(setting))
}

/// PUT /api/admin/settings/batch
///
/// All-or-nothing: every entry is validated before the transaction starts.
pub async fn upsert_batch(
    State(state): State<AppState>,
    Extension(admin): Extension<StaffIdentity>,
    Json(batch): Json<SettingBatch>,
) -> ApiResult<Vec<ThemeSetting>> {
    if batch.settings.is_empty() || batch.settings.len() > MAX_BATCH {
        return Err(AppError::with_message(
            ErrorCode::ValidationFailed,
            format!("Batch must contain 1-{MAX_BATCH} settings"),
        ));
    }
    for data in &batch.settings {
        validate_upsert(data)?;
    }

    let now = shared::util::now_millis();
    let mut tx = state.pool.begin().await.map_err(internal)?;
    let mut saved = Vec::with_capacity(batch.settings.len());
    for data in &batch.settings {
        saved.push(
            db::settings::upsert(&mut tx, data, Some(admin.user_id), now)
                .await
                .map_err(internal)?,
        );
    }
    tx.commit().await.map_err(internal)?;

    tracing::info!(count = saved.len(), admin_id = %admin.user_id, "Settings batch saved");
    Ok(Json(saved))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// DELETE /api/admin/settings/{page_scope}/{key}
pub async fn delete_setting(
    State(state): State<AppState>,
    Path((page_scope, key)): Path<(String, String)>,
) -> ApiResult<DeleteResponse> {
    if closure::is_reserved(&page_scope, &key) {
        return Err(AppError::new(ErrorCode::SettingKeyReserved).with_detail("setting_key", key));
    }
    let deleted = db::settings::delete(&state.pool, &page_scope, &key)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::new(ErrorCode::SettingNotFound));
    }
    Ok(Json(DeleteResponse { deleted }))
}
