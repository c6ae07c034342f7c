//! Profile endpoints

use axum::{Extension, Json, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::models::{Profile, ProfileUpdate};

use crate::auth::UserIdentity;
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

const MAX_FULL_NAME_LEN: usize = 100;

/// Trim the name; check the phone has 10-15 digits once `+ - ( )` and spaces are removed
fn normalize_update(data: ProfileUpdate) -> Result<ProfileUpdate, AppError> {
    let full_name = match data.full_name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.chars().count() > MAX_FULL_NAME_LEN {
                return Err(AppError::validation(format!(
                    "full_name must be at most {MAX_FULL_NAME_LEN} characters"
                ))
                .with_detail("field", "full_name"));
            }
            Some(name)
        }
        None => None,
    };

    let phone_number = match data.phone_number {
        Some(phone) => {
            let stripped: String = phone
                .chars()
                .filter(|c| !c.is_whitespace() && !matches!(c, '+' | '-' | '(' | ')'))
                .collect();
            let valid = stripped.chars().all(|c| c.is_ascii_digit())
                && (10..=15).contains(&stripped.len());
            if !valid {
                return Err(AppError::with_message(
                    ErrorCode::ValidationFailed,
                    "phone_number must contain 10-15 digits",
                )
                .with_detail("field", "phone_number"));
            }
            Some(phone.trim().to_string())
        }
        None => None,
    };

    Ok(ProfileUpdate {
        full_name,
        phone_number,
    })
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Profile> {
    let profile = db::profiles::find_by_id(&state.pool, user.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::not_found("Profile"))?;
    Ok(Json(profile))
}

/// PUT /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(data): Json<ProfileUpdate>,
) -> ApiResult<Profile> {
    let data = normalize_update(data)?;
    let profile = db::profiles::update(&state.pool, user.user_id, &data, shared::util::now_millis())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::not_found("Profile"))?;
    Ok(Json(profile))
}
