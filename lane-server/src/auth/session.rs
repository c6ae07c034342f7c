//! Session verification for tokens issued by the hosted auth provider
//!
//! The provider signs HS256 access tokens whose `sub` is the user id; the
//! matching `profiles` row carries the staff/admin flags.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use crate::db;
use crate::state::AppState;

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
}

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Inserted next to [`UserIdentity`] by the staff and admin guards
#[derive(Debug, Clone, Copy)]
pub struct StaffIdentity {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// Create an access token (used by tooling and tests; production tokens
/// come from the auth provider)
pub fn create_token(
    user_id: Uuid,
    email: Option<&str>,
    secret: &str,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and turn it into an identity
pub fn verify_token(token: &str, secret: &str) -> Result<UserIdentity, AppError> {
    let mut validation = Validation::default();
    validation.validate_aud = false;

    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid or expired token"),
        }
    })?;

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::invalid_token("Token subject is not a user id"))?;

    Ok(UserIdentity {
        user_id,
        email: token_data.claims.email,
    })
}

fn bearer_identity(state: &AppState, request: &Request) -> Result<UserIdentity, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::NotAuthenticated, "Missing Authorization header")
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::with_message(ErrorCode::NotAuthenticated, "Invalid Authorization format")
    })?;

    verify_token(token, &state.auth_jwt_secret)
}

/// Middleware: any signed-in user
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = bearer_identity(&state, &request)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Middleware: staff or admin
pub async fn require_staff(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard_role(state, request, next, false).await
}

/// Middleware: admin only
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    guard_role(state, request, next, true).await
}

async fn guard_role(
    state: AppState,
    mut request: Request,
    next: Next,
    admin_only: bool,
) -> Result<Response, AppError> {
    let identity = bearer_identity(&state, &request)?;
    let staff = load_staff(&state, identity.user_id).await?;

    match staff {
        Some(s) if s.is_admin || !admin_only => {
            request.extensions_mut().insert(identity);
            request.extensions_mut().insert(s);
            Ok(next.run(request).await)
        }
        _ if admin_only => {
            tracing::warn!(user_id = %identity.user_id, "Admin route denied");
            Err(AppError::new(ErrorCode::AdminRequired))
        }
        _ => Err(AppError::new(ErrorCode::StaffRequired)),
    }
}

/// Staff flags of a user, `None` when the user is a plain customer
pub async fn load_staff(state: &AppState, user_id: Uuid) -> Result<Option<StaffIdentity>, AppError> {
    let profile = db::profiles::find_by_id(&state.pool, user_id)
        .await
        .map_err(crate::error::internal)?;

    Ok(profile
        .filter(|p| p.is_staff_member())
        .map(|p| StaffIdentity {
            user_id: p.id,
            is_admin: p.is_admin,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_roundtrip_yields_identity() {
        let user_id = Uuid::new_v4();
        let token =
            create_token(user_id, Some("a@b.co.za"), SECRET, chrono::Duration::hours(1)).unwrap();

        let identity = verify_token(&token, SECRET).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.email.as_deref(), Some("a@b.co.za"));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token =
            create_token(Uuid::new_v4(), None, SECRET, chrono::Duration::hours(1)).unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let token =
            create_token(Uuid::new_v4(), None, SECRET, chrono::Duration::hours(-2)).unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let claims = Claims {
            sub: "service-role".into(),
            email: None,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }
}
