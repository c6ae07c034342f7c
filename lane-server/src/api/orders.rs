//! Customer order endpoints: checkout, history, detail, cancel

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CheckoutRequest, OrderDetail, OrderStatus, PaymentProvider, PaymentStatus,
};
use uuid::Uuid;

use crate::auth::{StaffIdentity, UserIdentity, session};
use crate::db;
use crate::error::internal;
use crate::services::{checkout, drafts, orders};
use crate::state::AppState;

use super::ApiResult;

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<OrderDetail> {
    let detail = checkout::create_order(&state, &user, req).await?;
    Ok(Json(detail))
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Vec<OrderDetail>> {
    let cutoff = drafts::draft_cutoff(shared::util::now_millis(), state.draft_order_ttl_minutes);
    let mut list = db::orders::list_for_user(&state.pool, user.user_id)
        .await
        .map_err(internal)?;
    list.retain(|o| !o.is_stale_draft(cutoff));
    let details = orders::load_details(&state.pool, list)
        .await
        .map_err(internal)?;
    Ok(Json(details))
}

/// GET /api/orders/{id}
///
/// Orders of other customers read as not found.
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let detail = orders::load_detail(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    let owns = detail.order.user_id == Some(user.user_id);
    let is_staff = !owns && session::load_staff(&state, user.user_id).await?.is_some();
    if !orders::can_view(&detail.order, user.user_id, is_staff) {
        return Err(AppError::new(ErrorCode::OrderNotFound));
    }
    Ok(Json(detail))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let detail = orders::cancel_for_customer(&state, id, user.user_id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct PaymentSuccessRequest {
    pub payment_reference: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentSuccessResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_provider: Option<String>,
}

/// POST /api/orders/payment-success
///
/// Return-page hook. Only reports the current state; settlement happens
/// exclusively through gateway callbacks.
pub async fn payment_success(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(req): Json<PaymentSuccessRequest>,
) -> ApiResult<PaymentSuccessResponse> {
    let reference = req.payment_reference.trim();
    if reference.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "payment_reference is required",
        ));
    }

    let order = db::orders::find_by_payment_reference(&state.pool, reference)
        .await
        .map_err(internal)?
        .filter(|o| o.user_id == Some(user.user_id))
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    Ok(Json(PaymentSuccessResponse {
        order_id: order.id,
        order_number: order.order_number,
        status: order.status,
        payment_status: order.payment_status,
        payment_provider: order
            .payment_provider
            .filter(|p| PaymentProvider::from_db(p).is_some()),
    }))
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: usize,
}

/// POST /api/admin/orders/cleanup-drafts
pub async fn cleanup_drafts(
    State(state): State<AppState>,
    Extension(admin): Extension<StaffIdentity>,
) -> ApiResult<CleanupResponse> {
    let deleted = drafts::sweep(&state).await?;
    tracing::info!(deleted, admin_id = %admin.user_id, "Draft cleanup requested");
    Ok(Json(CleanupResponse { deleted }))
}
