//! API routes for lane-server

pub mod closure;
pub mod delivery;
pub mod health;
pub mod kitchen;
pub mod live_ws;
pub mod menu;
pub mod notifications;
pub mod orders;
pub mod payfast;
pub mod profile;
pub mod settings;
pub mod yoco;

use axum::routing::{get, patch, post, put};
use axum::{Router, middleware};
use shared::error::AppError;

use crate::auth::rate_limit::{
    generous_rate_limit, moderate_rate_limit, notifications_rate_limit, payment_rate_limit,
    strict_rate_limit,
};
use crate::auth::session::{require_admin, require_staff, require_user};
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
///
/// Auth guards are added after the rate limiters so they run first and the
/// limiter can key on the authenticated user. Each route sits behind at most
/// one limiter since counters are keyed by route.
pub fn create_router(state: AppState) -> Router {
    // Public reads
    let public = Router::new()
        .route("/api/menu", get(menu::get_menu))
        .route("/api/menu/categories/{id}", get(menu::get_category))
        .route("/api/menu/items/{id}", get(menu::get_item))
        .route("/api/closure", get(closure::get_status))
        .route("/api/delivery/quote", get(delivery::get_quote))
        .route("/api/settings", get(settings::list_settings))
        .route("/api/settings/{page_scope}/{key}", get(settings::get_setting))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            generous_rate_limit,
        ));

    // Gateway callbacks (signature-verified, raw body)
    let callbacks = Router::new()
        .route("/api/yoco/webhook", post(yoco::handle_webhook))
        .route("/api/payfast/notify", post(payfast::handle_notify));

    // Signed-in customers
    let customer = Router::new()
        .route(
            "/api/orders",
            post(orders::create_order)
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    strict_rate_limit,
                ))
                .get(orders::list_orders),
        )
        .route("/api/orders/payment-success", post(orders::payment_success))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/cancel", post(orders::cancel_order))
        .merge(profile_routes(&state))
        .merge(payment_routes(&state))
        .merge(notification_routes(&state))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    // Kitchen dashboard
    let staff = Router::new()
        .route("/api/staff/orders", get(kitchen::list_orders))
        .route("/api/staff/orders/{id}/status", patch(kitchen::update_status))
        .route("/api/staff/analytics", get(kitchen::analytics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            generous_rate_limit,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_staff));

    // Admin: menu, closure, visual editor, maintenance
    let admin = Router::new()
        .route("/api/admin/menu/items", post(menu::create_item))
        .route("/api/admin/menu/items/{id}", put(menu::update_item))
        .route(
            "/api/admin/menu/items/{id}/availability",
            patch(menu::set_availability),
        )
        .route("/api/admin/menu/items/{id}/stock", put(menu::set_stock))
        .route("/api/admin/closure", get(closure::get_settings))
        .route("/api/admin/closure/manual", put(closure::set_manual))
        .route(
            "/api/admin/closure/schedule",
            put(closure::set_schedule).delete(closure::clear_schedule),
        )
        .route("/api/admin/settings", put(settings::upsert_setting))
        .route("/api/admin/settings/batch", put(settings::upsert_batch))
        .route(
            "/api/admin/settings/{page_scope}/{key}",
            axum::routing::delete(settings::delete_setting),
        )
        .route(
            "/api/admin/orders/cleanup-drafts",
            post(orders::cleanup_drafts),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            moderate_rate_limit,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/live/ws", get(live_ws::handle_live_ws))
        .merge(public)
        .merge(callbacks)
        .merge(customer)
        .merge(staff)
        .merge(admin)
        .with_state(state)
}

fn profile_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(profile::get_profile).put(profile::update_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            moderate_rate_limit,
        ))
}

fn payment_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/yoco/checkout", post(yoco::create_checkout))
        .route("/api/payfast/create-payment", post(payfast::create_payment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            payment_rate_limit,
        ))
}

fn notification_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications/preferences",
            get(notifications::get_preferences).post(notifications::update_preferences),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            notifications_rate_limit,
        ))
}
