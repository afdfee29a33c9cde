//! API routes for star-cloud

pub mod admin;
pub mod health;
pub mod order;
pub mod prices;

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Admin surface (shared-secret header)
    let admin = Router::new()
        .route(
            "/api/admin/orders",
            get(admin::list_orders).post(admin::order_action),
        )
        .route("/api/admin/bank", get(admin::bank_balance))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_auth_middleware,
        ));

    // Order creation (public, rate-limited)
    let create = Router::new()
        .route("/api/order/create", post(order::create_order))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::create_order_rate_limit,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/prices", get(prices::list_prices))
        .route("/api/order/confirm", post(order::confirm_payment))
        .merge(create)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
