//! Public price table endpoint

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /api/prices — package tiers with the markup applied
pub async fn list_prices(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "price_per_star": state.price_book.per_star,
        "markup_percent": state.price_book.markup_percent,
        "tiers": state.price_book.tiers(),
    }))
}
