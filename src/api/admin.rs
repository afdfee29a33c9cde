//! Admin surface: list orders, force transitions, inspect the bank
//!
//! Thin layer over the engine; all transition rules live there.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiResult, ErrorCode};
use crate::ledger::StatusFilter;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

/// GET /api/admin/orders?status=pending|paid|delivered|refunded|open|all
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> ApiResult<Json<Value>> {
    let token = query.status.as_deref().unwrap_or("open");
    let filter = StatusFilter::parse(token).ok_or(ErrorCode::BadRequest)?;

    let orders = state.engine.list_orders(filter).await?;
    Ok(Json(json!({ "ok": true, "orders": orders })))
}

#[derive(Deserialize)]
pub struct ActionRequest {
    pub id: i64,
    pub action: String,
}

/// POST /api/admin/orders — `{id, action: mark_delivered | mark_refunded}`
pub async fn order_action(
    State(state): State<AppState>,
    Json(req): Json<ActionRequest>,
) -> ApiResult<Json<Value>> {
    let new_status = match req.action.as_str() {
        "mark_delivered" => state.engine.mark_delivered(req.id).await?,
        "mark_refunded" => state.engine.mark_refunded(req.id).await?,
        _ => return Err(ErrorCode::UnknownAction.into()),
    };

    Ok(Json(json!({ "ok": true, "new_status": new_status })))
}

/// GET /api/admin/bank — remaining star inventory
pub async fn bank_balance(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let balance = state.engine.bank_balance().await?;
    Ok(Json(json!({ "ok": true, "balance": balance })))
}
