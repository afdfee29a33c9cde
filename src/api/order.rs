//! Storefront-facing order endpoints
//!
//! POST /api/order/create  — create a pending order, return the transfer details
//! POST /api/order/confirm — verify a claimed payment and settle the order

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::email;
use crate::engine::Engine;
use crate::error::{ApiResult, ErrorCode};
use crate::ledger::OrderStatus;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateRequest {
    pub username: String,
    pub stars: i32,
}

/// The caller gets everything needed to build the TonConnect transfer:
/// the id, the quoted price, the merchant wallet and the memo to attach.
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<Json<Value>> {
    let order = state.engine.create_order(&req.username, req.stars).await?;

    Ok(Json(json!({
        "ok": true,
        "order_id": order.id,
        "amount_ton": order.amount_ton,
        "wallet": order.merchant_address,
        "memo": Engine::memo_for(&order),
    })))
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    // camelCase and snake_case both accepted, like the storefront sends them
    #[serde(alias = "orderId")]
    pub order_id: i64,
    #[serde(alias = "txHash")]
    pub tx_hash: String,
    #[serde(default, alias = "senderAddress")]
    pub sender_address: Option<String>,
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> ApiResult<Json<Value>> {
    let tx_hash = req.tx_hash.trim();
    if tx_hash.is_empty() {
        return Err(ErrorCode::BadRequest.into());
    }

    let confirmation = state
        .engine
        .confirm_payment(req.order_id, tx_hash, req.sender_address.as_deref())
        .await?;

    // Exactly the call that settled the order mails the admin, so retries
    // and concurrent duplicates produce one notice.
    if confirmation.settled {
        notify_admin_by_email(&state, req.order_id);
    }

    let delivery = if confirmation.status == OrderStatus::Delivered {
        "done"
    } else {
        "deferred"
    };
    Ok(Json(json!({
        "ok": true,
        "status": confirmation.status,
        "delivery": delivery,
    })))
}

/// Fire-and-forget paid-order notice. Never delays or fails the response.
fn notify_admin_by_email(state: &AppState, order_id: i64) {
    let (Some(ses), Some(admin_email)) = (state.ses.clone(), state.admin_email.clone()) else {
        return;
    };
    let state = state.clone();
    tokio::spawn(async move {
        let order = match state.engine.get_order(order_id).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Could not load order for email notice");
                return;
            }
        };
        if let Err(e) = email::send_order_paid_notice(
            &ses,
            &state.ses_from_email,
            &admin_email,
            order.id,
            &order.tg_username,
            order.stars,
            order.amount_ton,
        )
        .await
        {
            tracing::warn!(order_id, error = %e, "Paid-order email notice failed");
        }
    });
}
