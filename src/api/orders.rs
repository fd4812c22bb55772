//! Checkout endpoints
//!
//! - POST /api/v1/orders — create a pending order and provider checkout
//!   session, returns the checkout URL
//! - POST /api/v1/orders/callback — signed provider webhook; the raw body is
//!   needed for HMAC verification so it is taken as bytes, not JSON

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::CreateOrderInput;
use crate::services::order::CheckoutSession;

/// Signature header sent by the payment provider
const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Public order routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/callback", post(callback))
}

#[derive(Debug, Serialize)]
struct CallbackResponse {
    order_id: String,
    status: String,
}

/// POST /api/v1/orders
async fn create_payment(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderInput>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let session = state.payment_service.create_payment(body).await?;
    Ok(Json(session))
}

/// POST /api/v1/orders/callback
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallbackResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing callback signature"))?;

    let order = state
        .payment_service
        .handle_callback(signature, &body)
        .await?;

    Ok(Json(CallbackResponse {
        order_id: order.id,
        status: order.status.to_string(),
    }))
}
