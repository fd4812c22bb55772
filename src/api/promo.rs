//! Public promo strip endpoint
//!
//! GET /api/v1/promo-strips — strips that should be displayed right now.

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::models::PromoStrip;

/// Public promo routes
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_active))
}

/// GET /api/v1/promo-strips
async fn list_active(State(state): State<AppState>) -> Result<Json<Vec<PromoStrip>>, ApiError> {
    Ok(Json(state.promo_service.list_active().await?))
}
