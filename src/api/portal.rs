//! Customer portal endpoints (require_auth)
//!
//! - GET  /api/v1/portal/services — the calling customer's provisioned services
//! - GET  /api/v1/portal/work-requests — own work requests
//! - POST /api/v1/portal/work-requests — file a new request

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Customer, CreateWorkRequestInput, CustomerServiceEntry, WorkRequest};

/// Portal routes, mounted behind `require_auth`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(my_services))
        .route("/work-requests", get(my_work_requests))
        .route("/work-requests", post(create_work_request))
}

/// Resolve the customer record linked to the calling user.
async fn customer_for(state: &AppState, user_id: i64) -> Result<Customer, ApiError> {
    state
        .customer_service
        .get_by_user_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No customer record is linked to this account"))
}

/// GET /api/v1/portal/services
async fn my_services(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<CustomerServiceEntry>>, ApiError> {
    let customer = customer_for(&state, user.id).await?;
    Ok(Json(state.customer_service.list_services(customer.id).await?))
}

/// GET /api/v1/portal/work-requests
async fn my_work_requests(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<WorkRequest>>, ApiError> {
    let customer = customer_for(&state, user.id).await?;
    Ok(Json(
        state
            .work_request_service
            .list_for_customer(customer.id)
            .await?,
    ))
}

/// POST /api/v1/portal/work-requests
async fn create_work_request(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(body): Json<CreateWorkRequestInput>,
) -> Result<Json<WorkRequest>, ApiError> {
    let customer = customer_for(&state, user.id).await?;

    // Account bans block the session, but an email ban on the customer
    // record blocks new requests too
    if state
        .banned_emails
        .is_banned(&customer.email)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "Banned email lookup failed");
            ApiError::internal_error("Internal server error")
        })?
    {
        return Err(ApiError::forbidden("This account cannot file work requests"));
    }

    let request = state
        .work_request_service
        .create_request(customer.id, body)
        .await?;
    Ok(Json(request))
}
