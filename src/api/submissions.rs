//! Public form endpoints
//!
//! - POST /api/v1/contact
//! - POST /api/v1/newsletter
//! - DELETE /api/v1/newsletter (unsubscribe)
//! - POST /api/v1/website-setup

use axum::{
    extract::State,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::MessageResponse;
use crate::services::submission::{ContactInput, WebsiteSetupInput};

/// Public submission routes
pub fn contact_router() -> Router<AppState> {
    Router::new().route("/", post(submit_contact))
}

pub fn newsletter_router() -> Router<AppState> {
    Router::new()
        .route("/", post(subscribe))
        .route("/", delete(unsubscribe))
}

pub fn website_setup_router() -> Router<AppState> {
    Router::new().route("/", post(submit_website_setup))
}

#[derive(Debug, Deserialize)]
struct NewsletterRequest {
    email: String,
}

#[derive(Debug, Serialize)]
struct NewsletterResponse {
    subscribed: bool,
    /// False when the address was already on the list
    added: bool,
}

#[derive(Debug, Serialize)]
struct WebsiteSetupResponse {
    id: i64,
    /// Whether the notification email went out; submission succeeds either way
    email_sent: bool,
}

/// POST /api/v1/contact
async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.submission_service.submit_contact(body).await?;
    Ok(Json(MessageResponse::new("Thanks, we'll be in touch")))
}

/// POST /api/v1/newsletter
async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<NewsletterRequest>,
) -> Result<Json<NewsletterResponse>, ApiError> {
    let added = state
        .submission_service
        .subscribe_newsletter(&body.email)
        .await?;
    Ok(Json(NewsletterResponse {
        subscribed: true,
        added,
    }))
}

/// DELETE /api/v1/newsletter
async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<NewsletterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .submission_service
        .unsubscribe_newsletter(&body.email)
        .await?;
    Ok(Json(MessageResponse::new("Unsubscribed")))
}

/// POST /api/v1/website-setup
async fn submit_website_setup(
    State(state): State<AppState>,
    Json(body): Json<WebsiteSetupInput>,
) -> Result<Json<WebsiteSetupResponse>, ApiError> {
    let (submission, email_sent) = state
        .submission_service
        .submit_website_setup(body)
        .await?;
    Ok(Json(WebsiteSetupResponse {
        id: submission.id,
        email_sent,
    }))
}
