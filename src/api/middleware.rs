//! API middleware
//!
//! Session token extraction (bearer header or cookie), the `require_auth` /
//! `require_admin` layers, shared application state, and the JSON error
//! envelope every handler returns on failure.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::SettingsRepository;
use crate::models::{User, UserRole};
use crate::services::{
    BlogService, BlogServiceError, CustomerService, CustomerServiceError, DiscordNotifier,
    EmailService, InteractionVerifier, PaymentService, PaymentServiceError, PromoService,
    PromoServiceError, SubmissionService, SubmissionServiceError, UserService, UserServiceError,
    WorkRequestService, WorkRequestServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub blog_service: Arc<BlogService>,
    pub customer_service: Arc<CustomerService>,
    pub work_request_service: Arc<WorkRequestService>,
    pub submission_service: Arc<SubmissionService>,
    pub payment_service: Arc<PaymentService>,
    pub promo_service: Arc<PromoService>,
    pub email_service: Arc<EmailService>,
    pub discord: Arc<DiscordNotifier>,
    pub settings: Arc<dyn SettingsRepository>,
    pub banned_emails: Arc<dyn crate::db::repositories::BannedEmailRepository>,
    pub interaction_verifier: Option<Arc<InteractionVerifier>>,
}

/// Authenticated user extracted from the request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" | "USER_BANNED" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            "PROVIDER_ERROR" => StatusCode::BAD_GATEWAY,
            "NOT_CONFIGURED" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InvalidCredentials => ApiError::unauthorized(e.to_string()),
            UserServiceError::RateLimited => ApiError::new("RATE_LIMITED", e.to_string()),
            UserServiceError::Banned => ApiError::new("USER_BANNED", e.to_string()),
            UserServiceError::UsernameTaken
            | UserServiceError::EmailTaken
            | UserServiceError::EmailBanned => ApiError::conflict(e.to_string()),
            UserServiceError::NotFound => ApiError::not_found(e.to_string()),
            UserServiceError::InvalidSession => ApiError::unauthorized(e.to_string()),
            UserServiceError::Validation(msg) => ApiError::validation_error(msg),
            UserServiceError::Internal(e) => internal(e),
        }
    }
}

impl From<BlogServiceError> for ApiError {
    fn from(e: BlogServiceError) -> Self {
        match e {
            BlogServiceError::NotFound => ApiError::not_found(e.to_string()),
            BlogServiceError::SlugTaken => ApiError::conflict(e.to_string()),
            BlogServiceError::Validation(msg) => ApiError::validation_error(msg),
            BlogServiceError::Internal(e) => internal(e),
        }
    }
}

impl From<CustomerServiceError> for ApiError {
    fn from(e: CustomerServiceError) -> Self {
        match e {
            CustomerServiceError::NotFound => ApiError::not_found(e.to_string()),
            CustomerServiceError::EmailTaken => ApiError::conflict(e.to_string()),
            CustomerServiceError::Validation(msg) => ApiError::validation_error(msg),
            CustomerServiceError::Internal(e) => internal(e),
        }
    }
}

impl From<WorkRequestServiceError> for ApiError {
    fn from(e: WorkRequestServiceError) -> Self {
        match e {
            WorkRequestServiceError::NotFound => ApiError::not_found(e.to_string()),
            WorkRequestServiceError::InvalidTransition { .. } => ApiError::conflict(e.to_string()),
            WorkRequestServiceError::Validation(msg) => ApiError::validation_error(msg),
            WorkRequestServiceError::Internal(e) => internal(e),
        }
    }
}

impl From<SubmissionServiceError> for ApiError {
    fn from(e: SubmissionServiceError) -> Self {
        match e {
            SubmissionServiceError::Validation(msg) => ApiError::validation_error(msg),
            SubmissionServiceError::Internal(e) => internal(e),
        }
    }
}

impl From<PaymentServiceError> for ApiError {
    fn from(e: PaymentServiceError) -> Self {
        match e {
            PaymentServiceError::NotFound => ApiError::not_found(e.to_string()),
            PaymentServiceError::NotConfigured => ApiError::new("NOT_CONFIGURED", e.to_string()),
            PaymentServiceError::InvalidSignature => ApiError::unauthorized(e.to_string()),
            PaymentServiceError::Provider(msg) => ApiError::new("PROVIDER_ERROR", msg),
            PaymentServiceError::Validation(msg) => ApiError::validation_error(msg),
            PaymentServiceError::Internal(e) => internal(e),
        }
    }
}

impl From<PromoServiceError> for ApiError {
    fn from(e: PromoServiceError) -> Self {
        match e {
            PromoServiceError::NotFound => ApiError::not_found(e.to_string()),
            PromoServiceError::Validation(msg) => ApiError::validation_error(msg),
            PromoServiceError::Internal(e) => internal(e),
        }
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!(error = ?e, "Internal error");
    ApiError::internal_error("Internal server error")
}

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state.user_service.validate_session(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware. Must run inside `require_auth`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.role != UserRole::Admin {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}
