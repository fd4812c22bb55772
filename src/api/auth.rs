//! Authentication endpoints
//!
//! - POST /api/v1/auth/register
//! - POST /api/v1/auth/login
//! - POST /api/v1/auth/logout
//! - GET  /api/v1/auth/me

use axum::{
    extract::{ConnectInfo, Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{MessageResponse, UserResponse};
use crate::models::CreateUserInput;

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Public auth routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Auth routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .user_service
        .register(CreateUserInput {
            username: body.username,
            email: body.email,
            password: body.password,
            role: None,
        })
        .await?;

    Ok(Json(user.into()))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, token) = state
        .user_service
        .login(&body.username, &body.password, Some(addr.ip()))
        .await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    headers: axum::http::HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    // The middleware already validated the token; pull it back out so the
    // session row can be dropped
    if let Some(token) = bearer_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    tracing::debug!(user_id = user.id, "User logged out");
    Ok(Json(MessageResponse::new("Logged out")))
}

/// GET /api/v1/auth/me
async fn me(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<UserResponse> {
    Json(user.into())
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(s) = value.to_str() {
            if let Some(token) = s.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    if let Some(value) = headers.get(axum::http::header::COOKIE) {
        if let Ok(s) = value.to_str() {
            for cookie in s.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}
