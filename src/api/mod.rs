//! API layer - HTTP handlers and routing
//!
//! Route groups:
//! - Public: blog, promo strips, forms, checkout, Discord interactions, auth
//! - Portal: the authenticated customer's services and work requests
//! - Admin: everything staff manage, behind `require_auth` + `require_admin`

pub mod admin;
pub mod auth;
pub mod blog;
pub mod interactions;
pub mod middleware;
pub mod orders;
pub mod portal;
pub mod promo;
pub mod responses;
pub mod submissions;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Portal routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/portal", portal::router())
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/health", get(health))
        .nest("/posts", blog::router())
        .nest("/promo-strips", promo::router())
        .nest("/contact", submissions::contact_router())
        .nest("/newsletter", submissions::newsletter_router())
        .nest("/website-setup", submissions::website_setup_router())
        .nest("/orders", orders::router())
        .nest("/interactions", interactions::router())
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid CORS origin, falling back to defaults");
            CorsLayer::new()
        }
    };

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/v1/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
