//! Public blog endpoints
//!
//! - GET /api/v1/posts — published posts, paginated
//! - GET /api/v1/posts/{slug} — a single published post

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{PaginatedPostsResponse, PostResponse};
use crate::models::ListParams;

/// Public blog routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{slug}", get(get_post))
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let result = state.blog_service.list_published(&params).await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/posts/{slug}
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.blog_service.get_published(&slug).await?;
    Ok(Json(post.into()))
}
