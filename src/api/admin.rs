//! Admin endpoints
//!
//! Everything under /api/v1/admin, mounted behind `require_auth` +
//! `require_admin`: user management, the customer CRM, work-request review,
//! blog and promo CRUD, banned emails, submissions, orders, settings, the
//! dashboard stats and the SMTP test email.

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{MessageResponse, PostResponse, UserResponse};
use crate::db::repositories::settings::Setting;
use crate::models::{
    BannedEmail, BlogPostStatus, ContactSubmission, CreateBlogPostInput, CreateCustomerInput,
    CreatePromoStripInput, CreateUserInput, Customer, CustomerServiceEntry, ListParams,
    NewsletterSubscription, Order, OrderStatus, PagedResult, PromoStrip, UpdateBlogPostInput,
    UpdateCustomerInput, UpdatePromoStripInput, UpdateUserInput, WebsiteSetupSubmission,
    WorkRequest, WorkRequestStatus,
};

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users", get(list_users))
        .route("/users", post(create_user))
        .route("/users/{id}", put(update_user))
        .route("/users/{id}", delete(delete_user))
        // Customers and their services
        .route("/customers", get(list_customers))
        .route("/customers", post(create_customer))
        .route("/customers/{id}", get(get_customer))
        .route("/customers/{id}", put(update_customer))
        .route("/customers/{id}", delete(delete_customer))
        .route("/customers/{id}/services", get(list_customer_services))
        .route("/customers/{id}/services", post(add_customer_service))
        .route(
            "/customers/{id}/services/{service_id}/pause",
            post(pause_customer_service),
        )
        .route(
            "/customers/{id}/services/{service_id}/resume",
            post(resume_customer_service),
        )
        .route(
            "/customers/{id}/services/{service_id}/cancel",
            post(cancel_customer_service),
        )
        .route(
            "/customers/{id}/services/{service_id}",
            delete(delete_customer_service),
        )
        // Work requests
        .route("/work-requests", get(list_work_requests))
        .route("/work-requests/{id}/status", put(update_work_request_status))
        // Blog
        .route("/posts", get(list_posts))
        .route("/posts", post(create_post))
        .route("/posts/{id}", get(get_post))
        .route("/posts/{id}", put(update_post))
        .route("/posts/{id}", delete(delete_post))
        // Promo strips
        .route("/promo-strips", get(list_promo_strips))
        .route("/promo-strips", post(create_promo_strip))
        .route("/promo-strips/{id}", put(update_promo_strip))
        .route("/promo-strips/{id}", delete(delete_promo_strip))
        // Banned emails
        .route("/banned-emails", get(list_banned_emails))
        .route("/banned-emails", post(ban_email))
        .route("/banned-emails/{email}", delete(unban_email))
        // Submissions
        .route("/submissions/contact", get(list_contacts))
        .route("/submissions/contact/{id}", delete(delete_contact))
        .route("/submissions/website-setup", get(list_website_setups))
        .route("/submissions/website-setup/{id}", delete(delete_website_setup))
        .route("/newsletter", get(list_subscriptions))
        // Orders
        .route("/orders", get(list_orders))
        // Settings, stats, email
        .route("/settings", get(get_settings))
        .route("/settings", put(put_settings))
        .route("/stats", get(stats))
        .route("/test-email", post(send_test_email))
}

// ============================================================================
// Users
// ============================================================================

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.user_service.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.user_service.create_user(body).await?.into()))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.user_service.update_user(id, body).await?.into()))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(admin)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if admin.id == id {
        return Err(ApiError::validation_error("Cannot delete your own account"));
    }
    state.user_service.delete_user(id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}

// ============================================================================
// Customers
// ============================================================================

async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PagedResult<Customer>>, ApiError> {
    Ok(Json(state.customer_service.list_customers(&params).await?))
}

async fn create_customer(
    State(state): State<AppState>,
    Json(body): Json<CreateCustomerInput>,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(state.customer_service.create_customer(body).await?))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(state.customer_service.get_customer(id).await?))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCustomerInput>,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(state.customer_service.update_customer(id, body).await?))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.customer_service.delete_customer(id).await?;
    Ok(Json(MessageResponse::new("Customer deleted")))
}

#[derive(Debug, Deserialize)]
struct AddServiceRequest {
    name: String,
    description: Option<String>,
    monthly_price_cents: i64,
}

async fn list_customer_services(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CustomerServiceEntry>>, ApiError> {
    Ok(Json(state.customer_service.list_services(id).await?))
}

async fn add_customer_service(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AddServiceRequest>,
) -> Result<Json<CustomerServiceEntry>, ApiError> {
    Ok(Json(
        state
            .customer_service
            .add_service(id, body.name, body.description, body.monthly_price_cents)
            .await?,
    ))
}

async fn pause_customer_service(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(i64, i64)>,
) -> Result<Json<CustomerServiceEntry>, ApiError> {
    Ok(Json(
        state.customer_service.pause_service(id, service_id).await?,
    ))
}

async fn resume_customer_service(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(i64, i64)>,
) -> Result<Json<CustomerServiceEntry>, ApiError> {
    Ok(Json(
        state.customer_service.resume_service(id, service_id).await?,
    ))
}

async fn cancel_customer_service(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(i64, i64)>,
) -> Result<Json<CustomerServiceEntry>, ApiError> {
    Ok(Json(
        state.customer_service.cancel_service(id, service_id).await?,
    ))
}

async fn delete_customer_service(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.customer_service.delete_service(id, service_id).await?;
    Ok(Json(MessageResponse::new("Service removed")))
}

// ============================================================================
// Work requests
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorkRequestListQuery {
    status: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn list_work_requests(
    State(state): State<AppState>,
    Query(query): Query<WorkRequestListQuery>,
) -> Result<Json<PagedResult<WorkRequest>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(WorkRequestStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::validation_error(e.to_string()))?;
    let params = ListParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };

    Ok(Json(
        state
            .work_request_service
            .list_requests(status, &params)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: WorkRequestStatus,
    admin_note: Option<String>,
}

async fn update_work_request_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<WorkRequest>, ApiError> {
    let service = &state.work_request_service;
    let request = match body.status {
        WorkRequestStatus::Approved => service.approve(id, body.admin_note).await?,
        WorkRequestStatus::Declined => service.decline(id, body.admin_note).await?,
        WorkRequestStatus::Completed => service.complete(id, body.admin_note).await?,
        WorkRequestStatus::Pending => {
            return Err(ApiError::conflict("Requests cannot be moved back to pending"))
        }
    };
    Ok(Json(request))
}

// ============================================================================
// Blog
// ============================================================================

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PagedResult<PostResponse>>, ApiError> {
    let result = state.blog_service.list_all(&params).await?;
    Ok(Json(PagedResult {
        items: result.items.into_iter().map(PostResponse::from).collect(),
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    }))
}

async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<CreateBlogPostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.blog_service.create_post(body).await?.into()))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.blog_service.get_post(id).await?.into()))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBlogPostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(state.blog_service.update_post(id, body).await?.into()))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.blog_service.delete_post(id).await?;
    Ok(Json(MessageResponse::new("Post deleted")))
}

// ============================================================================
// Promo strips
// ============================================================================

async fn list_promo_strips(
    State(state): State<AppState>,
) -> Result<Json<Vec<PromoStrip>>, ApiError> {
    Ok(Json(state.promo_service.list_all().await?))
}

async fn create_promo_strip(
    State(state): State<AppState>,
    Json(body): Json<CreatePromoStripInput>,
) -> Result<Json<PromoStrip>, ApiError> {
    Ok(Json(state.promo_service.create_strip(body).await?))
}

async fn update_promo_strip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePromoStripInput>,
) -> Result<Json<PromoStrip>, ApiError> {
    Ok(Json(state.promo_service.update_strip(id, body).await?))
}

async fn delete_promo_strip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.promo_service.delete_strip(id).await?;
    Ok(Json(MessageResponse::new("Promo strip deleted")))
}

// ============================================================================
// Banned emails
// ============================================================================

#[derive(Debug, Deserialize)]
struct BanEmailRequest {
    email: String,
    reason: Option<String>,
}

async fn list_banned_emails(
    State(state): State<AppState>,
) -> Result<Json<Vec<BannedEmail>>, ApiError> {
    Ok(Json(state.banned_emails.list().await.map_err(repo_error)?))
}

async fn ban_email(
    State(state): State<AppState>,
    Json(body): Json<BanEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !body.email.contains('@') {
        return Err(ApiError::validation_error("A valid email address is required"));
    }
    state
        .banned_emails
        .ban(&body.email, body.reason.as_deref())
        .await
        .map_err(repo_error)?;
    Ok(Json(MessageResponse::new("Email banned")))
}

async fn unban_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.banned_emails.unban(&email).await.map_err(repo_error)?;
    Ok(Json(MessageResponse::new("Email unbanned")))
}

// ============================================================================
// Submissions
// ============================================================================

async fn list_contacts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    Ok(Json(state.submission_service.list_contacts().await?))
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.submission_service.delete_contact(id).await?;
    Ok(Json(MessageResponse::new("Submission deleted")))
}

async fn list_website_setups(
    State(state): State<AppState>,
) -> Result<Json<Vec<WebsiteSetupSubmission>>, ApiError> {
    Ok(Json(state.submission_service.list_website_setups().await?))
}

async fn delete_website_setup(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.submission_service.delete_website_setup(id).await?;
    Ok(Json(MessageResponse::new("Submission deleted")))
}

async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsletterSubscription>>, ApiError> {
    Ok(Json(state.submission_service.list_subscriptions().await?))
}

// ============================================================================
// Orders
// ============================================================================

async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PagedResult<Order>>, ApiError> {
    Ok(Json(state.payment_service.list_orders(&params).await?))
}

// ============================================================================
// Settings, stats, email
// ============================================================================

async fn get_settings(State(state): State<AppState>) -> Result<Json<Vec<Setting>>, ApiError> {
    Ok(Json(state.settings.get_all().await.map_err(repo_error)?))
}

/// PUT /api/v1/admin/settings — upsert a map of key/value pairs
async fn put_settings(
    State(state): State<AppState>,
    Json(body): Json<BTreeMap<String, String>>,
) -> Result<Json<MessageResponse>, ApiError> {
    for (key, value) in &body {
        state.settings.set(key, value).await.map_err(repo_error)?;
    }
    Ok(Json(MessageResponse::new("Settings updated")))
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    users: u64,
    customers: u64,
    work_requests_pending: i64,
    posts_published: i64,
    posts_draft: i64,
    orders_paid: i64,
    orders_pending: i64,
    newsletter_subscriptions: u64,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let one = ListParams { page: 1, per_page: 1 };

    let users = state.user_service.list_users().await?.len() as u64;
    let customers = state.customer_service.list_customers(&one).await?.total;
    let work_requests_pending = state.work_request_service.count_pending().await?;
    let posts_published = state
        .blog_service
        .count_by_status(BlogPostStatus::Published)
        .await?;
    let posts_draft = state
        .blog_service
        .count_by_status(BlogPostStatus::Draft)
        .await?;
    let orders_paid = state.payment_service.count_by_status(OrderStatus::Paid).await?;
    let orders_pending = state
        .payment_service
        .count_by_status(OrderStatus::Pending)
        .await?;
    let newsletter_subscriptions =
        state.submission_service.list_subscriptions().await?.len() as u64;

    Ok(Json(StatsResponse {
        users,
        customers,
        work_requests_pending,
        posts_published,
        posts_draft,
        orders_paid,
        orders_pending,
        newsletter_subscriptions,
    }))
}

#[derive(Debug, Deserialize)]
struct TestEmailRequest {
    to: String,
}

async fn send_test_email(
    State(state): State<AppState>,
    Json(body): Json<TestEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .email_service
        .send(&body.to, "Studiobase test email", "SMTP settings are working.")
        .await
        .map_err(|e| ApiError::validation_error(format!("Email delivery failed: {}", e)))?;
    Ok(Json(MessageResponse::new("Test email sent")))
}

fn repo_error(e: anyhow::Error) -> ApiError {
    tracing::error!(error = ?e, "Repository error");
    ApiError::internal_error("Internal server error")
}
