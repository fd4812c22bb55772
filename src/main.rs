//! Studiobase - agency site backend and customer portal

use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studiobase::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxBannedEmailRepository, SqlxBlogPostRepository, SqlxCustomerRepository,
            SqlxOrderRepository, SqlxPromoStripRepository, SqlxSessionRepository,
            SqlxSettingsRepository, SqlxSubmissionRepository, SqlxUserRepository,
            SqlxWorkRequestRepository,
        },
    },
    services::{
        BlogService, CustomerService, DiscordNotifier, EmailService, InteractionVerifier,
        LoginRateLimiter, PaymentService, PromoService, SubmissionService, UserService,
        WorkRequestService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studiobase=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Studiobase server...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Initialize cache
    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let customer_repo = SqlxCustomerRepository::boxed(pool.clone());
    let work_request_repo = SqlxWorkRequestRepository::boxed(pool.clone());
    let blog_repo = SqlxBlogPostRepository::boxed(pool.clone());
    let order_repo = SqlxOrderRepository::boxed(pool.clone());
    let banned_email_repo = SqlxBannedEmailRepository::boxed(pool.clone());
    let promo_repo = SqlxPromoStripRepository::boxed(pool.clone());
    let submission_repo = SqlxSubmissionRepository::boxed(pool.clone());
    let settings_repo = SqlxSettingsRepository::boxed(pool.clone());

    // Integrations
    let discord = Arc::new(DiscordNotifier::new(config.discord.webhook_url.clone()));
    if discord.is_configured() {
        tracing::info!("Discord notifications enabled");
    }
    let interaction_verifier = match &config.discord.public_key {
        Some(key) => match InteractionVerifier::new(key) {
            Ok(verifier) => {
                tracing::info!("Discord interactions enabled");
                Some(Arc::new(verifier))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid Discord public key, interactions disabled");
                None
            }
        },
        None => None,
    };

    // Initialize services
    let rate_limiter = Arc::new(LoginRateLimiter::new());
    let user_service = Arc::new(UserService::new(
        user_repo,
        session_repo,
        banned_email_repo.clone(),
        rate_limiter.clone(),
    ));
    let blog_service = Arc::new(BlogService::new(blog_repo, cache.clone()));
    let customer_service = Arc::new(CustomerService::new(customer_repo));
    let work_request_service = Arc::new(WorkRequestService::new(
        work_request_repo,
        discord.clone(),
    ));
    let email_service = Arc::new(EmailService::new(settings_repo.clone()));
    let submission_service = Arc::new(SubmissionService::new(
        submission_repo,
        banned_email_repo.clone(),
        discord.clone(),
        email_service.clone(),
    ));
    let payment_service = Arc::new(PaymentService::new(
        order_repo,
        banned_email_repo.clone(),
        config.payment.clone(),
    ));
    let promo_service = Arc::new(PromoService::new(promo_repo, cache.clone()));

    // Build application state
    let state = AppState {
        config: Arc::new(config.clone()),
        user_service: user_service.clone(),
        blog_service,
        customer_service,
        work_request_service,
        submission_service,
        payment_service,
        promo_service,
        email_service,
        discord,
        settings: settings_repo,
        banned_emails: banned_email_repo,
        interaction_verifier,
    };

    // Periodic cleanup: rate limiter buckets and expired sessions
    {
        let limiter = rate_limiter.clone();
        let users = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
                match users.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("Swept {} expired sessions", n),
                    Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
