//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity and
//! dispatches to SQLite or MySQL based on the pool driver.

pub mod banned_email;
pub mod blog_post;
pub mod customer;
pub mod order;
pub mod promo_strip;
pub mod session;
pub mod settings;
pub mod submission;
pub mod user;
pub mod work_request;

pub use banned_email::{BannedEmailRepository, SqlxBannedEmailRepository};
pub use blog_post::{BlogPostRepository, SqlxBlogPostRepository};
pub use customer::{CustomerRepository, SqlxCustomerRepository};
pub use order::{OrderRepository, SqlxOrderRepository};
pub use promo_strip::{PromoStripRepository, SqlxPromoStripRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use submission::{SqlxSubmissionRepository, SubmissionRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use work_request::{SqlxWorkRequestRepository, WorkRequestRepository};
