//! Business logic services
//!
//! Services sit between the HTTP layer and the repositories. Each service
//! owns the invariants for its slice of the domain: status machines, banned
//! email checks, cache invalidation, and outbound side effects (Discord,
//! email, the payment provider).

pub mod blog;
pub mod customer;
pub mod discord;
pub mod email;
pub mod markdown;
pub mod order;
pub mod password;
pub mod promo;
pub mod rate_limiter;
pub mod submission;
pub mod user;
pub mod work_request;

pub use blog::{BlogService, BlogServiceError};
pub use customer::{CustomerService, CustomerServiceError};
pub use discord::{DiscordNotifier, InteractionVerifier};
pub use email::EmailService;
pub use markdown::{render_markdown, slugify};
pub use order::{PaymentService, PaymentServiceError};
pub use promo::{PromoService, PromoServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use submission::{SubmissionService, SubmissionServiceError};
pub use user::{UserService, UserServiceError};
pub use work_request::{WorkRequestService, WorkRequestServiceError};
