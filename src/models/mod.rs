//! Data models
//!
//! Domain entities for the Studiobase server. Each model maps to a database
//! table and carries its status enums plus create/update input structs used
//! by the service layer.

pub mod banned_email;
pub mod blog_post;
pub mod customer;
pub mod order;
pub mod promo_strip;
pub mod session;
pub mod submission;
pub mod user;
pub mod work_request;

pub use banned_email::BannedEmail;
pub use blog_post::{BlogPost, BlogPostStatus, CreateBlogPostInput, UpdateBlogPostInput};
pub use customer::{
    CreateCustomerInput, Customer, CustomerServiceEntry, CustomerServiceStatus, CustomerStatus,
    UpdateCustomerInput,
};
pub use order::{CreateOrderInput, Order, OrderItemKind, OrderStatus, TemplatePurchase};
pub use promo_strip::{CreatePromoStripInput, PromoStrip, UpdatePromoStripInput};
pub use session::Session;
pub use submission::{
    ContactSubmission, NewsletterSubscription, WebsiteSetupSubmission,
};
pub use user::{CreateUserInput, UpdateUserInput, User, UserRole, UserStatus};
pub use work_request::{
    CreateWorkRequestInput, WorkRequest, WorkRequestPriority, WorkRequestStatus,
};

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListParams {
    /// Page number (1-based)
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (capped at 100)
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl ListParams {
    /// Clamp values into a sane range and compute the SQL offset
    pub fn normalize(&self) -> (u32, u32, u32) {
        let page = self.page.max(1);
        let per_page = self.per_page.clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

/// A single page of results together with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Current page (1-based)
    pub page: u32,
    /// Items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Build a page from items, total count and the params used for the query
    pub fn new(items: Vec<T>, total: u64, params: &ListParams) -> Self {
        let (page, per_page, _) = params.normalize();
        Self {
            items,
            total,
            page,
            per_page,
        }
    }

    /// Total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }
        ((self.total + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_normalize() {
        let params = ListParams { page: 0, per_page: 500 };
        let (page, per_page, offset) = params.normalize();
        assert_eq!(page, 1);
        assert_eq!(per_page, 100);
        assert_eq!(offset, 0);

        let params = ListParams { page: 3, per_page: 20 };
        let (_, _, offset) = params.normalize();
        assert_eq!(offset, 40);
    }

    #[test]
    fn test_paged_result_total_pages() {
        let params = ListParams { page: 1, per_page: 10 };
        let result: PagedResult<i32> = PagedResult::new(vec![], 0, &params);
        assert_eq!(result.total_pages(), 1);

        let result: PagedResult<i32> = PagedResult::new(vec![], 25, &params);
        assert_eq!(result.total_pages(), 3);

        let result: PagedResult<i32> = PagedResult::new(vec![], 30, &params);
        assert_eq!(result.total_pages(), 3);
    }
}
