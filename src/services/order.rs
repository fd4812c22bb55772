//! Payment service
//!
//! Checkout against the external payment provider. Creating a payment stores
//! a pending order keyed by a server-generated UUID, then asks the provider
//! for a hosted checkout session. The provider reports the outcome through a
//! signed callback; signatures are HMAC-SHA256 over the raw request body.
//!
//! `Paid` is terminal: a replayed callback for an already-paid order is
//! acknowledged without changing anything, and the template purchase ledger
//! gets at most one row per order.

use crate::config::PaymentConfig;
use crate::db::repositories::{BannedEmailRepository, OrderRepository};
use crate::models::{
    CreateOrderInput, ListParams, Order, OrderItemKind, OrderStatus, PagedResult, TemplatePurchase,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Timeout for provider API calls
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Payment service errors
#[derive(Debug, thiserror::Error)]
pub enum PaymentServiceError {
    #[error("Order not found")]
    NotFound,

    #[error("Payments are not configured")]
    NotConfigured,

    #[error("Invalid callback signature")]
    InvalidSignature,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A created checkout session, returned to the frontend for redirect.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    /// Our order id
    pub order_id: String,
    /// Hosted checkout URL to redirect the buyer to
    pub checkout_url: String,
}

#[derive(Serialize)]
struct ProviderSessionRequest<'a> {
    reference: &'a str,
    amount_cents: i64,
    currency: &'a str,
    description: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Deserialize)]
struct ProviderSessionResponse {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct CallbackEvent {
    #[serde(rename = "type")]
    event_type: String,
    reference: String,
}

/// Checkout and payment callback service
pub struct PaymentService {
    orders: Arc<dyn OrderRepository>,
    banned_emails: Arc<dyn BannedEmailRepository>,
    config: PaymentConfig,
    client: reqwest::Client,
}

impl PaymentService {
    /// Create a new payment service
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        banned_emails: Arc<dyn BannedEmailRepository>,
        config: PaymentConfig,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            orders,
            banned_emails,
            config,
            client,
        }
    }

    /// Create a pending order and a provider checkout session for it.
    pub async fn create_payment(
        &self,
        input: CreateOrderInput,
    ) -> Result<CheckoutSession, PaymentServiceError> {
        let secret_key = self
            .config
            .secret_key
            .as_deref()
            .ok_or(PaymentServiceError::NotConfigured)?;

        let email = input.customer_email.trim().to_lowercase();
        if !email.contains('@') || email.len() > 255 {
            return Err(PaymentServiceError::Validation(
                "A valid email address is required".into(),
            ));
        }
        if self.banned_emails.is_banned(&email).await? {
            return Err(PaymentServiceError::Validation(
                "A valid email address is required".into(),
            ));
        }
        if input.amount_cents <= 0 {
            return Err(PaymentServiceError::Validation(
                "Amount must be positive".into(),
            ));
        }
        let item_name = input.item_name.trim().to_string();
        if item_name.is_empty() {
            return Err(PaymentServiceError::Validation(
                "Item name is required".into(),
            ));
        }
        let currency = input
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "USD".to_string());

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_email: email,
            item_kind: input.item_kind,
            item_name,
            amount_cents: input.amount_cents,
            currency,
            status: OrderStatus::Pending,
            provider_session_id: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.create(&order).await?;

        let session = match self.create_provider_session(secret_key, &order).await {
            Ok(session) => session,
            Err(e) => {
                // The order is dead if checkout never opened
                self.orders.mark_failed(&order.id).await?;
                tracing::warn!(order_id = %order.id, error = %e, "Checkout session creation failed");
                return Err(PaymentServiceError::Provider(e.to_string()));
            }
        };

        self.orders
            .set_provider_session(&order.id, &session.id)
            .await?;
        tracing::info!(order_id = %order.id, "Created checkout session");

        Ok(CheckoutSession {
            order_id: order.id,
            checkout_url: session.url,
        })
    }

    async fn create_provider_session(
        &self,
        secret_key: &str,
        order: &Order,
    ) -> anyhow::Result<ProviderSessionResponse> {
        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        );
        let request = ProviderSessionRequest {
            reference: &order.id,
            amount_cents: order.amount_cents,
            currency: &order.currency,
            description: &order.item_name,
            success_url: &self.config.success_url,
            cancel_url: &self.config.cancel_url,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(secret_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("provider returned {}", response.status());
        }
        Ok(response.json::<ProviderSessionResponse>().await?)
    }

    /// Handle a signed provider callback.
    ///
    /// `signature_header` carries `sha256=<hex>` computed over the raw body.
    /// Verification runs before the body is parsed; a bad signature never
    /// touches the database.
    pub async fn handle_callback(
        &self,
        signature_header: &str,
        body: &[u8],
    ) -> Result<Order, PaymentServiceError> {
        let secret_key = self
            .config
            .secret_key
            .as_deref()
            .ok_or(PaymentServiceError::NotConfigured)?;

        if !verify_signature(secret_key, signature_header, body) {
            return Err(PaymentServiceError::InvalidSignature);
        }

        let event: CallbackEvent = serde_json::from_slice(body)
            .map_err(|e| PaymentServiceError::Validation(format!("Malformed callback: {}", e)))?;

        let order = self
            .orders
            .get_by_id(&event.reference)
            .await?
            .ok_or(PaymentServiceError::NotFound)?;

        match event.event_type.as_str() {
            "checkout.completed" => {
                let newly_paid = self.orders.mark_paid(&order.id).await?;
                if newly_paid {
                    tracing::info!(order_id = %order.id, "Order paid");
                    if order.item_kind == OrderItemKind::Template {
                        self.orders
                            .record_template_purchase(&TemplatePurchase {
                                id: 0,
                                order_id: order.id.clone(),
                                template_name: order.item_name.clone(),
                                buyer_email: order.customer_email.clone(),
                                created_at: Utc::now(),
                            })
                            .await?;
                    }
                } else {
                    tracing::debug!(order_id = %order.id, "Replayed callback for settled order");
                }
            }
            "checkout.failed" => {
                if self.orders.mark_failed(&order.id).await? {
                    tracing::info!(order_id = %order.id, "Order failed");
                }
            }
            other => {
                return Err(PaymentServiceError::Validation(format!(
                    "Unknown callback type: {}",
                    other
                )));
            }
        }

        self.orders
            .get_by_id(&order.id)
            .await?
            .ok_or(PaymentServiceError::NotFound)
    }

    /// Get an order by id.
    pub async fn get_order(&self, id: &str) -> Result<Order, PaymentServiceError> {
        self.orders
            .get_by_id(id)
            .await?
            .ok_or(PaymentServiceError::NotFound)
    }

    /// List orders, newest first (staff).
    pub async fn list_orders(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Order>, PaymentServiceError> {
        Ok(self.orders.list(params).await?)
    }

    /// List template purchases for a buyer email.
    pub async fn list_purchases(
        &self,
        email: &str,
    ) -> Result<Vec<TemplatePurchase>, PaymentServiceError> {
        Ok(self
            .orders
            .list_purchases_by_email(&email.trim().to_lowercase())
            .await?)
    }

    /// Count orders in a given status.
    pub async fn count_by_status(&self, status: OrderStatus) -> Result<i64, PaymentServiceError> {
        Ok(self.orders.count_by_status(status).await?)
    }
}

/// Verify a `sha256=<hex>` signature over the raw body. Comparison is
/// constant-time via the Mac verifier.
fn verify_signature(secret: &str, header: &str, body: &[u8]) -> bool {
    let Some(hex_sig) = header.trim().strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxBannedEmailRepository, SqlxOrderRepository};
    use crate::db::{create_test_pool, migrations};

    const SECRET: &str = "test-secret";

    async fn setup() -> (PaymentService, Arc<dyn OrderRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let orders = SqlxOrderRepository::boxed(pool.clone());
        let config = PaymentConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            secret_key: Some(SECRET.to_string()),
            success_url: "http://localhost/success".to_string(),
            cancel_url: "http://localhost/cancel".to_string(),
        };
        let service = PaymentService::new(
            orders.clone(),
            SqlxBannedEmailRepository::boxed(pool),
            config,
        );
        (service, orders)
    }

    fn sign(body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    async fn pending_order(orders: &Arc<dyn OrderRepository>, kind: OrderItemKind) -> Order {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_email: "buyer@example.test".to_string(),
            item_kind: kind,
            item_name: "Starter Template".to_string(),
            amount_cents: 4900,
            currency: "USD".to_string(),
            status: OrderStatus::Pending,
            provider_session_id: None,
            created_at: now,
            updated_at: now,
        };
        orders.create(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_create_payment_validation() {
        let (service, _) = setup().await;

        let result = service
            .create_payment(CreateOrderInput {
                customer_email: "buyer@example.test".to_string(),
                item_kind: OrderItemKind::Template,
                item_name: "T".to_string(),
                amount_cents: 0,
                currency: None,
            })
            .await;
        assert!(matches!(result, Err(PaymentServiceError::Validation(_))));

        let result = service
            .create_payment(CreateOrderInput {
                customer_email: "not-an-email".to_string(),
                item_kind: OrderItemKind::Template,
                item_name: "T".to_string(),
                amount_cents: 100,
                currency: None,
            })
            .await;
        assert!(matches!(result, Err(PaymentServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_order() {
        let (service, orders) = setup().await;

        // api_base points at a closed port, so session creation errors out
        let result = service
            .create_payment(CreateOrderInput {
                customer_email: "buyer@example.test".to_string(),
                item_kind: OrderItemKind::Service,
                item_name: "Care plan".to_string(),
                amount_cents: 9900,
                currency: None,
            })
            .await;
        assert!(matches!(result, Err(PaymentServiceError::Provider(_))));

        let listing = orders.list(&ListParams::default()).await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_callback_marks_paid_and_records_purchase() {
        let (service, orders) = setup().await;
        let order = pending_order(&orders, OrderItemKind::Template).await;

        let body = serde_json::to_vec(&serde_json::json!({
            "type": "checkout.completed",
            "reference": order.id,
        }))
        .unwrap();

        let updated = service.handle_callback(&sign(&body), &body).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Paid);

        let purchases = service.list_purchases("buyer@example.test").await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].template_name, "Starter Template");
    }

    #[tokio::test]
    async fn test_replayed_callback_is_idempotent() {
        let (service, orders) = setup().await;
        let order = pending_order(&orders, OrderItemKind::Template).await;

        let body = serde_json::to_vec(&serde_json::json!({
            "type": "checkout.completed",
            "reference": order.id,
        }))
        .unwrap();

        service.handle_callback(&sign(&body), &body).await.unwrap();
        let replay = service.handle_callback(&sign(&body), &body).await.unwrap();
        assert_eq!(replay.status, OrderStatus::Paid);

        // Still exactly one ledger row
        let purchases = service.list_purchases("buyer@example.test").await.unwrap();
        assert_eq!(purchases.len(), 1);
    }

    #[tokio::test]
    async fn test_paid_order_cannot_fail() {
        let (service, orders) = setup().await;
        let order = pending_order(&orders, OrderItemKind::Service).await;

        let paid = serde_json::to_vec(&serde_json::json!({
            "type": "checkout.completed",
            "reference": order.id,
        }))
        .unwrap();
        service.handle_callback(&sign(&paid), &paid).await.unwrap();

        let failed = serde_json::to_vec(&serde_json::json!({
            "type": "checkout.failed",
            "reference": order.id,
        }))
        .unwrap();
        let result = service.handle_callback(&sign(&failed), &failed).await.unwrap();
        assert_eq!(result.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let (service, orders) = setup().await;
        let order = pending_order(&orders, OrderItemKind::Template).await;

        let body = serde_json::to_vec(&serde_json::json!({
            "type": "checkout.completed",
            "reference": order.id,
        }))
        .unwrap();

        let result = service.handle_callback("sha256=deadbeef", &body).await;
        assert!(matches!(result, Err(PaymentServiceError::InvalidSignature)));

        let result = service.handle_callback("nonsense", &body).await;
        assert!(matches!(result, Err(PaymentServiceError::InvalidSignature)));

        // Tampered body fails against a signature for the original
        let signature = sign(&body);
        let mut tampered = body.clone();
        tampered[0] ^= 1;
        let result = service.handle_callback(&signature, &tampered).await;
        assert!(matches!(result, Err(PaymentServiceError::InvalidSignature)));

        // Nothing changed
        assert_eq!(
            service.get_order(&order.id).await.unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_unknown_callback_type_rejected() {
        let (service, orders) = setup().await;
        let order = pending_order(&orders, OrderItemKind::Template).await;

        let body = serde_json::to_vec(&serde_json::json!({
            "type": "checkout.refunded",
            "reference": order.id,
        }))
        .unwrap();

        let result = service.handle_callback(&sign(&body), &body).await;
        assert!(matches!(result, Err(PaymentServiceError::Validation(_))));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn sign_with(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn computed_signature_verifies(
            secret in "[a-zA-Z0-9]{8,32}",
            body in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let header = sign_with(&secret, &body);
            prop_assert!(verify_signature(&secret, &header, &body));
        }

        #[test]
        fn tampered_body_fails_verification(
            secret in "[a-zA-Z0-9]{8,32}",
            mut body in proptest::collection::vec(any::<u8>(), 1..256),
            flip in 0usize..256,
        ) {
            let header = sign_with(&secret, &body);
            let idx = flip % body.len();
            body[idx] ^= 0x01;
            prop_assert!(!verify_signature(&secret, &header, &body));
        }

        #[test]
        fn wrong_secret_fails_verification(
            secret in "[a-zA-Z0-9]{8,32}",
            body in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let header = sign_with(&secret, &body);
            let other = format!("{}x", secret);
            prop_assert!(!verify_signature(&other, &header, &body));
        }

        #[test]
        fn header_without_prefix_fails(
            secret in "[a-zA-Z0-9]{8,32}",
            body in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let header = sign_with(&secret, &body);
            let bare = header.trim_start_matches("sha256=");
            prop_assert!(!verify_signature(&secret, bare, &body));
        }
    }
}
