//! Discord integration
//!
//! Two halves:
//! - [`DiscordNotifier`] pushes event messages to a configured webhook URL.
//!   Delivery is best-effort: failures are logged and never surfaced to the
//!   request that triggered them.
//! - [`InteractionVerifier`] checks the Ed25519 signature Discord attaches to
//!   interaction callbacks before we act on them.

use anyhow::{Context, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use serde_json::json;
use std::time::Duration;

/// Timeout for webhook deliveries
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Outbound Discord webhook notifier.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl DiscordNotifier {
    /// Create a notifier. With no webhook URL configured every send is a
    /// silent no-op.
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            webhook_url,
        }
    }

    /// Whether a webhook URL is configured
    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Send a plain-text message. Errors are logged, never returned.
    pub async fn send(&self, content: &str) {
        self.post(json!({ "content": content })).await;
    }

    /// Send an embed with a title and labeled fields.
    pub async fn send_embed(&self, title: &str, fields: &[(&str, String)]) {
        let fields: Vec<_> = fields
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value, "inline": true }))
            .collect();

        self.post(json!({
            "embeds": [{
                "title": title,
                "fields": fields,
            }]
        }))
        .await;
    }

    async fn post(&self, payload: serde_json::Value) {
        let Some(url) = &self.webhook_url else {
            return;
        };

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Discord notification delivered");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Discord webhook rejected notification");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to deliver Discord notification");
            }
        }
    }
}

/// Verifier for Discord interaction signatures.
///
/// Discord signs `timestamp || body` with the application's Ed25519 key and
/// sends the hex signature in `x-signature-ed25519` alongside
/// `x-signature-timestamp`.
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// Build a verifier from the application public key (64 hex characters).
    pub fn new(public_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(public_key_hex.trim())
            .context("Discord public key is not valid hex")?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Discord public key must be 32 bytes"))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .context("Discord public key is not a valid Ed25519 key")?;

        Ok(Self { key })
    }

    /// Verify a request signature over `timestamp || body`.
    pub fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
        let Ok(sig_bytes) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).is_ok()
    }
}
