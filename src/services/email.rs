//! Email service
//!
//! SMTP delivery via lettre. Connection parameters live in the settings
//! table (`smtp_host`, `smtp_port`, `smtp_username`, `smtp_password`,
//! `smtp_from`) so admins can change them at runtime without a restart.

use crate::db::repositories::SettingsRepository;
use crate::models::WebsiteSetupSubmission;
use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

/// SMTP connection parameters loaded from settings
struct SmtpConfig {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    from: String,
}

/// Email delivery service
pub struct EmailService {
    settings: Arc<dyn SettingsRepository>,
}

impl EmailService {
    /// Create a new email service
    pub fn new(settings: Arc<dyn SettingsRepository>) -> Self {
        Self { settings }
    }

    /// Whether SMTP is configured (host and from address present)
    pub async fn is_configured(&self) -> bool {
        self.load_config().await.is_ok()
    }

    async fn load_config(&self) -> Result<SmtpConfig> {
        let host = self
            .settings
            .get("smtp_host")
            .await?
            .context("smtp_host is not configured")?;
        let from = self
            .settings
            .get("smtp_from")
            .await?
            .context("smtp_from is not configured")?;

        let port = match self.settings.get("smtp_port").await? {
            Some(value) => value.parse::<u16>().context("smtp_port is not a number")?,
            None => 587,
        };

        Ok(SmtpConfig {
            host,
            port,
            username: self.settings.get("smtp_username").await?,
            password: self.settings.get("smtp_password").await?,
            from,
        })
    }

    /// Send a plain-text email.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let config = self.load_config().await?;

        let message = Message::builder()
            .from(config.from.parse().context("Invalid from address")?)
            .to(to.parse().context("Invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build email")?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .context("Failed to create SMTP transport")?
                .port(config.port);

        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let transport = builder.build();
        transport
            .send(message)
            .await
            .context("Failed to send email")?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }

    /// Send the confirmation email for a website-setup quote request to the
    /// address the submitter gave.
    ///
    /// Best-effort: failures are logged and swallowed so the public form
    /// never bounces on a broken mailbox. Returns whether the email went out,
    /// which the handler surfaces as a flag in the response.
    pub async fn send_website_setup_confirmation(
        &self,
        submission: &WebsiteSetupSubmission,
    ) -> bool {
        let subject = "We received your website setup request";
        let body = format!(
            "Hi {},\n\nThanks for your website setup request ({}). We'll review \
             it and get back to you shortly.\n\nThe team",
            submission.name, submission.website_type,
        );

        match self.send(&submission.email, subject, &body).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send website setup confirmation");
                false
            }
        }
    }

    /// Notify the agency inbox about a website-setup quote request, when a
    /// `notify_email` address is configured. Best-effort, log-only.
    pub async fn notify_website_setup(&self, submission: &WebsiteSetupSubmission) {
        let notify_to = match self.settings.get("notify_email").await {
            Ok(Some(address)) => address,
            Ok(None) => {
                tracing::debug!("notify_email not configured, skipping setup notification");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load notify_email setting");
                return;
            }
        };

        let subject = format!("New website setup request from {}", submission.name);
        let body = format!(
            "Name: {}\nEmail: {}\nCompany: {}\nWebsite type: {}\nBudget: {}\n\n{}",
            submission.name,
            submission.email,
            submission.company.as_deref().unwrap_or("-"),
            submission.website_type,
            submission.budget.as_deref().unwrap_or("-"),
            submission.details.as_deref().unwrap_or(""),
        );

        if let Err(e) = self.send(&notify_to, &subject, &body).await {
            tracing::warn!(error = %e, "Failed to send website setup notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSettingsRepository;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup() -> (EmailService, Arc<dyn SettingsRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let settings = SqlxSettingsRepository::boxed(pool);
        (EmailService::new(settings.clone()), settings)
    }

    #[tokio::test]
    async fn test_unconfigured_service() {
        let (service, _) = setup().await;
        assert!(!service.is_configured().await);
        assert!(service.send("a@b.test", "s", "b").await.is_err());
    }

    #[tokio::test]
    async fn test_configured_after_settings() {
        let (service, settings) = setup().await;
        settings.set("smtp_host", "smtp.example.test").await.unwrap();
        settings.set("smtp_from", "noreply@example.test").await.unwrap();

        assert!(service.is_configured().await);
    }

    fn sample_submission() -> WebsiteSetupSubmission {
        WebsiteSetupSubmission {
            id: 1,
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            company: None,
            website_type: "portfolio".to_string(),
            budget: None,
            details: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_confirmation_goes_to_submitter_and_swallows_failure() {
        let (service, _) = setup().await;

        // SMTP is unconfigured, so delivery to the submitter's address fails;
        // the call must report that without erroring
        let sent = service
            .send_website_setup_confirmation(&sample_submission())
            .await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn test_agency_notification_without_notify_email_is_noop() {
        let (service, _) = setup().await;

        // No notify_email configured: must not error or attempt delivery
        service.notify_website_setup(&sample_submission()).await;
    }
}
