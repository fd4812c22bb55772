//! Promo strip service
//!
//! Admin CRUD over the announcement banners plus the cached public listing
//! of currently-active strips. The window check runs at read time, so a
//! strip flips on and off without any admin action; the cache TTL bounds how
//! stale that flip can be.

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::PromoStripRepository;
use crate::models::{CreatePromoStripInput, PromoStrip, UpdatePromoStripInput};
use chrono::Utc;
use std::sync::Arc;

const ACTIVE_CACHE_KEY: &str = "promo:active";

const DEFAULT_BACKGROUND: &str = "#1a1a2e";
const DEFAULT_TEXT_COLOR: &str = "#ffffff";

/// Promo strip service errors
#[derive(Debug, thiserror::Error)]
pub enum PromoServiceError {
    #[error("Promo strip not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Promo strip management service
pub struct PromoService {
    strips: Arc<dyn PromoStripRepository>,
    cache: Arc<MemoryCache>,
}

impl PromoService {
    /// Create a new promo strip service
    pub fn new(strips: Arc<dyn PromoStripRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { strips, cache }
    }

    /// List strips that should be displayed right now (public, cached).
    pub async fn list_active(&self) -> Result<Vec<PromoStrip>, PromoServiceError> {
        if let Ok(Some(strips)) = self.cache.get::<Vec<PromoStrip>>(ACTIVE_CACHE_KEY).await {
            return Ok(strips);
        }

        let now = Utc::now();
        let strips: Vec<PromoStrip> = self
            .strips
            .list_enabled()
            .await?
            .into_iter()
            .filter(|s| s.is_active_at(now))
            .collect();

        if let Err(e) = self.cache.set(ACTIVE_CACHE_KEY, &strips).await {
            tracing::warn!(error = %e, "Failed to cache active promo strips");
        }
        Ok(strips)
    }

    /// List every strip, active or not (admin).
    pub async fn list_all(&self) -> Result<Vec<PromoStrip>, PromoServiceError> {
        Ok(self.strips.list().await?)
    }

    /// Get a strip by id (admin).
    pub async fn get_strip(&self, id: i64) -> Result<PromoStrip, PromoServiceError> {
        self.strips
            .get_by_id(id)
            .await?
            .ok_or(PromoServiceError::NotFound)
    }

    /// Create a strip.
    pub async fn create_strip(
        &self,
        input: CreatePromoStripInput,
    ) -> Result<PromoStrip, PromoServiceError> {
        let text = input.text.trim().to_string();
        if text.is_empty() {
            return Err(PromoServiceError::Validation("Text is required".into()));
        }
        validate_window(input.starts_at, input.expires_at)?;

        let now = Utc::now();
        let strip = PromoStrip {
            id: 0,
            text,
            link_url: input.link_url,
            background_color: input
                .background_color
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
            text_color: input
                .text_color
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
            starts_at: input.starts_at,
            expires_at: input.expires_at,
            enabled: input.enabled.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let created = self.strips.create(&strip).await?;
        self.invalidate().await;
        Ok(created)
    }

    /// Update a strip.
    pub async fn update_strip(
        &self,
        id: i64,
        input: UpdatePromoStripInput,
    ) -> Result<PromoStrip, PromoServiceError> {
        let mut strip = self
            .strips
            .get_by_id(id)
            .await?
            .ok_or(PromoServiceError::NotFound)?;

        if let Some(text) = input.text {
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(PromoServiceError::Validation("Text is required".into()));
            }
            strip.text = text;
        }
        if let Some(link_url) = input.link_url {
            strip.link_url = Some(link_url);
        }
        if let Some(background_color) = input.background_color {
            strip.background_color = background_color;
        }
        if let Some(text_color) = input.text_color {
            strip.text_color = text_color;
        }
        if let Some(starts_at) = input.starts_at {
            strip.starts_at = Some(starts_at);
        }
        if let Some(expires_at) = input.expires_at {
            strip.expires_at = Some(expires_at);
        }
        validate_window(strip.starts_at, strip.expires_at)?;
        if let Some(enabled) = input.enabled {
            strip.enabled = enabled;
        }
        strip.updated_at = Utc::now();

        self.strips.update(&strip).await?;
        self.invalidate().await;
        Ok(strip)
    }

    /// Delete a strip.
    pub async fn delete_strip(&self, id: i64) -> Result<(), PromoServiceError> {
        if self.strips.get_by_id(id).await?.is_none() {
            return Err(PromoServiceError::NotFound);
        }
        self.strips.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    async fn invalidate(&self) {
        if let Err(e) = self.cache.delete_pattern("promo:*").await {
            tracing::warn!(error = %e, "Failed to invalidate promo cache");
        }
    }
}

fn validate_window(
    starts_at: Option<chrono::DateTime<Utc>>,
    expires_at: Option<chrono::DateTime<Utc>>,
) -> Result<(), PromoServiceError> {
    if let (Some(start), Some(end)) = (starts_at, expires_at) {
        if end <= start {
            return Err(PromoServiceError::Validation(
                "Expiry must be after the start".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxPromoStripRepository;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> PromoService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        PromoService::new(SqlxPromoStripRepository::boxed(pool), Arc::new(MemoryCache::new()))
    }

    fn input(text: &str) -> CreatePromoStripInput {
        CreatePromoStripInput {
            text: text.to_string(),
            link_url: None,
            background_color: None,
            text_color: None,
            starts_at: None,
            expires_at: None,
            enabled: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let service = setup().await;
        let strip = service.create_strip(input("Summer sale")).await.unwrap();

        assert!(strip.enabled);
        assert_eq!(strip.background_color, DEFAULT_BACKGROUND);
        assert_eq!(strip.text_color, DEFAULT_TEXT_COLOR);
    }

    #[tokio::test]
    async fn test_active_listing_filters_window() {
        let service = setup().await;
        let now = Utc::now();

        service.create_strip(input("Live now")).await.unwrap();
        service
            .create_strip(CreatePromoStripInput {
                starts_at: Some(now + Duration::hours(1)),
                ..input("Not yet")
            })
            .await
            .unwrap();
        service
            .create_strip(CreatePromoStripInput {
                enabled: Some(false),
                ..input("Switched off")
            })
            .await
            .unwrap();

        let active = service.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].text, "Live now");

        assert_eq!(service.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_writes_invalidate_active_cache() {
        let service = setup().await;
        let strip = service.create_strip(input("Live now")).await.unwrap();

        // Prime the cache
        assert_eq!(service.list_active().await.unwrap().len(), 1);

        service
            .update_strip(
                strip.id,
                UpdatePromoStripInput {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inverted_window_rejected() {
        let service = setup().await;
        let now = Utc::now();

        let result = service
            .create_strip(CreatePromoStripInput {
                starts_at: Some(now),
                expires_at: Some(now - Duration::hours(1)),
                ..input("Backwards")
            })
            .await;
        assert!(matches!(result, Err(PromoServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_strip() {
        let service = setup().await;
        assert!(matches!(
            service.delete_strip(42).await,
            Err(PromoServiceError::NotFound)
        ));
    }
}
