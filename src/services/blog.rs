//! Blog service
//!
//! Post CRUD with Markdown rendering at write time and a cache in front of
//! the public read paths. Cache keys live under the `blog:` prefix so any
//! write can invalidate the whole namespace with one glob delete.

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::BlogPostRepository;
use crate::models::{
    BlogPost, BlogPostStatus, CreateBlogPostInput, ListParams, PagedResult, UpdateBlogPostInput,
};
use crate::services::markdown::{render_markdown, slugify};
use chrono::Utc;
use std::sync::Arc;

/// Blog service errors
#[derive(Debug, thiserror::Error)]
pub enum BlogServiceError {
    #[error("Blog post not found")]
    NotFound,

    #[error("Slug is already in use")]
    SlugTaken,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Blog post management service
pub struct BlogService {
    posts: Arc<dyn BlogPostRepository>,
    cache: Arc<MemoryCache>,
}

impl BlogService {
    /// Create a new blog service
    pub fn new(posts: Arc<dyn BlogPostRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { posts, cache }
    }

    /// Create a post. The slug is derived from the title when not supplied.
    pub async fn create_post(
        &self,
        input: CreateBlogPostInput,
    ) -> Result<BlogPost, BlogServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(BlogServiceError::Validation("Title is required".into()));
        }
        if input.content.trim().is_empty() {
            return Err(BlogServiceError::Validation("Content is required".into()));
        }

        let slug = match input.slug {
            Some(slug) => {
                let slug = slug.trim().to_lowercase();
                if slug.is_empty() || slug != slugify(&slug) {
                    return Err(BlogServiceError::Validation(
                        "Slug may only contain lowercase letters, digits and hyphens".into(),
                    ));
                }
                slug
            }
            None => slugify(&title),
        };
        if slug.is_empty() {
            return Err(BlogServiceError::Validation(
                "Could not derive a slug from the title".into(),
            ));
        }
        if self.posts.get_by_slug(&slug).await?.is_some() {
            return Err(BlogServiceError::SlugTaken);
        }

        let status = input.status.unwrap_or_default();
        let now = Utc::now();
        let post = BlogPost {
            id: 0,
            slug,
            title,
            content_html: render_markdown(&input.content),
            content: input.content,
            excerpt: input.excerpt,
            status,
            published_at: (status == BlogPostStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
        };

        let created = self.posts.create(&post).await?;
        self.invalidate().await;
        tracing::info!(post_id = created.id, slug = %created.slug, "Created blog post");
        Ok(created)
    }

    /// Update a post. Content changes re-render the HTML; moving a draft to
    /// published stamps `published_at` once and never resets it.
    pub async fn update_post(
        &self,
        id: i64,
        input: UpdateBlogPostInput,
    ) -> Result<BlogPost, BlogServiceError> {
        let mut post = self
            .posts
            .get_by_id(id)
            .await?
            .ok_or(BlogServiceError::NotFound)?;

        if let Some(slug) = input.slug {
            let slug = slug.trim().to_lowercase();
            if slug.is_empty() || slug != slugify(&slug) {
                return Err(BlogServiceError::Validation(
                    "Slug may only contain lowercase letters, digits and hyphens".into(),
                ));
            }
            if slug != post.slug {
                if self.posts.get_by_slug(&slug).await?.is_some() {
                    return Err(BlogServiceError::SlugTaken);
                }
                post.slug = slug;
            }
        }
        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(BlogServiceError::Validation("Title is required".into()));
            }
            post.title = title;
        }
        if let Some(content) = input.content {
            if content.trim().is_empty() {
                return Err(BlogServiceError::Validation("Content is required".into()));
            }
            post.content_html = render_markdown(&content);
            post.content = content;
        }
        if let Some(excerpt) = input.excerpt {
            post.excerpt = Some(excerpt);
        }
        if let Some(status) = input.status {
            if status == BlogPostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
            post.status = status;
        }
        post.updated_at = Utc::now();

        self.posts.update(&post).await?;
        self.invalidate().await;
        Ok(post)
    }

    /// Delete a post.
    pub async fn delete_post(&self, id: i64) -> Result<(), BlogServiceError> {
        if self.posts.get_by_id(id).await?.is_none() {
            return Err(BlogServiceError::NotFound);
        }
        self.posts.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Get a published post by slug (public, cached).
    pub async fn get_published(&self, slug: &str) -> Result<BlogPost, BlogServiceError> {
        let cache_key = format!("blog:post:{}", slug);
        if let Ok(Some(post)) = self.cache.get::<BlogPost>(&cache_key).await {
            return Ok(post);
        }

        let post = self
            .posts
            .get_by_slug(slug)
            .await?
            .filter(BlogPost::is_published)
            .ok_or(BlogServiceError::NotFound)?;

        if let Err(e) = self.cache.set(&cache_key, &post).await {
            tracing::warn!(error = %e, "Failed to cache blog post");
        }
        Ok(post)
    }

    /// List published posts (public, cached).
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<BlogPost>, BlogServiceError> {
        let (page, per_page, _) = params.normalize();
        let cache_key = format!("blog:published:{}:{}", page, per_page);
        if let Ok(Some(result)) = self.cache.get::<PagedResult<BlogPost>>(&cache_key).await {
            return Ok(result);
        }

        let result = self.posts.list_published(params).await?;
        if let Err(e) = self.cache.set(&cache_key, &result).await {
            tracing::warn!(error = %e, "Failed to cache blog listing");
        }
        Ok(result)
    }

    /// Get any post by id, drafts included (admin).
    pub async fn get_post(&self, id: i64) -> Result<BlogPost, BlogServiceError> {
        self.posts
            .get_by_id(id)
            .await?
            .ok_or(BlogServiceError::NotFound)
    }

    /// List all posts, drafts included (admin, uncached).
    pub async fn list_all(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<BlogPost>, BlogServiceError> {
        Ok(self.posts.list_all(params).await?)
    }

    /// Count posts in a given status (admin dashboard).
    pub async fn count_by_status(&self, status: BlogPostStatus) -> Result<i64, BlogServiceError> {
        Ok(self.posts.count_by_status(status).await?)
    }

    async fn invalidate(&self) {
        if let Err(e) = self.cache.delete_pattern("blog:*").await {
            tracing::warn!(error = %e, "Failed to invalidate blog cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxBlogPostRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> BlogService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = Arc::new(MemoryCache::new());
        BlogService::new(SqlxBlogPostRepository::boxed(pool), cache)
    }

    fn draft_input(title: &str) -> CreateBlogPostInput {
        CreateBlogPostInput {
            slug: None,
            title: title.to_string(),
            content: "Some **content** here.".to_string(),
            excerpt: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_renders_markdown_and_slug() {
        let service = setup().await;

        let post = service.create_post(draft_input("Hello World!")).await.unwrap();
        assert_eq!(post.slug, "hello-world");
        assert!(post.content_html.contains("<strong>content</strong>"));
        assert_eq!(post.status, BlogPostStatus::Draft);
        assert!(post.published_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let service = setup().await;
        service.create_post(draft_input("Same Title")).await.unwrap();

        let result = service.create_post(draft_input("Same Title")).await;
        assert!(matches!(result, Err(BlogServiceError::SlugTaken)));
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public() {
        let service = setup().await;
        let post = service.create_post(draft_input("Hidden Draft")).await.unwrap();

        let result = service.get_published(&post.slug).await;
        assert!(matches!(result, Err(BlogServiceError::NotFound)));

        let listing = service.list_published(&ListParams::default()).await.unwrap();
        assert_eq!(listing.total, 0);
    }

    #[tokio::test]
    async fn test_publish_stamps_published_at_once() {
        let service = setup().await;
        let post = service.create_post(draft_input("Going Live")).await.unwrap();

        let published = service
            .update_post(
                post.id,
                UpdateBlogPostInput {
                    status: Some(BlogPostStatus::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let first_stamp = published.published_at.expect("published_at should be set");

        // Unpublish and republish: the original stamp survives
        service
            .update_post(
                post.id,
                UpdateBlogPostInput {
                    status: Some(BlogPostStatus::Draft),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let republished = service
            .update_post(
                post.id,
                UpdateBlogPostInput {
                    status: Some(BlogPostStatus::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(republished.published_at, Some(first_stamp));
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let service = setup().await;
        let post = service
            .create_post(CreateBlogPostInput {
                status: Some(BlogPostStatus::Published),
                ..draft_input("Cached Post")
            })
            .await
            .unwrap();

        // Prime the cache
        let fetched = service.get_published(&post.slug).await.unwrap();
        assert_eq!(fetched.title, "Cached Post");

        service
            .update_post(
                post.id,
                UpdateBlogPostInput {
                    title: Some("Fresh Title".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let fetched = service.get_published(&post.slug).await.unwrap();
        assert_eq!(fetched.title, "Fresh Title");
    }

    #[tokio::test]
    async fn test_invalid_slug_rejected() {
        let service = setup().await;
        let result = service
            .create_post(CreateBlogPostInput {
                slug: Some("Not A Slug!".to_string()),
                ..draft_input("Title")
            })
            .await;
        assert!(matches!(result, Err(BlogServiceError::Validation(_))));
    }
}
