//! Blog post repository
//!
//! Database operations for blog posts. Public listings only see published
//! rows; the admin API sees everything.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{BlogPost, BlogPostStatus, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Blog post repository trait
#[async_trait]
pub trait BlogPostRepository: Send + Sync {
    /// Insert a new post, returning it with the assigned id
    async fn create(&self, post: &BlogPost) -> Result<BlogPost>;

    /// Get a post by ID (any status)
    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>>;

    /// Get a post by slug (any status)
    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    /// List published posts, newest published first
    async fn list_published(&self, params: &ListParams) -> Result<PagedResult<BlogPost>>;

    /// List all posts including drafts, newest first
    async fn list_all(&self, params: &ListParams) -> Result<PagedResult<BlogPost>>;

    /// Update all mutable post fields
    async fn update(&self, post: &BlogPost) -> Result<()>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count posts in a given status
    async fn count_by_status(&self, status: BlogPostStatus) -> Result<i64>;
}

/// SQLx-based blog post repository implementation
pub struct SqlxBlogPostRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogPostRepository {
    /// Create a new SQLx blog post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogPostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BlogPostRepository for SqlxBlogPostRepository {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_sqlite(self.pool.as_sqlite().unwrap(), "id", &id.to_string()).await
            }
            DatabaseDriver::Mysql => {
                get_post_mysql(self.pool.as_mysql().unwrap(), "id", &id.to_string()).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_sqlite(self.pool.as_sqlite().unwrap(), "slug", slug).await
            }
            DatabaseDriver::Mysql => {
                get_post_mysql(self.pool.as_mysql().unwrap(), "slug", slug).await
            }
        }
    }

    async fn list_published(&self, params: &ListParams) -> Result<PagedResult<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), true, params).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), true, params).await
            }
        }
    }

    async fn list_all(&self, params: &ListParams) -> Result<PagedResult<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), false, params).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), false, params).await
            }
        }
    }

    async fn update(&self, post: &BlogPost) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn count_by_status(&self, status: BlogPostStatus) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_by_status_sqlite(self.pool.as_sqlite().unwrap(), status).await
            }
            DatabaseDriver::Mysql => {
                count_by_status_mysql(self.pool.as_mysql().unwrap(), status).await
            }
        }
    }
}

const POST_COLUMNS: &str = "id, slug, title, content, content_html, excerpt, status, published_at, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &BlogPost) -> Result<BlogPost> {
    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts (slug, title, content, content_html, excerpt, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.status.to_string())
    .bind(post.published_at)
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(pool)
    .await
    .context("Failed to create blog post")?;

    let mut created = post.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_post_sqlite(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<BlogPost>> {
    let query = format!(
        "SELECT {} FROM blog_posts WHERE {} = ?",
        POST_COLUMNS, column
    );
    let row = sqlx::query(&query)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get blog post")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    published_only: bool,
    params: &ListParams,
) -> Result<PagedResult<BlogPost>> {
    let (_, per_page, offset) = params.normalize();

    let (query, count_query) = if published_only {
        (
            format!(
                "SELECT {} FROM blog_posts WHERE status = 'published' ORDER BY published_at DESC LIMIT ? OFFSET ?",
                POST_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM blog_posts WHERE status = 'published'",
        )
    } else {
        (
            format!(
                "SELECT {} FROM blog_posts ORDER BY created_at DESC LIMIT ? OFFSET ?",
                POST_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM blog_posts",
        )
    };

    let rows = sqlx::query(&query)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list blog posts")?;

    let total: i64 = sqlx::query(count_query)
        .fetch_one(pool)
        .await
        .context("Failed to count blog posts")?
        .get("count");

    let items: Result<Vec<BlogPost>> = rows.iter().map(row_to_post_sqlite).collect();
    Ok(PagedResult::new(items?, total as u64, params))
}

async fn update_post_sqlite(pool: &SqlitePool, post: &BlogPost) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE blog_posts
        SET slug = ?, title = ?, content = ?, content_html = ?, excerpt = ?, status = ?,
            published_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.status.to_string())
    .bind(post.published_at)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update blog post")?;

    Ok(())
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM blog_posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete blog post")?;

    Ok(())
}

async fn count_by_status_sqlite(pool: &SqlitePool, status: BlogPostStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM blog_posts WHERE status = ?")
        .bind(status.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count blog posts")?;

    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<BlogPost> {
    let status: String = row.get("status");

    Ok(BlogPost {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        excerpt: row.get("excerpt"),
        status: BlogPostStatus::from_str(&status)?,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &BlogPost) -> Result<BlogPost> {
    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts (slug, title, content, content_html, excerpt, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.status.to_string())
    .bind(post.published_at)
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(pool)
    .await
    .context("Failed to create blog post")?;

    let mut created = post.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_post_mysql(pool: &MySqlPool, column: &str, value: &str) -> Result<Option<BlogPost>> {
    let query = format!(
        "SELECT {} FROM blog_posts WHERE {} = ?",
        POST_COLUMNS, column
    );
    let row = sqlx::query(&query)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get blog post")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    published_only: bool,
    params: &ListParams,
) -> Result<PagedResult<BlogPost>> {
    let (_, per_page, offset) = params.normalize();

    let (query, count_query) = if published_only {
        (
            format!(
                "SELECT {} FROM blog_posts WHERE status = 'published' ORDER BY published_at DESC LIMIT ? OFFSET ?",
                POST_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM blog_posts WHERE status = 'published'",
        )
    } else {
        (
            format!(
                "SELECT {} FROM blog_posts ORDER BY created_at DESC LIMIT ? OFFSET ?",
                POST_COLUMNS
            ),
            "SELECT COUNT(*) as count FROM blog_posts",
        )
    };

    let rows = sqlx::query(&query)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list blog posts")?;

    let total: i64 = sqlx::query(count_query)
        .fetch_one(pool)
        .await
        .context("Failed to count blog posts")?
        .get("count");

    let items: Result<Vec<BlogPost>> = rows.iter().map(row_to_post_mysql).collect();
    Ok(PagedResult::new(items?, total as u64, params))
}

async fn update_post_mysql(pool: &MySqlPool, post: &BlogPost) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE blog_posts
        SET slug = ?, title = ?, content = ?, content_html = ?, excerpt = ?, status = ?,
            published_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(&post.excerpt)
    .bind(post.status.to_string())
    .bind(post.published_at)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update blog post")?;

    Ok(())
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM blog_posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete blog post")?;

    Ok(())
}

async fn count_by_status_mysql(pool: &MySqlPool, status: BlogPostStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM blog_posts WHERE status = ?")
        .bind(status.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count blog posts")?;

    Ok(row.get("count"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<BlogPost> {
    let status: String = row.get("status");

    Ok(BlogPost {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        excerpt: row.get("excerpt"),
        status: BlogPostStatus::from_str(&status)?,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup() -> SqlxBlogPostRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxBlogPostRepository::new(pool)
    }

    fn sample_post(slug: &str, status: BlogPostStatus) -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: 0,
            slug: slug.to_string(),
            title: "Hello".to_string(),
            content: "# Hello".to_string(),
            content_html: "<h1>Hello</h1>".to_string(),
            excerpt: None,
            status,
            published_at: if status == BlogPostStatus::Published {
                Some(now)
            } else {
                None
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_slug() {
        let repo = setup().await;

        let created = repo
            .create(&sample_post("hello-world", BlogPostStatus::Draft))
            .await
            .unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_slug("hello-world").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(!found.is_published());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = setup().await;
        repo.create(&sample_post("dup", BlogPostStatus::Draft))
            .await
            .unwrap();
        assert!(repo
            .create(&sample_post("dup", BlogPostStatus::Draft))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_published_listing_hides_drafts() {
        let repo = setup().await;
        repo.create(&sample_post("draft-1", BlogPostStatus::Draft))
            .await
            .unwrap();
        repo.create(&sample_post("pub-1", BlogPostStatus::Published))
            .await
            .unwrap();
        repo.create(&sample_post("pub-2", BlogPostStatus::Published))
            .await
            .unwrap();

        let public = repo.list_published(&ListParams::default()).await.unwrap();
        assert_eq!(public.total, 2);
        assert!(public.items.iter().all(|p| p.is_published()));

        let all = repo.list_all(&ListParams::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup().await;
        let mut post = repo
            .create(&sample_post("mutable", BlogPostStatus::Draft))
            .await
            .unwrap();

        post.status = BlogPostStatus::Published;
        post.published_at = Some(Utc::now());
        post.title = "Updated".to_string();
        repo.update(&post).await.unwrap();

        let reloaded = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert!(reloaded.is_published());
        assert_eq!(reloaded.title, "Updated");

        repo.delete(post.id).await.unwrap();
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let repo = setup().await;
        repo.create(&sample_post("a", BlogPostStatus::Draft))
            .await
            .unwrap();
        repo.create(&sample_post("b", BlogPostStatus::Published))
            .await
            .unwrap();

        assert_eq!(
            repo.count_by_status(BlogPostStatus::Draft).await.unwrap(),
            1
        );
        assert_eq!(
            repo.count_by_status(BlogPostStatus::Published).await.unwrap(),
            1
        );
    }
}
