//! Blog post model
//!
//! Posts are written in Markdown; `content_html` holds the rendered output so
//! public reads never pay for rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A blog post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    /// Unique identifier
    pub id: i64,
    /// URL slug (unique)
    pub slug: String,
    /// Title
    pub title: String,
    /// Markdown source
    pub content: String,
    /// Rendered HTML
    pub content_html: String,
    /// Short summary shown in listings (optional)
    pub excerpt: Option<String>,
    /// Draft or published
    pub status: BlogPostStatus,
    /// Set when the post is first published
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// Check if the post is publicly visible
    pub fn is_published(&self) -> bool {
        self.status == BlogPostStatus::Published
    }
}

/// Blog post status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogPostStatus {
    /// Only visible to staff
    Draft,
    /// Publicly visible
    Published,
}

impl Default for BlogPostStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for BlogPostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlogPostStatus::Draft => write!(f, "draft"),
            BlogPostStatus::Published => write!(f, "published"),
        }
    }
}

impl FromStr for BlogPostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(BlogPostStatus::Draft),
            "published" => Ok(BlogPostStatus::Published),
            _ => Err(anyhow::anyhow!("Invalid blog post status: {}", s)),
        }
    }
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlogPostInput {
    /// URL slug; generated from the title when omitted
    pub slug: Option<String>,
    /// Title
    pub title: String,
    /// Markdown source
    pub content: String,
    /// Excerpt (optional)
    pub excerpt: Option<String>,
    /// Initial status (optional, defaults to Draft)
    pub status: Option<BlogPostStatus>,
}

/// Input for updating a post
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBlogPostInput {
    /// New slug (optional)
    pub slug: Option<String>,
    /// New title (optional)
    pub title: Option<String>,
    /// New Markdown source (optional)
    pub content: Option<String>,
    /// New excerpt (optional)
    pub excerpt: Option<String>,
    /// New status (optional)
    pub status: Option<BlogPostStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blog_post_status_roundtrip() {
        assert_eq!(
            BlogPostStatus::from_str("published").unwrap(),
            BlogPostStatus::Published
        );
        assert_eq!(BlogPostStatus::Draft.to_string(), "draft");
        assert!(BlogPostStatus::from_str("archived").is_err());
    }

    #[test]
    fn test_default_is_draft() {
        assert_eq!(BlogPostStatus::default(), BlogPostStatus::Draft);
    }
}
