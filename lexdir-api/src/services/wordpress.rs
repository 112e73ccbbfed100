//! WordPress REST API client
//!
//! The CMS holds a denormalized copy of each published firm as a `despacho`
//! post. Writes are authenticated with an application password over basic
//! auth. A 404 on update is reported as a distinct error so the caller can
//! fall back to creating the post.

use lexdir_common::config::WordPressSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "Lexdir/0.1.0 (+https://lexdir.example)";

/// WordPress client errors
#[derive(Debug, Error)]
pub enum WpError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Firm document pushed to the CMS
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FirmDocument {
    pub title: String,
    pub slug: String,
    /// `publish` or `draft`
    pub status: String,
    pub content: String,
    pub meta: FirmMeta,
}

/// Custom fields carried on the `despacho` post type
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct FirmMeta {
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub practice_areas: Vec<String>,
    pub branch_count: usize,
}

/// Post as returned by the CMS
#[derive(Debug, Clone, Deserialize)]
pub struct WpPost {
    pub id: i64,
    pub slug: String,
    pub status: String,
    pub title: WpRendered,
    #[serde(default)]
    pub content: Option<WpRendered>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpRendered {
    pub rendered: String,
}

/// WordPress REST API client
pub struct WordPressClient {
    http_client: reqwest::Client,
    settings: WordPressSettings,
}

impl WordPressClient {
    pub fn new(settings: WordPressSettings) -> Result<Self, WpError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WpError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn posts_url(&self) -> String {
        format!(
            "{}/wp-json/wp/v2/despacho",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// Create a new firm post; returns the CMS post id
    pub async fn create_firm_post(&self, document: &FirmDocument) -> Result<i64, WpError> {
        let url = self.posts_url();
        tracing::debug!(url = %url, slug = %document.slug, "Creating CMS post");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.app_password))
            .json(document)
            .send()
            .await
            .map_err(|e| WpError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WpError::ApiError(status.as_u16(), error_text));
        }

        let post: WpPost = response
            .json()
            .await
            .map_err(|e| WpError::ParseError(e.to_string()))?;

        tracing::info!(post_id = post.id, slug = %post.slug, "Created CMS post");
        Ok(post.id)
    }

    /// Update an existing firm post. A 404 surfaces as [`WpError::PostNotFound`]
    /// so the caller can fall back to create.
    pub async fn update_firm_post(
        &self,
        post_id: i64,
        document: &FirmDocument,
    ) -> Result<(), WpError> {
        let url = format!("{}/{}", self.posts_url(), post_id);
        tracing::debug!(url = %url, "Updating CMS post");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.app_password))
            .json(document)
            .send()
            .await
            .map_err(|e| WpError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Err(WpError::PostNotFound(post_id));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WpError::ApiError(status.as_u16(), error_text));
        }

        Ok(())
    }

    /// Delete a firm post (force, skipping the CMS trash)
    pub async fn delete_firm_post(&self, post_id: i64) -> Result<(), WpError> {
        let url = format!("{}/{}?force=true", self.posts_url(), post_id);
        tracing::debug!(url = %url, "Deleting CMS post");

        let response = self
            .http_client
            .delete(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.app_password))
            .send()
            .await
            .map_err(|e| WpError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            // Already gone remotely; nothing to undo
            return Ok(());
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WpError::ApiError(status.as_u16(), error_text));
        }

        Ok(())
    }

    /// Fetch all firm posts, following pagination until a short page
    pub async fn list_firm_posts(&self) -> Result<Vec<WpPost>, WpError> {
        const PER_PAGE: usize = 100;
        let mut posts = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}?per_page={}&page={}&status=publish,draft",
                self.posts_url(),
                PER_PAGE,
                page
            );
            tracing::debug!(url = %url, "Listing CMS posts");

            let response = self
                .http_client
                .get(&url)
                .basic_auth(&self.settings.username, Some(&self.settings.app_password))
                .send()
                .await
                .map_err(|e| WpError::NetworkError(e.to_string()))?;

            let status = response.status();
            // WordPress answers 400 for a page past the end
            if status == 400 && page > 1 {
                break;
            }
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(WpError::ApiError(status.as_u16(), error_text));
            }

            let batch: Vec<WpPost> = response
                .json()
                .await
                .map_err(|e| WpError::ParseError(e.to_string()))?;

            let short_page = batch.len() < PER_PAGE;
            posts.extend(batch);

            if short_page {
                break;
            }
            page += 1;
        }

        tracing::info!(count = posts.len(), "Fetched CMS posts");
        Ok(posts)
    }
}
