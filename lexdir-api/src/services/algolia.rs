//! Algolia search index client
//!
//! Saves and removes denormalized firm records in the directory search index.
//! Record shape is assembled by the sync service; this client only moves it.

use lexdir_common::config::AlgoliaSettings;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "Lexdir/0.1.0 (+https://lexdir.example)";

/// Algolia client errors
#[derive(Debug, Error)]
pub enum AlgoliaError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

/// Denormalized firm record stored in the search index
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub name: String,
    pub slug: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub practice_areas: Vec<String>,
    pub published: bool,
}

/// Algolia REST API client
pub struct AlgoliaClient {
    http_client: reqwest::Client,
    settings: AlgoliaSettings,
}

impl AlgoliaClient {
    pub fn new(settings: AlgoliaSettings) -> Result<Self, AlgoliaError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn object_url(&self, object_id: &str) -> String {
        format!(
            "https://{}.algolia.net/1/indexes/{}/{}",
            self.settings.app_id, self.settings.index_name, object_id
        )
    }

    /// Save (create or replace) a record; returns the objectID
    pub async fn save_record(&self, record: &SearchRecord) -> Result<String, AlgoliaError> {
        let url = self.object_url(&record.object_id);
        tracing::debug!(url = %url, "Saving search record");

        let response = self
            .http_client
            .put(&url)
            .header("X-Algolia-Application-Id", &self.settings.app_id)
            .header("X-Algolia-API-Key", &self.settings.api_key)
            .json(record)
            .send()
            .await
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AlgoliaError::ApiError(status.as_u16(), error_text));
        }

        tracing::info!(object_id = %record.object_id, "Saved search record");
        Ok(record.object_id.clone())
    }

    /// Remove a record; a missing record is not an error
    pub async fn delete_record(&self, object_id: &str) -> Result<(), AlgoliaError> {
        let url = self.object_url(object_id);
        tracing::debug!(url = %url, "Deleting search record");

        let response = self
            .http_client
            .delete(&url)
            .header("X-Algolia-Application-Id", &self.settings.app_id)
            .header("X-Algolia-API-Key", &self.settings.api_key)
            .send()
            .await
            .map_err(|e| AlgoliaError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Ok(());
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AlgoliaError::ApiError(status.as_u16(), error_text));
        }

        Ok(())
    }
}
