//! Transactional email client
//!
//! Thin wrapper over a Brevo-style SMTP API: one endpoint, api-key header,
//! JSON payload with sender, recipients, subject and HTML body.

use lexdir_common::config::EmailSettings;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const API_URL: &str = "https://api.brevo.com/v3/smtp/email";
const USER_AGENT: &str = "Lexdir/0.1.0 (+https://lexdir.example)";

/// Email client errors
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailPayload<'a> {
    sender: EmailAddress<'a>,
    to: Vec<EmailAddress<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

/// Transactional email API client
pub struct EmailClient {
    http_client: reqwest::Client,
    settings: EmailSettings,
}

impl EmailClient {
    pub fn new(settings: EmailSettings) -> Result<Self, EmailError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EmailError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    /// Send one HTML email to one recipient
    pub async fn send(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let payload = SendEmailPayload {
            sender: EmailAddress {
                email: &self.settings.sender_email,
                name: self.settings.sender_name.as_deref(),
            },
            to: vec![EmailAddress {
                email: to_email,
                name: to_name,
            }],
            subject,
            html_content: html_body,
        };

        tracing::debug!(to = %to_email, subject = %subject, "Sending email");

        let response = self
            .http_client
            .post(API_URL)
            .header("api-key", &self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmailError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmailError::ApiError(status.as_u16(), error_text));
        }

        tracing::info!(to = %to_email, "Email accepted by provider");
        Ok(())
    }
}
