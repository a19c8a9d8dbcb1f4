//! Contact-form relay
//!
//! Forwards contact submissions to the outbound email provider (a
//! Brevo-style transactional HTTP API). Nothing is queued or retried; a
//! provider failure surfaces to the caller with the upstream status.

mod rate_limit;

pub use rate_limit::RateLimiter;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ContactConfig;
use crate::error::AppError;
use crate::metrics::CONTACT_RELAYS_TOTAL;

/// A validated contact-form submission
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
    /// Any additional fields the form posted (subject, phone, ...)
    pub extras: Map<String, Value>,
}

/// Outbound email relay
#[derive(Clone)]
pub struct MailRelay {
    http_client: Arc<reqwest::Client>,
    api_base: String,
    api_key: Option<String>,
    to_email: Option<String>,
    from_email: Option<String>,
}

impl MailRelay {
    /// Create a new relay from configuration
    pub fn new(config: &ContactConfig, http_client: Arc<reqwest::Client>) -> Self {
        Self {
            http_client,
            api_base: config.api_base.clone(),
            api_key: normalized(&config.api_key),
            to_email: normalized(&config.to_email),
            from_email: normalized(&config.from_email),
        }
    }

    /// Whether the provider credentials are present
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.to_email.is_some() && self.from_email.is_some()
    }

    /// Relay one submission to the provider
    ///
    /// # Errors
    /// - `Config` when the relay is unconfigured (500 to the caller)
    /// - `Upstream` when the provider answers non-success, carrying the
    ///   upstream status and body
    pub async fn relay(&self, message: &ContactMessage) -> Result<(), AppError> {
        let (Some(api_key), Some(to_email), Some(from_email)) =
            (&self.api_key, &self.to_email, &self.from_email)
        else {
            CONTACT_RELAYS_TOTAL.with_label_values(&["unconfigured"]).inc();
            return Err(AppError::Config(
                "contact relay is not configured \
                 (BREVO_API_KEY, CONTACT_TO_EMAIL, CONTACT_FROM_EMAIL)"
                    .to_string(),
            ));
        };

        let payload = build_email_payload(message, to_email, from_email);

        let response = self
            .http_client
            .post(&self.api_base)
            .header("api-key", api_key)
            .json(&payload)
            .send()
            .await
            .inspect_err(|_| {
                CONTACT_RELAYS_TOTAL.with_label_values(&["error"]).inc();
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            CONTACT_RELAYS_TOTAL.with_label_values(&["error"]).inc();
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "Mail provider rejected contact relay"
            );
            return Err(AppError::Upstream(format!(
                "mail provider returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        CONTACT_RELAYS_TOTAL.with_label_values(&["ok"]).inc();
        tracing::info!(from = %message.email, "Contact message relayed");
        Ok(())
    }
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Build the provider payload for one submission.
///
/// Extra form fields are appended to the text body so nothing the visitor
/// typed is dropped.
fn build_email_payload(
    message: &ContactMessage,
    to_email: &str,
    from_email: &str,
) -> Value {
    let mut text = format!(
        "Name: {}\nEmail: {}\n\n{}\n",
        message.name, message.email, message.message
    );
    for (key, value) in &message.extras {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        text.push_str(&format!("\n{}: {}", key, rendered));
    }

    serde_json::json!({
        "sender": { "email": from_email, "name": "Website contact form" },
        "to": [{ "email": to_email }],
        "replyTo": { "email": message.email, "name": message.name },
        "subject": format!("Contact form: {}", message.name),
        "textContent": text,
    })
}
