//! Outbound email for password-reset codes.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Email provider rejected the message with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    pub fn password_reset(to: &str, name: &str, otp: &str, ttl_minutes: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: "EduLearn password reset code".to_string(),
            text: format!(
                "Hello {},\n\nYour password reset code is {}. It expires in {} minutes.\n\n\
                 If you did not request a reset you can ignore this email.",
                name, otp, ttl_minutes
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// False when messages are only logged
    fn delivers(&self) -> bool;

    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Used when no provider is configured: nothing is sent
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn delivers(&self) -> bool {
        false
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        warn!("Email delivery not configured, skipping \"{}\" to {}", email.subject, email.to);
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP email API
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn delivers(&self) -> bool {
        true
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(&json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "text": email.text,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        info!("Sent \"{}\" to {}", email.subject, email.to);
        Ok(())
    }
}

/// Pick the mailer for the configuration
pub fn mailer_from_config(config: &EmailConfig) -> Result<Box<dyn Mailer>, MailError> {
    match &config.endpoint {
        Some(endpoint) => Ok(Box::new(HttpMailer::new(
            endpoint.clone(),
            config.api_key.clone(),
            config.from.clone(),
        )?)),
        None => Ok(Box::new(LogMailer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_email_carries_code_and_expiry() {
        let email = Email::password_reset("asha@school.in", "Asha", "123456", 10);
        assert_eq!(email.to, "asha@school.in");
        assert!(email.text.contains("123456"));
        assert!(email.text.contains("10 minutes"));
    }

    #[tokio::test]
    async fn unconfigured_mailer_only_logs() {
        let mailer = mailer_from_config(&EmailConfig::default()).unwrap();
        assert!(!mailer.delivers());
        let email = Email::password_reset("a@b.c", "A", "111111", 10);
        assert!(mailer.send(&email).await.is_ok());
    }
}
