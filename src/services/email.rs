//! Outgoing mail for sign-in links
//!
//! `SmtpMailer` delivers through lettre when an SMTP host is configured.
//! Otherwise `LogMailer` writes the link to the log, which is enough for
//! local development.

use crate::config::{EmailConfig, SiteConfig};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
#[cfg(test)]
use tokio::sync::Mutex;

/// A sign-in link addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInMail {
    pub to: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_sign_in_link(&self, mail: &SignInMail) -> Result<()>;
}

/// Build the mailer the configuration asks for
pub fn create_mailer(email: &EmailConfig, site: &SiteConfig) -> Arc<dyn Mailer> {
    match email.smtp_host.as_deref().map(str::trim) {
        Some(host) if !host.is_empty() => {
            tracing::info!("Sign-in links will be mailed through {}", host);
            Arc::new(SmtpMailer::new(email.clone(), site.name.clone()))
        }
        _ => {
            tracing::info!("No SMTP host configured, sign-in links will be logged");
            Arc::new(LogMailer)
        }
    }
}

fn subject_for(site_name: &str) -> String {
    format!("Your sign-in link for {}", site_name)
}

fn body_for(site_name: &str, mail: &SignInMail) -> String {
    format!(
        "Hello,\n\nUse the link below to sign in to {}:\n\n{}\n\nThe link works once and expires at {} UTC.\n\nIf you did not ask for it, you can ignore this email.\n",
        site_name,
        mail.url,
        mail.expires_at.format("%Y-%m-%d %H:%M")
    )
}

pub struct SmtpMailer {
    config: EmailConfig,
    site_name: String,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig, site_name: String) -> Self {
        Self { config, site_name }
    }

    fn build_message(&self, mail: &SignInMail) -> Result<Message> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_address);

        Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(mail.to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject_for(&self.site_name))
            .header(ContentType::TEXT_PLAIN)
            .body(body_for(&self.site_name, mail))
            .map_err(|e| anyhow!("Failed to build email: {}", e))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_sign_in_link(&self, mail: &SignInMail) -> Result<()> {
        let host = self
            .config
            .smtp_host
            .as_deref()
            .ok_or_else(|| anyhow!("SMTP host not configured"))?;
        let message = self.build_message(mail)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.config.smtp_port);
        if !self.config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }

        builder
            .build()
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::debug!("Sign-in link mailed to {}", mail.to);
        Ok(())
    }
}

/// Logs links instead of sending them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_sign_in_link(&self, mail: &SignInMail) -> Result<()> {
        tracing::info!(
            "Sign-in link for {} (expires {}): {}",
            mail.to,
            mail.expires_at.to_rfc3339(),
            mail.url
        );
        Ok(())
    }
}

/// Keeps every mail in memory so tests can read the link
#[cfg(test)]
#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<SignInMail>>,
}

#[cfg(test)]
impl CapturingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SignInMail> {
        self.sent.lock().await.clone()
    }

    pub async fn last(&self) -> Option<SignInMail> {
        self.sent.lock().await.last().cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_sign_in_link(&self, mail: &SignInMail) -> Result<()> {
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> SignInMail {
        SignInMail {
            to: "me@example.com".to_string(),
            url: "https://me.example.com/api/v1/auth/verify?token=abc".to_string(),
            expires_at: DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_body_contains_link_and_expiry() {
        let body = body_for("Jane Doe", &mail());
        assert!(body.contains("sign in to Jane Doe"));
        assert!(body.contains("https://me.example.com/api/v1/auth/verify?token=abc"));
        assert!(body.contains("2024-05-01 12:30 UTC"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let config = EmailConfig {
            from_address: "no-reply@example.com".to_string(),
            ..Default::default()
        };
        let mailer = SmtpMailer::new(config, "Folio".to_string());
        let mut bad = mail();
        bad.to = "not an address".to_string();
        assert!(mailer.build_message(&bad).is_err());
        assert!(mailer.build_message(&mail()).is_ok());
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        assert!(LogMailer.send_sign_in_link(&mail()).await.is_ok());
    }

    #[tokio::test]
    async fn test_capturing_mailer_records() {
        let mailer = CapturingMailer::new();
        mailer.send_sign_in_link(&mail()).await.unwrap();
        assert_eq!(mailer.sent().await.len(), 1);
        assert_eq!(mailer.last().await.unwrap().to, "me@example.com");
    }

    #[test]
    fn test_create_mailer_without_host() {
        let mut email = EmailConfig::default();
        email.smtp_host = Some("  ".to_string());
        // Falls back to logging; nothing to assert beyond not panicking.
        let _ = create_mailer(&email, &SiteConfig::default());
    }
}
