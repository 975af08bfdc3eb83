//! Outbound e-mail.

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("No recipients")]
    NoRecipients,

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Mail rejected: {0}")]
    Rejected(String),
}

/// Plain-text mail dispatch. `Ok` means the transport accepted the message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipients: &[String], subject: &str, body: &str)
    -> Result<(), MailError>;
}

/// Used when no SMTP relay is configured: mails are written to the log.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }
        tracing::info!(?recipients, subject, body, "Mail (SMTP disabled)");
        Ok(())
    }
}

/// Splits a comma-separated address list: trimmed, blanks dropped, first
/// occurrence wins.
pub fn parse_recipients(csv: &str) -> Vec<String> {
    let mut recipients: Vec<String> = Vec::new();
    for address in csv.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !recipients.iter().any(|r| r == address) {
            recipients.push(address.to_string());
        }
    }
    recipients
}

pub fn is_valid_email(email: &str) -> bool {
    email.parse::<lettre::Address>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_recipients(" ops@pharma.test,, qa@pharma.test ,ops@pharma.test"),
            vec!["ops@pharma.test", "qa@pharma.test"]
        );
        assert!(parse_recipients("  ").is_empty());
    }

    #[test]
    fn validates_email_syntax() {
        assert!(is_valid_email("jane@pharma.test"));
        assert!(!is_valid_email("jane"));
        assert!(!is_valid_email("jane@"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn log_mailer_needs_a_recipient() {
        let mailer = LogMailer;
        assert!(matches!(
            mailer.send(&[], "s", "b").await,
            Err(MailError::NoRecipients)
        ));
        assert!(mailer.send(&["a@b.test".into()], "s", "b").await.is_ok());
    }
}
