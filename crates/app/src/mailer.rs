//! Outbound mail interface.
//!
//! Delivery is an external collaborator. The core only needs somewhere to
//! hand invite and reset notifications; the default implementation records
//! that a message would have been sent. Token material never reaches logs.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail delivery failed")]
    Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver an invite link to a prospective user.
    async fn send_invite(&self, recipient: &str, invite_url: &str) -> Result<(), MailerError>;

    /// Deliver a password-reset link.
    async fn send_password_reset(
        &self,
        recipient: &str,
        reset_url: &str,
    ) -> Result<(), MailerError>;
}

/// Development mailer: logs that a message was produced, nothing more.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invite(&self, recipient: &str, _invite_url: &str) -> Result<(), MailerError> {
        info!(recipient, "invite mail queued");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        recipient: &str,
        _reset_url: &str,
    ) -> Result<(), MailerError> {
        info!(recipient, "password reset mail queued");
        Ok(())
    }
}
