/// Outgoing mail for email confirmation
///
/// Delivery is pluggable. [`LogMailer`] writes the confirmation link to the
/// log, which is what development and tests use.

use async_trait::async_trait;
use kanban_shared::models::user::User;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Sends the confirmation token to the pending address
    async fn send_email_confirmation(
        &self,
        user: &User,
        new_email: &str,
        token: &str,
    ) -> Result<(), MailError>;
}

/// Logs confirmations instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email_confirmation(
        &self,
        user: &User,
        new_email: &str,
        token: &str,
    ) -> Result<(), MailError> {
        tracing::info!(
            user_id = user.id,
            new_email = %new_email,
            token = %token,
            "Email confirmation issued"
        );
        Ok(())
    }
}
