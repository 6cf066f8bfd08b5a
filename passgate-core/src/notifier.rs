//! Outbound notification contract
//!
//! Delivery of codes and links to a user-controlled address is an external
//! collaborator's job. The flow treats every send as best-effort: failures
//! are logged, never propagated into the primary operation, and a bounded
//! timeout keeps a slow transport from stalling a response.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::Error;

/// Delivers codes and links to a user-controlled address.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver an email-confirmation code.
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<(), Error>;

    /// Deliver a password-reset token.
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), Error>;

    /// Deliver the post-registration welcome message.
    async fn send_welcome(&self, email: &str, name: Option<&str>) -> Result<(), Error>;
}

/// A [`Notifier`] that only logs deliveries. Suitable for tests and local
/// runs where no mail transport is wired up.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<(), Error> {
        tracing::info!(email, code, "verification code issued");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), Error> {
        tracing::info!(email, token, "password reset requested");
        Ok(())
    }

    async fn send_welcome(&self, email: &str, name: Option<&str>) -> Result<(), Error> {
        tracing::info!(email, ?name, "welcome message");
        Ok(())
    }
}

/// Run a notification in the background with a delivery deadline.
///
/// The spawned task logs failure or timeout; the caller's operation has
/// already succeeded by the time this is called and must not be failed by
/// a delivery problem.
pub(crate) fn dispatch<N, F, Fut>(notifier: &Arc<N>, timeout: std::time::Duration, kind: &'static str, send: F)
where
    N: Notifier + ?Sized,
    F: FnOnce(Arc<N>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, send(notifier)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, kind, "notification delivery failed");
            }
            Err(_) => {
                tracing::warn!(kind, "notification delivery timed out");
            }
        }
    });
}
