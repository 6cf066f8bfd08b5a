use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    user::{NewUser, User, UserId},
};

/// Durable identity records. Emails are stored and looked up lowercase;
/// callers normalize before reaching this trait.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Create a new identity. Fails on a duplicate email.
    async fn create(&self, new_user: NewUser) -> Result<User, Error>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Update the mutable profile fields of an identity.
    async fn update(&self, user: &User) -> Result<User, Error>;

    /// Record the email-confirmation timestamp.
    async fn mark_email_confirmed(&self, id: &UserId) -> Result<(), Error>;

    /// Record a successful login.
    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), Error>;
}
