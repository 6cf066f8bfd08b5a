use async_trait::async_trait;

use crate::{Error, password::PasswordCredential, user::UserId};

/// Password credentials, at most one active per identity.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    /// Store `credential` as the active credential for the identity,
    /// deactivating any prior one. Superseded credentials may be retained
    /// for audit but must never be returned by [`get_active`].
    ///
    /// [`get_active`]: CredentialRepository::get_active
    async fn set_active(&self, user_id: &UserId, credential: PasswordCredential)
    -> Result<(), Error>;

    /// The active credential for the identity, if one exists.
    async fn get_active(&self, user_id: &UserId) -> Result<Option<PasswordCredential>, Error>;
}
