use async_trait::async_trait;

use crate::{Error, user::UserId};

/// The role set per identity. Role-name administration is out of scope;
/// this is only the identity-to-role mapping the token claims carry.
#[async_trait]
pub trait RoleRepository: Send + Sync + 'static {
    /// Add a role to the identity's set. Adding a role twice is a no-op.
    async fn assign(&self, user_id: &UserId, role: &str) -> Result<(), Error>;

    /// The identity's roles in a stable order.
    async fn roles_for(&self, user_id: &UserId) -> Result<Vec<String>, Error>;
}
