//! Repository traits for the Identity Store
//!
//! These traits are the seam between the credential lifecycle and whatever
//! keyed store holds the durable records. Identities, credentials, roles,
//! and challenges are separate maps keyed by identity id; nothing here
//! requires navigation between them.

pub mod challenge;
pub mod credential;
pub mod role;
pub mod user;

pub use challenge::ChallengeRepository;
pub use credential::CredentialRepository;
pub use role::RoleRepository;
pub use user::UserRepository;

use async_trait::async_trait;
use std::sync::Arc;

use crate::Error;

/// Access to every repository a storage backend provides, plus a liveness
/// check. Implemented once per backend. Accessors hand out shared handles
/// so services can hold their repositories independently.
#[async_trait]
pub trait RepositoryProvider: Send + Sync + 'static {
    type UserRepo: UserRepository;
    type CredentialRepo: CredentialRepository;
    type RoleRepo: RoleRepository;
    type ChallengeRepo: ChallengeRepository;

    fn user(&self) -> Arc<Self::UserRepo>;

    fn credential(&self) -> Arc<Self::CredentialRepo>;

    fn role(&self) -> Arc<Self::RoleRepo>;

    fn challenge(&self) -> Arc<Self::ChallengeRepo>;

    /// Backend health check.
    async fn health_check(&self) -> Result<(), Error>;
}
