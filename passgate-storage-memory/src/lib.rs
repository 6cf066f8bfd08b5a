//! In-memory identity store
//!
//! The reference [`RepositoryProvider`] backing the credential lifecycle
//! with concurrent maps: an arena of identities keyed by id with a
//! lowercase-email index, and separate maps for credentials, role sets,
//! and verification challenges, all keyed by identity id.
//!
//! Challenge updates go through a compare-and-update on the map entry, so
//! attempt counting and blocking are atomic per identity even under
//! concurrent verification attempts.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use passgate_core::{
    Error, PasswordCredential, RepositoryProvider, User, UserId, VerificationChallenge,
    error::StorageError,
    repositories::{ChallengeRepository, CredentialRepository, RoleRepository, UserRepository},
    user::NewUser,
};

/// In-memory [`RepositoryProvider`].
#[derive(Default)]
pub struct MemoryStore {
    users: Arc<MemoryUserRepository>,
    credentials: Arc<MemoryCredentialRepository>,
    roles: Arc<MemoryRoleRepository>,
    challenges: Arc<MemoryChallengeRepository>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryProvider for MemoryStore {
    type UserRepo = MemoryUserRepository;
    type CredentialRepo = MemoryCredentialRepository;
    type RoleRepo = MemoryRoleRepository;
    type ChallengeRepo = MemoryChallengeRepository;

    fn user(&self) -> Arc<MemoryUserRepository> {
        Arc::clone(&self.users)
    }

    fn credential(&self) -> Arc<MemoryCredentialRepository> {
        Arc::clone(&self.credentials)
    }

    fn role(&self) -> Arc<MemoryRoleRepository> {
        Arc::clone(&self.roles)
    }

    fn challenge(&self) -> Arc<MemoryChallengeRepository> {
        Arc::clone(&self.challenges)
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Identity arena keyed by id, with a lowercase-email index for lookups.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<UserId, User>,
    by_email: DashMap<String, UserId>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, Error> {
        let user = User::builder()
            .id(new_user.id)
            .email(new_user.email)
            .name(new_user.name)
            .build()?;

        // The email index entry doubles as the uniqueness check.
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "email already registered: {}",
                user.email
            ))
            .into()),
            Entry::Vacant(vacant) => {
                vacant.insert(user.id.clone());
                self.users.insert(user.id.clone(), user.clone());
                Ok(user)
            }
        }
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let Some(id) = self.by_email.get(email).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn update(&self, user: &User) -> Result<User, Error> {
        let Some(mut stored) = self.users.get_mut(&user.id) else {
            return Err(StorageError::NotFound.into());
        };
        // The email is the index key; it does not change through update.
        if stored.email != user.email {
            return Err(StorageError::Conflict("email is immutable".to_string()).into());
        }

        *stored = user.clone();
        Ok(user.clone())
    }

    async fn mark_email_confirmed(&self, id: &UserId) -> Result<(), Error> {
        let Some(mut stored) = self.users.get_mut(id) else {
            return Err(StorageError::NotFound.into());
        };
        stored.email_confirmed_at = Some(Utc::now());
        Ok(())
    }

    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), Error> {
        let Some(mut stored) = self.users.get_mut(id) else {
            return Err(StorageError::NotFound.into());
        };
        stored.last_login_at = Some(at);
        Ok(())
    }
}

/// Active credential per identity; superseded credentials are retained
/// inactive for audit and never validated.
#[derive(Default)]
pub struct MemoryCredentialRepository {
    active: DashMap<UserId, PasswordCredential>,
    superseded: DashMap<UserId, Vec<PasswordCredential>>,
}

impl MemoryCredentialRepository {
    /// Superseded (inactive) credentials for an identity, oldest first.
    pub fn superseded_for(&self, user_id: &UserId) -> Vec<PasswordCredential> {
        self.superseded
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CredentialRepository for MemoryCredentialRepository {
    async fn set_active(
        &self,
        user_id: &UserId,
        credential: PasswordCredential,
    ) -> Result<(), Error> {
        if let Some(mut prior) = self.active.insert(user_id.clone(), credential) {
            prior.is_active = false;
            self.superseded
                .entry(user_id.clone())
                .or_default()
                .push(prior);
        }
        Ok(())
    }

    async fn get_active(&self, user_id: &UserId) -> Result<Option<PasswordCredential>, Error> {
        Ok(self.active.get(user_id).map(|entry| entry.value().clone()))
    }
}

/// Role sets keyed by identity id.
#[derive(Default)]
pub struct MemoryRoleRepository {
    roles: DashMap<UserId, BTreeSet<String>>,
}

#[async_trait]
impl RoleRepository for MemoryRoleRepository {
    async fn assign(&self, user_id: &UserId, role: &str) -> Result<(), Error> {
        self.roles
            .entry(user_id.clone())
            .or_default()
            .insert(role.to_string());
        Ok(())
    }

    async fn roles_for(&self, user_id: &UserId) -> Result<Vec<String>, Error> {
        Ok(self
            .roles
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

/// Live verification challenges keyed by identity id.
#[derive(Default)]
pub struct MemoryChallengeRepository {
    challenges: DashMap<UserId, VerificationChallenge>,
}

#[async_trait]
impl ChallengeRepository for MemoryChallengeRepository {
    async fn put(&self, challenge: VerificationChallenge) -> Result<(), Error> {
        self.challenges
            .insert(challenge.user_id.clone(), challenge);
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<VerificationChallenge>, Error> {
        Ok(self.challenges.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn compare_and_update(
        &self,
        current: &VerificationChallenge,
        updated: VerificationChallenge,
    ) -> Result<bool, Error> {
        // The entry guard holds the shard lock, making the compare and the
        // write one atomic step per identity.
        match self.challenges.entry(current.user_id.clone()) {
            Entry::Occupied(mut occupied) if occupied.get() == current => {
                occupied.insert(updated);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), Error> {
        self.challenges.remove(user_id);
        Ok(())
    }
}
