use async_trait::async_trait;

use crate::{Error, challenge::VerificationChallenge, user::UserId};

/// The live verification challenge per identity.
///
/// Attempt counting and blocking decisions read a challenge and write an
/// updated one; [`compare_and_update`] makes that read-modify-write atomic
/// per identity so concurrent checks cannot slip past the attempt
/// threshold.
///
/// [`compare_and_update`]: ChallengeRepository::compare_and_update
#[async_trait]
pub trait ChallengeRepository: Send + Sync + 'static {
    /// Store `challenge` as the live challenge for its identity, replacing
    /// any previous one.
    async fn put(&self, challenge: VerificationChallenge) -> Result<(), Error>;

    async fn get(&self, user_id: &UserId) -> Result<Option<VerificationChallenge>, Error>;

    /// Replace the stored challenge with `updated` only if the stored value
    /// still equals `current`. Returns whether the swap happened.
    async fn compare_and_update(
        &self,
        current: &VerificationChallenge,
        updated: VerificationChallenge,
    ) -> Result<bool, Error>;

    /// Remove the live challenge for an identity, if any.
    async fn clear(&self, user_id: &UserId) -> Result<(), Error>;
}
