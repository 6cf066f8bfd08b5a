//! One-time verification codes with expiry and lockout
//!
//! Per identity, the challenge moves through `Issued` into one of
//! `Verified`, `Expired`, or `Blocked`. Issuing always starts a fresh
//! record: attempt count at zero, block cleared. Checking walks the
//! decision ladder in a strict order: an active block wins over everything
//! (the code is not even compared while blocked), then expiry, then the
//! code comparison itself.
//!
//! Every failed comparison is recorded through a compare-and-update on the
//! stored record, so two concurrent guesses can never both observe "four
//! attempts" and only one of them account for the fifth.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::{
    Error,
    challenge::VerificationChallenge,
    config::VerificationConfig,
    error::CodeError,
    repositories::ChallengeRepository,
    user::UserId,
};

/// Generates, stores, and checks short numeric one-time codes.
pub struct VerificationCodeService<C: ChallengeRepository> {
    challenges: Arc<C>,
    config: VerificationConfig,
}

impl<C: ChallengeRepository> VerificationCodeService<C> {
    pub fn new(challenges: Arc<C>, config: VerificationConfig) -> Self {
        Self { challenges, config }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Issue a fresh challenge for the identity, replacing any previous one
    /// and resetting the attempt count and block.
    pub async fn issue(&self, user_id: &UserId) -> Result<VerificationChallenge, Error> {
        let now = Utc::now();
        let challenge = VerificationChallenge {
            user_id: user_id.clone(),
            code: generate_code(),
            issued_at: now,
            expires_at: now + self.config.code_ttl,
            attempt_count: 0,
            blocked_until: None,
        };

        self.challenges.put(challenge.clone()).await?;
        Ok(challenge)
    }

    /// Check a submitted code against the live challenge.
    ///
    /// Success leaves the challenge in place; the caller clears it once the
    /// surrounding operation (e.g. marking the email confirmed) went
    /// through. Failures return [`CodeError::Invalid`], [`CodeError::Expired`],
    /// or [`CodeError::Locked`].
    pub async fn check(&self, user_id: &UserId, code: &str) -> Result<(), Error> {
        loop {
            let Some(current) = self.challenges.get(user_id).await? else {
                return Err(CodeError::Invalid.into());
            };

            let now = Utc::now();
            if current.is_blocked(now) {
                // The code is not compared while blocked.
                return Err(CodeError::Locked.into());
            }
            if current.is_expired(now) {
                return Err(CodeError::Expired.into());
            }
            if current.code == code {
                return Ok(());
            }

            let mut updated = current.clone();
            updated.attempt_count += 1;
            let locked = updated.attempt_count >= self.config.max_attempts;
            if locked {
                updated.blocked_until = Some(now + self.config.lockout);
            }

            if self
                .challenges
                .compare_and_update(&current, updated)
                .await?
            {
                if locked {
                    tracing::warn!(user_id = %user_id, "verification attempts exhausted, blocking");
                    return Err(CodeError::Locked.into());
                }
                return Err(CodeError::Invalid.into());
            }
            // Lost the race against a concurrent attempt; re-read and
            // decide again from the stored state.
        }
    }

    /// Whether a new code may be requested: true unless the identity is
    /// currently blocked.
    pub async fn can_request_new_code(&self, user_id: &UserId) -> Result<bool, Error> {
        Ok(match self.challenges.get(user_id).await? {
            Some(challenge) => !challenge.is_blocked(Utc::now()),
            None => true,
        })
    }

    /// Drop the live challenge for an identity.
    pub async fn clear(&self, user_id: &UserId) -> Result<(), Error> {
        self.challenges.clear(user_id).await
    }
}

/// A uniformly random six-digit code.
fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}
