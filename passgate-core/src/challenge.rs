//! One-time verification challenges
//!
//! A challenge is the live verification-code record for one identity: the
//! code itself, its validity window, and the failed-attempt bookkeeping that
//! drives lockout. At most one challenge is live per identity; issuing a new
//! one replaces the previous record wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// The live verification-code record for an identity.
///
/// `PartialEq` covers every field so stores can implement compare-and-update
/// against the exact record a caller read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChallenge {
    pub user_id: UserId,
    /// Fixed-width numeric code, `100000`..=`999999`.
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempt_count: u32,
    /// Set when the attempt threshold is reached; while in the future, every
    /// check is rejected without comparing the code.
    pub blocked_until: Option<DateTime<Utc>>,
}

impl VerificationChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }
}
