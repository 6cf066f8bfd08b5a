//! Authentication configuration
//!
//! All tunables live in one immutable struct built once at startup and
//! passed to constructors. Nothing in this crate reads configuration from
//! ambient/static state.

use chrono::Duration;

use crate::{
    Error,
    error::ValidationError,
    token::TokenConfig,
};

/// Verification-code policy: validity window, attempt threshold, lockout.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// How long an issued code stays valid.
    pub code_ttl: Duration,
    /// Failed attempts that trigger a lockout.
    pub max_attempts: u32,
    /// How long a lockout lasts.
    pub lockout: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::minutes(10),
            max_attempts: 5,
            lockout: Duration::minutes(30),
        }
    }
}

/// Top-level configuration for the credential lifecycle.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token: TokenConfig,
    pub verification: VerificationConfig,
    /// Role assigned when registration completes.
    pub default_role: String,
    /// Upper bound on a single outbound notification attempt.
    pub notify_timeout: std::time::Duration,
}

impl AuthConfig {
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            verification: VerificationConfig::default(),
            default_role: "user".to_string(),
            notify_timeout: std::time::Duration::from_secs(5),
        }
    }

    pub fn with_verification(mut self, verification: VerificationConfig) -> Self {
        self.verification = verification;
        self
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    pub fn with_notify_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Load configuration from `PASSGATE_*` environment variables.
    ///
    /// `PASSGATE_TOKEN_SECRET`, `PASSGATE_TOKEN_ISSUER`, and
    /// `PASSGATE_TOKEN_AUDIENCE` are required; the rest fall back to the
    /// defaults documented on each field.
    pub fn from_env() -> Result<Self, Error> {
        let secret = require_env("PASSGATE_TOKEN_SECRET")?;
        let issuer = require_env("PASSGATE_TOKEN_ISSUER")?;
        let audience = require_env("PASSGATE_TOKEN_AUDIENCE")?;

        let mut token = TokenConfig::new(secret.into_bytes(), issuer, audience);
        if let Some(hours) = parse_env("PASSGATE_TOKEN_TTL_HOURS")? {
            token = token.with_ttl(Duration::hours(hours));
        }
        if let Some(minutes) = parse_env("PASSGATE_RESET_TTL_MINUTES")? {
            token = token.with_reset_ttl(Duration::minutes(minutes));
        }

        let mut verification = VerificationConfig::default();
        if let Some(minutes) = parse_env("PASSGATE_CODE_TTL_MINUTES")? {
            verification.code_ttl = Duration::minutes(minutes);
        }
        if let Some(attempts) = parse_env("PASSGATE_LOCKOUT_ATTEMPTS")? {
            verification.max_attempts = attempts;
        }
        if let Some(minutes) = parse_env("PASSGATE_LOCKOUT_MINUTES")? {
            verification.lockout = Duration::minutes(minutes);
        }

        let mut config = Self::new(token).with_verification(verification);
        if let Ok(role) = std::env::var("PASSGATE_DEFAULT_ROLE") {
            config = config.with_default_role(role);
        }

        Ok(config)
    }
}

fn require_env(name: &str) -> Result<String, Error> {
    std::env::var(name)
        .map_err(|_| ValidationError::MissingField(name.to_string()).into())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::InvalidField(name.to_string()).into()),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_defaults() {
        let config = VerificationConfig::default();
        assert_eq!(config.code_ttl, Duration::minutes(10));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.lockout, Duration::minutes(30));
    }

    #[test]
    fn test_auth_config_builders() {
        let config = AuthConfig::new(TokenConfig::new(
            b"secret".to_vec(),
            "issuer",
            "audience",
        ))
        .with_default_role("resident")
        .with_notify_timeout(std::time::Duration::from_secs(2));

        assert_eq!(config.default_role, "resident");
        assert_eq!(config.notify_timeout, std::time::Duration::from_secs(2));
        assert_eq!(config.token.ttl, Duration::hours(24));
    }
}
