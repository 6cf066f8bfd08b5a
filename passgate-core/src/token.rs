//! Signed bearer tokens
//!
//! Tokens are stateless, HS256-signed claim sets: nothing is persisted, and
//! validity is determined entirely by the signature and the embedded
//! timestamps at verification time. Validation enforces issuer, audience,
//! and expiry with zero clock-skew tolerance, and collapses every failure
//! into one undifferentiated [`TokenError::Invalid`] outcome.
//!
//! Beyond the fixed identity fields, a claim set carries an open extension
//! map. The password-reset flow uses it to scope a token to a single
//! purpose; session validation rejects any purpose-scoped token.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::TokenError,
    user::{User, UserId},
};

/// Extension claim naming the purpose a token is scoped to.
pub const PURPOSE_CLAIM: &str = "purpose";

/// Purpose value carried by password-reset tokens.
pub const PASSWORD_RESET_PURPOSE: &str = "password_reset";

/// The decoded claim set of a valid token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the identity id.
    pub sub: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Issued at (UTC seconds).
    pub iat: i64,
    /// Expiry (UTC seconds).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// Open extension claims for forward compatibility. An empty map
    /// serializes to nothing.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl AccessClaims {
    pub fn user_id(&self) -> UserId {
        UserId::from(self.sub.as_str())
    }

    pub fn purpose(&self) -> Option<&str> {
        self.extra.get(PURPOSE_CLAIM).map(String::as_str)
    }
}

/// A freshly signed token together with its expiry, so callers can mirror
/// the expiry onto whatever carries the token (e.g. a cookie).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Configuration for token signing and validation. Loaded once at startup;
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric signing secret.
    pub secret: Vec<u8>,
    pub issuer: String,
    pub audience: String,
    /// Session token lifetime.
    pub ttl: Duration,
    /// Password-reset token lifetime.
    pub reset_ttl: Duration,
}

impl TokenConfig {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl: Duration::hours(24),
            reset_ttl: Duration::minutes(15),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_reset_ttl(mut self, reset_ttl: Duration) -> Self {
        self.reset_ttl = reset_ttl;
        self
    }
}

/// Issues and validates signed claim sets. Pure given its configuration;
/// safe to share across tasks.
pub struct TokenService {
    config: TokenConfig,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Sign a claim set for `user` with the given roles, extension claims,
    /// and lifetime.
    pub fn issue(
        &self,
        user: &User,
        roles: &[String],
        extra: BTreeMap<String, String>,
        ttl: Duration,
    ) -> Result<IssuedToken, Error> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = AccessClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            extra,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.config.secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Sign a session token with the configured session lifetime.
    pub fn issue_session(&self, user: &User, roles: &[String]) -> Result<IssuedToken, Error> {
        self.issue(user, roles, BTreeMap::new(), self.config.ttl)
    }

    /// Sign a short-lived token scoped to the password-reset purpose.
    /// Carries no roles.
    pub fn issue_password_reset(&self, user: &User) -> Result<IssuedToken, Error> {
        let extra = BTreeMap::from([(
            PURPOSE_CLAIM.to_string(),
            PASSWORD_RESET_PURPOSE.to_string(),
        )]);
        self.issue(user, &[], extra, self.config.reset_ttl)
    }

    /// Verify signature, issuer, audience, and expiry (zero leeway) and
    /// return the claims. Every failure mode maps to the same
    /// [`TokenError::Invalid`] so callers cannot distinguish sub-reasons.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(&self.config.secret),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            TokenError::Invalid.into()
        })
    }

    /// Validate a session token: a valid claim set that is not scoped to a
    /// narrower purpose. Keeps purpose-scoped tokens (e.g. password reset)
    /// from doubling as sessions.
    pub fn validate_session(&self, token: &str) -> Result<AccessClaims, Error> {
        let claims = self.validate(token)?;
        if claims.purpose().is_some() {
            return Err(TokenError::Invalid.into());
        }
        Ok(claims)
    }

    /// Validate a password-reset token.
    pub fn validate_password_reset(&self, token: &str) -> Result<AccessClaims, Error> {
        let claims = self.validate(token)?;
        if claims.purpose() != Some(PASSWORD_RESET_PURPOSE) {
            return Err(TokenError::Invalid.into());
        }
        Ok(claims)
    }

    /// Best-effort claim extraction without signature or expiry checks.
    ///
    /// For display purposes only. MUST NOT be used for any authorization
    /// decision; use [`TokenService::validate`] for those.
    pub fn peek_claim(&self, token: &str, name: &str) -> Option<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = Default::default();

        let data =
            decode::<serde_json::Value>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;

        match data.claims.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig::new(
            b"test_secret_key_for_hs256_tokens_not_for_production_use".to_vec(),
            "passgate-test",
            "internal-services",
        )
    }

    fn test_user() -> User {
        User::builder()
            .email("user@example.com".to_string())
            .name(Some("Test User".to_string()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_issue_and_validate_roundtrip() {
        let service = TokenService::new(test_config());
        let user = test_user();
        let roles = vec!["user".to_string(), "agent".to_string()];

        let issued = service.issue_session(&user, &roles).unwrap();
        let claims = service.validate(&issued.token).unwrap();

        assert_eq!(claims.user_id(), user.id);
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.name.as_deref(), Some("Test User"));
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.iss, "passgate-test");
        assert_eq!(claims.aud, "internal-services");
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let service = TokenService::new(test_config());
        let user = test_user();

        // One second past expiry must already fail: zero clock-skew leeway.
        let issued = service
            .issue(&user, &[], BTreeMap::new(), Duration::seconds(-1))
            .unwrap();

        let result = service.validate(&issued.token);
        assert!(matches!(result, Err(Error::Token(TokenError::Invalid))));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let service = TokenService::new(test_config());
        let other = TokenService::new(TokenConfig::new(
            b"a_completely_different_secret_key_of_decent_length".to_vec(),
            "passgate-test",
            "internal-services",
        ));

        let issued = service.issue_session(&test_user(), &[]).unwrap();
        assert!(other.validate(&issued.token).is_err());
    }

    #[test]
    fn test_wrong_issuer_or_audience_is_invalid() {
        let service = TokenService::new(test_config());

        let wrong_issuer = TokenService::new(
            TokenConfig::new(test_config().secret, "someone-else", "internal-services"),
        );
        let wrong_audience = TokenService::new(
            TokenConfig::new(test_config().secret, "passgate-test", "the-public"),
        );

        let issued = service.issue_session(&test_user(), &[]).unwrap();
        assert!(wrong_issuer.validate(&issued.token).is_err());
        assert!(wrong_audience.validate(&issued.token).is_err());
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let service = TokenService::new(test_config());
        let issued = service.issue_session(&test_user(), &[]).unwrap();

        let mut tampered = issued.token.clone();
        tampered.pop();
        assert!(service.validate(&tampered).is_err());
        assert!(service.validate("not.a.token").is_err());
    }

    #[test]
    fn test_reset_token_is_not_a_session() {
        let service = TokenService::new(test_config());
        let user = test_user();

        let reset = service.issue_password_reset(&user).unwrap();
        assert!(service.validate_session(&reset.token).is_err());
        assert!(service.validate_password_reset(&reset.token).is_ok());

        let session = service.issue_session(&user, &[]).unwrap();
        assert!(service.validate_session(&session.token).is_ok());
        assert!(service.validate_password_reset(&session.token).is_err());
    }

    #[test]
    fn test_extension_claims_roundtrip() {
        let service = TokenService::new(test_config());
        let extra = BTreeMap::from([("tenant".to_string(), "acme".to_string())]);

        let issued = service
            .issue(&test_user(), &[], extra, Duration::hours(1))
            .unwrap();
        let claims = service.validate(&issued.token).unwrap();

        assert_eq!(claims.extra.get("tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_peek_claim_without_validation() {
        let service = TokenService::new(test_config());

        // Expired token: validation refuses it, but peeking still works.
        let issued = service
            .issue(&test_user(), &[], BTreeMap::new(), Duration::seconds(-10))
            .unwrap();

        assert!(service.validate(&issued.token).is_err());
        assert_eq!(
            service.peek_claim(&issued.token, "email").as_deref(),
            Some("user@example.com")
        );
        assert!(service.peek_claim(&issued.token, "missing").is_none());
        assert!(service.peek_claim("garbage", "email").is_none());
    }
}
