use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Verification code error: {0}")]
    Code(#[from] CodeError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or wrong password. Callers must not be able to tell which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Email address has not been confirmed")]
    EmailNotConfirmed,

    #[error("Email address is already confirmed")]
    EmailAlreadyConfirmed,

    #[error("Registration is already complete")]
    AlreadyRegistered,

    #[error("User not found")]
    UserNotFound,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Invalid verification code")]
    Invalid,

    #[error("Verification code has expired")]
    Expired,

    /// Attempt threshold reached; every further check is rejected until the
    /// block elapses, regardless of the code supplied.
    #[error("Too many failed attempts, try again later")]
    Locked,
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Covers bad signature, wrong issuer or audience, and expiry as one
    /// undifferentiated outcome so callers cannot probe for sub-reasons.
    #[error("Invalid token")]
    Invalid,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("New password and confirmation do not match")]
    PasswordMismatch,

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Conflict(String),
}

impl Error {
    /// Whether this error is an expected domain outcome (safe to surface to
    /// the caller) as opposed to an internal failure that must stay opaque.
    pub fn is_domain_error(&self) -> bool {
        match self {
            Error::Auth(AuthError::PasswordHash(_)) => false,
            Error::Token(TokenError::Signing(_)) => false,
            Error::Storage(_) => false,
            _ => true,
        }
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
