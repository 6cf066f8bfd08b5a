//! Service layer for the credential lifecycle
//!
//! Concrete services composing the repositories: identity lookups,
//! verification codes, and the session flow that orchestrates them.

pub mod auth_flow;
pub mod user;
pub mod verification;

pub use auth_flow::{AuthFlow, AuthenticatedSession};
pub use user::UserService;
pub use verification::VerificationCodeService;
