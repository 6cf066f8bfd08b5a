//! # Passgate Axum Integration
//!
//! Axum routes and middleware for the passgate credential lifecycle: the
//! credential-bridge middleware that projects a validated session cookie
//! into `X-User-*` headers, and the HTTP surface for login, registration,
//! logout, and the password flows.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use passgate_axum::{CookieConfig, routes};
//! use passgate_core::{AuthConfig, TokenConfig, TracingNotifier, services::AuthFlow};
//! use passgate_storage_memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     let config = AuthConfig::new(TokenConfig::new(
//!         std::env::var("PASSGATE_TOKEN_SECRET").unwrap().into_bytes(),
//!         "passgate",
//!         "internal-services",
//!     ));
//!     let flow = Arc::new(AuthFlow::new(store.as_ref(), Arc::new(TracingNotifier), config));
//!
//!     let app = routes(flow, store)
//!         .with_cookie_config(CookieConfig::development())
//!         .build();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use error::{ApiError, Result};
pub use extractors::{CurrentUser, OptionalCurrentUser};
pub use middleware::{
    AppState, USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLES_HEADER, credential_bridge,
};
pub use routes::create_router;
pub use types::{
    AuthResponse, ChangePasswordRequest, CookieConfig, CookieSameSite, HealthResponse,
    LoginRequest, MeResponse, MessageResponse, PasswordResetRequest, RegisterCompleteRequest,
    RegisterStartRequest, RegisterVerifyRequest, ResendCodeRequest, ResetPasswordRequest,
    UserResponse,
};

use axum::Router;
use passgate_core::{RepositoryProvider, services::AuthFlow};
use std::sync::Arc;

/// Create the authentication router for your Axum application.
///
/// Returns a builder so the cookie configuration can be overridden before
/// the router is built; the production defaults apply otherwise.
pub fn routes<R>(flow: Arc<AuthFlow<R>>, store: Arc<R>) -> AuthRouterBuilder<R>
where
    R: RepositoryProvider,
{
    AuthRouterBuilder {
        flow,
        store,
        cookie_config: CookieConfig::default(),
    }
}

/// Builder for configuring the authentication routes.
pub struct AuthRouterBuilder<R: RepositoryProvider> {
    flow: Arc<AuthFlow<R>>,
    store: Arc<R>,
    cookie_config: CookieConfig,
}

impl<R: RepositoryProvider> AuthRouterBuilder<R> {
    /// Set a custom cookie configuration.
    pub fn with_cookie_config(mut self, config: CookieConfig) -> Self {
        self.cookie_config = config;
        self
    }

    /// Build the router with the configured options.
    pub fn build(self) -> Router {
        create_router(self.flow, self.store, self.cookie_config)
    }
}

impl<R: RepositoryProvider> From<AuthRouterBuilder<R>> for Router {
    fn from(builder: AuthRouterBuilder<R>) -> Self {
        builder.build()
    }
}
