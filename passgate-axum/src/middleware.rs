//! Credential bridge
//!
//! Gateway-side middleware that turns a session cookie at the edge into
//! trusted identity headers for internal services. A token is looked up in
//! the parsed cookie jar first, then by scanning the raw `Cookie` header
//! for clients whose header the jar cannot parse. A valid token projects
//! `X-User-Id`, `X-User-Email`, and `X-User-Roles` onto the request and
//! stashes the claims for in-process handlers.
//!
//! The bridge never terminates a request: a missing or invalid credential
//! leaves the request exactly as it arrived, and enforcement stays with
//! whatever sits behind the injected headers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use regex::Regex;

use passgate_core::{AccessClaims, RepositoryProvider, TokenService, services::AuthFlow};

use crate::types::CookieConfig;

/// Header carrying the identity id to downstream services.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the identity email to downstream services.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
/// Header carrying the comma-joined role list to downstream services.
pub const USER_ROLES_HEADER: &str = "x-user-roles";

pub struct AppState<R: RepositoryProvider> {
    pub flow: Arc<AuthFlow<R>>,
    pub store: Arc<R>,
    pub tokens: Arc<TokenService>,
    pub cookies: CookieConfig,
    cookie_pattern: Arc<Regex>,
}

impl<R: RepositoryProvider> AppState<R> {
    pub fn new(flow: Arc<AuthFlow<R>>, store: Arc<R>, cookies: CookieConfig) -> Self {
        let cookie_pattern = Arc::new(
            Regex::new(&format!(
                r"(?:^|[;\s]){}=([^;\s]+)",
                regex::escape(&cookies.name)
            ))
            .expect("Invalid cookie fallback pattern"),
        );

        Self {
            tokens: flow.tokens(),
            flow,
            store,
            cookies,
            cookie_pattern,
        }
    }
}

impl<R: RepositoryProvider> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            store: self.store.clone(),
            tokens: self.tokens.clone(),
            cookies: self.cookies.clone(),
            cookie_pattern: self.cookie_pattern.clone(),
        }
    }
}

/// The bridge middleware. Layered over every route; see the module docs.
pub async fn credential_bridge<R>(
    State(state): State<AppState<R>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response
where
    R: RepositoryProvider,
{
    let token = extract_token(&state, &jar, request.headers());

    if let Some(token) = token {
        match state.tokens.validate_session(&token) {
            Ok(claims) => {
                inject_identity_headers(request.headers_mut(), &claims);
                request.extensions_mut().insert(claims);
            }
            Err(e) => {
                // Invalid or expired: log and pass the request through
                // untouched. Nothing downstream will see identity headers.
                tracing::debug!(error = %e, "session token rejected at the bridge");
            }
        }
    }

    next.run(request).await
}

/// Cookie-jar lookup with a raw-header fallback for clients that send the
/// credential outside a well-formed cookie pair.
fn extract_token<R: RepositoryProvider>(
    state: &AppState<R>,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Option<String> {
    if let Some(cookie) = jar.get(&state.cookies.name) {
        return Some(cookie.value().to_string());
    }

    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    state
        .cookie_pattern
        .captures(raw)
        .map(|captures| captures[1].to_string())
}

fn inject_identity_headers(headers: &mut HeaderMap, claims: &AccessClaims) {
    let roles = claims.roles.join(",");
    for (name, value) in [
        (USER_ID_HEADER, claims.sub.as_str()),
        (USER_EMAIL_HEADER, claims.email.as_str()),
        (USER_ROLES_HEADER, roles.as_str()),
    ] {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => {
                tracing::warn!(header = name, "claim not representable as a header value");
            }
        }
    }
}
