use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::Utc;

use passgate_core::{IssuedToken, RepositoryProvider, services::AuthFlow};

use crate::{
    error::{ApiError, Result},
    extractors::CurrentUser,
    middleware::{AppState, credential_bridge},
    types::*,
};

pub fn create_router<R>(
    flow: Arc<AuthFlow<R>>,
    store: Arc<R>,
    cookie_config: CookieConfig,
) -> Router
where
    R: RepositoryProvider,
{
    let state = AppState::new(flow, store, cookie_config);

    Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/register/start", post(register_start_handler))
        .route("/register/verify", post(register_verify_handler))
        .route("/register/complete", post(register_complete_handler))
        .route("/register/resend", post(resend_code_handler))
        .route("/change-password", post(change_password_handler))
        .route("/request-password-reset", post(request_password_reset_handler))
        .route("/reset-password", post(reset_password_handler))
        .route("/users/{selector}", get(get_user_handler))
        .route("/me", get(me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            credential_bridge::<R>,
        ))
        .with_state(state)
}

async fn health_handler<R>(State(state): State<AppState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.store.health_check().await.map_err(ApiError::from)?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn login_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let session = state.flow.login(&payload.email, &payload.password).await?;

    // The token travels in the cookie only; the body carries the profile.
    let cookie = session_cookie(&state.cookies, &session.token);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(AuthResponse {
            user: session.user,
            roles: session.roles,
        }),
    ))
}

async fn logout_handler<R>(
    State(state): State<AppState<R>>,
    jar: CookieJar,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    // Sessions are stateless; logging out is clearing the cookie.
    let removal = Cookie::build((state.cookies.name.clone(), ""))
        .path(state.cookies.path.clone())
        .build();
    let jar = jar.remove(removal);

    Ok((
        jar,
        Json(MessageResponse {
            message: "Successfully logged out".to_string(),
        }),
    ))
}

async fn register_start_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<RegisterStartRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.flow.register_start(&payload.email).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "A verification code is on its way".to_string(),
        }),
    ))
}

async fn register_verify_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<RegisterVerifyRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .flow
        .register_verify(&payload.email, &payload.code)
        .await?;

    Ok(Json(MessageResponse {
        message: "Email address confirmed".to_string(),
    }))
}

async fn register_complete_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<RegisterCompleteRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let session = state
        .flow
        .register_complete(
            &payload.email,
            &payload.name,
            &payload.password,
            &payload.confirm_password,
        )
        .await?;

    let cookie = session_cookie(&state.cookies, &session.token);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(AuthResponse {
            user: session.user,
            roles: session.roles,
        }),
    ))
}

async fn resend_code_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<ResendCodeRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.flow.resend_code(&payload.email).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "A verification code is on its way".to_string(),
        }),
    ))
}

async fn change_password_handler<R>(
    State(state): State<AppState<R>>,
    CurrentUser(claims): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .flow
        .change_password(
            &claims.user_id(),
            &payload.current_password,
            &payload.new_password,
            &payload.confirm_password,
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

async fn request_password_reset_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.flow.request_password_reset(&payload.email).await?;

    // One answer whether or not the address is registered.
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If an account with that email exists, a password reset link has been sent."
                .to_string(),
        }),
    ))
}

async fn reset_password_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .flow
        .reset_password(
            &payload.token,
            &payload.new_password,
            &payload.confirm_password,
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

async fn get_user_handler<R>(
    State(state): State<AppState<R>>,
    Path(selector): Path<String>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user = if selector.contains('@') {
        state.flow.get_user_by_email(&selector).await?
    } else {
        state.flow.get_user(&selector.as_str().into()).await?
    };

    match user {
        Some(user) => Ok(Json(UserResponse { user })),
        None => Err(ApiError::NotFound),
    }
}

async fn me_handler<R>(
    State(state): State<AppState<R>>,
    CurrentUser(claims): CurrentUser,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user_id = claims.user_id();
    let user = state
        .flow
        .get_user(&user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let roles = state.flow.roles_for(&user_id).await?;

    Ok(Json(MeResponse { user, roles }))
}

/// Build the session cookie for a freshly issued token. The cookie expiry
/// mirrors the token expiry.
fn session_cookie(config: &CookieConfig, token: &IssuedToken) -> Cookie<'static> {
    let remaining = token.expires_at - Utc::now();
    let max_age = time::Duration::seconds(remaining.num_seconds().max(0));

    Cookie::build((config.name.clone(), token.token.clone()))
        .path(config.path.clone())
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(match config.same_site {
            CookieSameSite::Strict => SameSite::Strict,
            CookieSameSite::Lax => SameSite::Lax,
            CookieSameSite::None => SameSite::None,
        })
        .max_age(max_age)
        .build()
}
