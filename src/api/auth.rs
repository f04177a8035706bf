//! Authentication API endpoints
//!
//! Handles passwordless sign-in:
//! - POST /api/v1/auth/magic-link - Mail a sign-in link
//! - GET /api/v1/auth/verify - Redeem a link from the mail, then redirect
//! - POST /api/v1/auth/verify - Redeem a link, returning the session token
//! - POST /api/v1/auth/logout - End the session
//! - POST /api/v1/auth/logout-all - End every session of the current user
//! - GET /api/v1/auth/me - Current user
//! - PUT /api/v1/auth/profile - Update name and avatar

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{clear_session_cookie, client_ip, session_cookie};
use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::{UpdateProfileInput, User};
use crate::services::normalize_email;

/// Where the browser lands after following a link
const AFTER_SIGN_IN: &str = "/admin";

#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Response for successful sign-in
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/magic-link", post(request_magic_link))
        .route("/verify", get(verify_from_mail).post(verify))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/me", get(get_current_user))
        .route("/profile", put(update_profile))
}

/// POST /api/v1/auth/magic-link
///
/// Answers 202 for every well-formed request so the response does not
/// reveal which addresses may sign in.
async fn request_magic_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MagicLinkRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if let Some(ip) = client_ip(&headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            return Err(ApiError::rate_limited("Too many requests, try again shortly", 60));
        }
        state.rate_limiter.record_ip(ip).await;
    }

    let email = normalize_email(&body.email)?;
    if state.rate_limiter.is_email_limited(&email).await {
        return Err(ApiError::rate_limited(
            "Too many sign-in links requested for this address, try again in 15 minutes",
            900,
        ));
    }
    state.rate_limiter.record_email(&email).await;

    let sent = state.auth_service.request_link(&email).await?;
    tracing::debug!("Magic link requested for {} (sent: {})", email, sent);

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If this address may sign in, a link is on its way".to_string(),
        }),
    ))
}

/// GET /api/v1/auth/verify?token=...
///
/// Target of the emailed link: sets the session cookie and redirects.
async fn verify_from_mail(
    State(state): State<AppState>,
    Query(query): Query<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = state.auth_service.verify_link(&query.token).await?;
    Ok((
        session_cookie(&session.id, &state.config.auth),
        Redirect::to(AFTER_SIGN_IN),
    ))
}

/// POST /api/v1/auth/verify
async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.auth_service.verify_link(&body.token).await?;
    Ok((
        session_cookie(&session.id, &state.config.auth),
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.auth_service.logout(&token).await?;
    }
    Ok((clear_session_cookie(), StatusCode::NO_CONTENT))
}

/// POST /api/v1/auth/logout-all
async fn logout_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state.auth_service.logout_all(&user.0).await?;
    Ok((clear_session_cookie(), StatusCode::NO_CONTENT))
}

/// GET /api/v1/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// PUT /api/v1/auth/profile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<User>, ApiError> {
    let updated = state.auth_service.update_profile(&user.0, body).await?;
    Ok(Json(updated))
}
