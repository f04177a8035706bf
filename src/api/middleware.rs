//! API middleware
//!
//! Contains:
//! - `AppState`, the shared services handed to every handler
//! - `ApiError`, the JSON error body and its status mapping
//! - Authentication (session token from bearer header or cookie)
//! - Authorization (admin role)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxArticleRepository, SqlxCertificationRepository, SqlxContentRepository,
    SqlxMagicLinkRepository, SqlxProjectRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::models::{User, UserRole};
use crate::render::SiteRenderer;
use crate::services::{
    create_store, ArticleService, AuthService, AuthServiceError, CertificationService,
    ContentService, ContentServiceError, MagicLinkError, MagicLinkService, Mailer,
    MarkdownRenderer, ProjectService, SignInRateLimiter, StorageError, StorageUrls, UploadError,
    UploadService,
};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub config: Arc<Config>,
    pub content_service: Arc<ContentService>,
    pub project_service: Arc<ProjectService>,
    pub article_service: Arc<ArticleService>,
    pub certification_service: Arc<CertificationService>,
    pub auth_service: Arc<AuthService>,
    pub upload_service: Arc<UploadService>,
    pub renderer: Arc<SiteRenderer>,
    pub rate_limiter: Arc<SignInRateLimiter>,
}

impl AppState {
    /// Wire repositories and services over an open, migrated pool
    pub fn new(
        config: Config,
        pool: crate::db::DynDatabasePool,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let cache = create_cache(&config.cache);
        let markdown = MarkdownRenderer::new();

        let content_service = Arc::new(ContentService::new(
            SqlxContentRepository::boxed(pool.clone()),
            cache.clone(),
            markdown.clone(),
        ));
        let project_service = Arc::new(ProjectService::new(
            SqlxProjectRepository::boxed(pool.clone()),
            cache.clone(),
            markdown.clone(),
        ));
        let article_service = Arc::new(ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            cache.clone(),
            markdown,
        ));
        let certification_service = Arc::new(CertificationService::new(
            SqlxCertificationRepository::boxed(pool.clone()),
            cache,
        ));

        let magic_links = Arc::new(MagicLinkService::new(
            &config.auth,
            &config.server.base_url,
            SqlxMagicLinkRepository::boxed(pool.clone()),
        ));
        let auth_service = Arc::new(AuthService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            magic_links,
            mailer,
            config.auth.clone(),
        ));

        let urls = StorageUrls::from_config(&config.storage);
        let store = create_store(&config.storage, &config.upload)?;
        let upload_service = Arc::new(UploadService::new(
            store,
            urls.clone(),
            config.upload.clone(),
            &config.storage.key_prefix,
        ));
        let renderer = Arc::new(SiteRenderer::new(config.site.clone(), urls)?);

        Ok(Self {
            pool,
            config: Arc::new(config),
            content_service,
            project_service,
            article_service,
            certification_service,
            auth_service,
            upload_service,
            renderer,
            rate_limiter: Arc::new(SignInRateLimiter::new()),
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after_secs }),
        )
    }

    /// Logged here; the client only sees the message
    pub fn internal_error(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("Internal error: {}", message);
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(e: ContentServiceError) -> Self {
        match e {
            ContentServiceError::NotFound(msg) => ApiError::not_found(msg),
            ContentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ContentServiceError::DuplicateSlug(slug) => ApiError::with_details(
                "CONFLICT",
                format!("Slug already exists: {}", slug),
                serde_json::json!({ "field": "slug", "value": slug }),
            ),
            ContentServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(e: AuthServiceError) -> Self {
        match e {
            AuthServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            AuthServiceError::InvalidLink(MagicLinkError::InternalError(e)) => {
                ApiError::internal_error(format!("{:#}", e))
            }
            AuthServiceError::InvalidLink(e) => ApiError::unauthorized(e.to_string()),
            AuthServiceError::NotAllowed(msg) => ApiError::forbidden(msg),
            AuthServiceError::UserNotFound => ApiError::not_found("User not found"),
            AuthServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::TooLarge { size, max } => ApiError::with_details(
                "PAYLOAD_TOO_LARGE",
                e.to_string(),
                serde_json::json!({ "size": size, "max": max }),
            ),
            UploadError::InvalidType(_) | UploadError::Empty | UploadError::UnknownImage(_) => {
                ApiError::validation_error(e.to_string())
            }
            UploadError::Storage(StorageError::InvalidKey(key)) => {
                ApiError::validation_error(format!("Invalid object key: {}", key))
            }
            UploadError::Storage(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

/// Session token from `Authorization: Bearer`, falling back to the cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .auth_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware, layered inside `require_auth`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.role != UserRole::Admin {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}
