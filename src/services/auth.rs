//! Authentication service
//!
//! Sign-in is passwordless:
//! 1. `request_link` mails a signed magic link to an eligible address
//! 2. `verify_link` redeems it, creating the profile on first sign-in, and
//!    opens a server-side session
//! 3. the session id is the bearer token checked by `validate_session`
//!
//! Roles follow the configured admin allow-list on every sign-in.

use crate::config::AuthConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, UpdateProfileInput, User, UserRole};
use crate::services::content::clean_optional;
use crate::services::email::{Mailer, SignInMail};
use crate::services::magic_link::{MagicLinkError, MagicLinkService};
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 100;

static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .ok()
});

/// Error types for auth service operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The link could not be redeemed
    #[error(transparent)]
    InvalidLink(#[from] MagicLinkError),

    /// The address is no longer allowed to sign in
    #[error("Sign-in is not allowed for {0}")]
    NotAllowed(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Lowercase and trim, then check the address shape
pub fn normalize_email(email: &str) -> Result<String, AuthServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AuthServiceError::ValidationError("Email cannot be empty".to_string()));
    }
    let well_formed = EMAIL_RE.as_ref().is_some_and(|re| re.is_match(&email));
    if email.len() > MAX_EMAIL_LEN || !well_formed {
        return Err(AuthServiceError::ValidationError(format!(
            "Invalid email address: {}",
            email
        )));
    }
    Ok(email)
}

pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    magic_links: Arc<MagicLinkService>,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        magic_links: Arc<MagicLinkService>,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            magic_links,
            mailer,
            config,
        }
    }

    fn role_for(&self, email: &str) -> UserRole {
        if self.config.is_admin_email(email) {
            UserRole::Admin
        } else {
            UserRole::Viewer
        }
    }

    async fn may_sign_in(&self, email: &str) -> Result<bool, AuthServiceError> {
        if self.config.allow_signup || self.config.is_admin_email(email) {
            return Ok(true);
        }
        Ok(self.user_repo.get_by_email(email).await?.is_some())
    }

    /// Mail a sign-in link.
    ///
    /// Ineligible addresses get `Ok(false)` and no mail, so callers can
    /// answer every valid request the same way. A mail that fails to send
    /// is logged and also reported as `Ok(false)`.
    pub async fn request_link(&self, email: &str) -> Result<bool, AuthServiceError> {
        let email = normalize_email(email)?;

        if !self.may_sign_in(&email).await? {
            tracing::info!("Ignoring sign-in request for unknown address {}", email);
            return Ok(false);
        }

        let link = self.magic_links.issue(&email)?;
        let mail = SignInMail {
            to: email.clone(),
            url: link.url,
            expires_at: link.expires_at,
        };

        match self.mailer.send_sign_in_link(&mail).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!("Failed to send sign-in link to {}: {}", email, e);
                Ok(false)
            }
        }
    }

    /// Redeem a link and open a session
    pub async fn verify_link(&self, token: &str) -> Result<(User, Session), AuthServiceError> {
        let claims = self.magic_links.consume(token).await?;
        let email = claims.sub;

        if !self.may_sign_in(&email).await? {
            return Err(AuthServiceError::NotAllowed(email));
        }

        let role = self.role_for(&email);
        let user = match self.user_repo.get_by_email(&email).await? {
            Some(mut user) => {
                if user.role != role {
                    tracing::info!("Role of {} changed to {}", email, role);
                    user.role = role;
                    user = self.user_repo.update(&user).await?;
                }
                user
            }
            None => {
                let created = self.user_repo.create(&User::new(email.clone(), role)).await?;
                tracing::info!("Created {} profile for {}", role, email);
                created
            }
        };

        self.user_repo.touch_login(user.id).await?;
        let user = self
            .user_repo
            .get_by_id(user.id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        let session = Session::new(user.id, self.config.session_days);
        self.session_repo.create(&session).await?;

        tracing::info!("{} signed in", user.email);
        Ok((user, session))
    }

    /// User behind a session token; expired sessions are removed
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, AuthServiceError> {
        let session = match self
            .session_repo
            .find(token)
            .await?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthServiceError> {
        if !self.session_repo.delete(token).await? {
            tracing::debug!("Logout for an unknown or already ended session");
        }
        Ok(())
    }

    /// End every session of `user`, on all devices. Returns how many ended.
    pub async fn logout_all(&self, user: &User) -> Result<u64, AuthServiceError> {
        let ended = self.session_repo.delete_by_user(user.id).await?;
        tracing::info!("Signed out user {} everywhere ({} sessions)", user.id, ended);
        Ok(ended)
    }

    /// Delete expired sessions and consumed link ids. Returns rows removed.
    pub async fn cleanup_expired(&self) -> Result<u64, AuthServiceError> {
        let sessions = self.session_repo.delete_expired(Utc::now()).await?;
        let links = self.magic_links.cleanup_expired().await?;
        if sessions + links > 0 {
            tracing::debug!("Removed {} expired sessions and {} used links", sessions, links);
        }
        Ok(sessions + links)
    }

    pub async fn update_profile(
        &self,
        user: &User,
        input: UpdateProfileInput,
    ) -> Result<User, AuthServiceError> {
        let mut updated = user.clone();

        if input.name.is_some() {
            let name = clean_optional(input.name);
            if name.as_ref().is_some_and(|n| n.chars().count() > MAX_NAME_LEN) {
                return Err(AuthServiceError::ValidationError(format!(
                    "Name must be at most {} characters",
                    MAX_NAME_LEN
                )));
            }
            updated.name = name;
        }

        if input.avatar_url.is_some() {
            let avatar = clean_optional(input.avatar_url);
            if let Some(url) = &avatar {
                if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')) {
                    return Err(AuthServiceError::ValidationError(
                        "Avatar must be an http(s) URL or a site path".to_string(),
                    ));
                }
            }
            updated.avatar_url = avatar;
        }

        Ok(self.user_repo.update(&updated).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthServiceError> {
        Ok(self.user_repo.list().await?)
    }
}
