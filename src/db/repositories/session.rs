//! Session repository
//!
//! A row is the server half of the bearer token handed out when a magic link
//! is redeemed. Rows cascade away with their user; rows past `expires_at`
//! are removed by the periodic sweep.

use crate::db::repositories::{backend, delete_expired_rows, Backend};
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const INSERT_SESSION: &str =
    "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
const SELECT_SESSION: &str =
    "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";
const DELETE_SESSION: &str = "DELETE FROM sessions WHERE id = ?";
const DELETE_USER_SESSIONS: &str = "DELETE FROM sessions WHERE user_id = ?";

/// `SELECT_SESSION` column order
type SessionRow = (String, i64, DateTime<Utc>, DateTime<Utc>);

fn into_session((id, user_id, expires_at, created_at): SessionRow) -> Session {
    Session {
        id,
        user_id,
        expires_at,
        created_at,
    }
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<()>;

    /// Session for `token`, expired or not
    async fn find(&self, token: &str) -> Result<Option<Session>>;

    /// End one session. Returns whether it existed.
    async fn delete(&self, token: &str) -> Result<bool>;

    /// End every session of a user. Returns how many were open.
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;

    /// Remove sessions with `expires_at <= now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<()> {
        let result = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(INSERT_SESSION)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(INSERT_SESSION)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(pool)
                .await
                .map(|_| ()),
        };
        result.with_context(|| format!("Failed to open session for user {}", session.user_id))
    }

    async fn find(&self, token: &str) -> Result<Option<Session>> {
        let row = match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                sqlx::query_as::<_, SessionRow>(SELECT_SESSION)
                    .bind(token)
                    .fetch_optional(pool)
                    .await
            }
            Backend::Mysql(pool) => {
                sqlx::query_as::<_, SessionRow>(SELECT_SESSION)
                    .bind(token)
                    .fetch_optional(pool)
                    .await
            }
        };
        Ok(row.context("Failed to look up session")?.map(into_session))
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        let result = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_SESSION)
                .bind(token)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(DELETE_SESSION)
                .bind(token)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        };
        Ok(result.context("Failed to delete session")? > 0)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        let result = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_USER_SESSIONS)
                .bind(user_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(DELETE_USER_SESSIONS)
                .bind(user_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        };
        result.with_context(|| format!("Failed to delete sessions of user {}", user_id))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        delete_expired_rows(&self.pool, "sessions", now).await
    }
}
