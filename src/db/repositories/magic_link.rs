//! Consumed magic-link token ids
//!
//! A token's `jti` is inserted when the link is redeemed. The primary key on
//! `jti` makes redemption single-use even under concurrent requests.

use crate::db::repositories::{backend, delete_expired_rows, Backend};
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const MARK_USED_SQLITE: &str = "INSERT INTO magic_link_tokens (jti, email, expires_at, used_at) \
     VALUES (?, ?, ?, ?) ON CONFLICT(jti) DO NOTHING";
const MARK_USED_MYSQL: &str =
    "INSERT IGNORE INTO magic_link_tokens (jti, email, expires_at, used_at) VALUES (?, ?, ?, ?)";

#[async_trait]
pub trait MagicLinkRepository: Send + Sync {
    /// Record `jti` as consumed. Returns `false` when it already was.
    async fn mark_used(&self, jti: &str, email: &str, expires_at: DateTime<Utc>) -> Result<bool>;

    /// Forget consumed ids whose tokens expired at or before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxMagicLinkRepository {
    pool: DynDatabasePool,
}

impl SqlxMagicLinkRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MagicLinkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MagicLinkRepository for SqlxMagicLinkRepository {
    async fn mark_used(&self, jti: &str, email: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let used_at = Utc::now();
        let inserted = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(MARK_USED_SQLITE)
                .bind(jti)
                .bind(email)
                .bind(expires_at)
                .bind(used_at)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(MARK_USED_MYSQL)
                .bind(jti)
                .bind(email)
                .bind(expires_at)
                .bind(used_at)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        };
        Ok(inserted.context("Failed to record magic link use")? == 1)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        delete_expired_rows(&self.pool, "magic_link_tokens", now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxMagicLinkRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxMagicLinkRepository::new(pool)
    }

    #[tokio::test]
    async fn test_mark_used_only_once() {
        let repo = setup_test_repo().await;
        let expires = Utc::now() + Duration::minutes(15);

        assert!(repo.mark_used("jti-1", "a@example.com", expires).await.unwrap());
        assert!(!repo.mark_used("jti-1", "a@example.com", expires).await.unwrap());
        assert!(repo.mark_used("jti-2", "a@example.com", expires).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired_records() {
        let repo = setup_test_repo().await;
        let now = Utc::now();

        repo.mark_used("old", "a@example.com", now - Duration::minutes(1)).await.unwrap();
        repo.mark_used("fresh", "a@example.com", now + Duration::minutes(10)).await.unwrap();

        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert!(!repo.mark_used("fresh", "a@example.com", now).await.unwrap());
    }
}
