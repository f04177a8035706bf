//! Database repositories
//!
//! One repository per entity. Each trait has an `Sqlx*` implementation that
//! dispatches on the configured driver.

pub mod article;
pub mod certification;
pub mod content;
pub mod magic_link;
pub mod project;
pub mod session;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use certification::{CertificationRepository, SqlxCertificationRepository};
pub use content::{ContentRepository, SqlxContentRepository};
pub use magic_link::{MagicLinkRepository, SqlxMagicLinkRepository};
pub use project::{ProjectRepository, SqlxProjectRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;

/// Concrete sqlx pool behind a `DynDatabasePool`
pub(crate) enum Backend<'a> {
    Sqlite(&'a SqlitePool),
    Mysql(&'a MySqlPool),
}

pub(crate) fn backend(pool: &DynDatabasePool) -> Result<Backend<'_>> {
    let handle = match pool.driver() {
        DatabaseDriver::Sqlite => pool.as_sqlite().map(Backend::Sqlite),
        DatabaseDriver::Mysql => pool.as_mysql().map(Backend::Mysql),
    };
    handle.ok_or_else(|| anyhow!("Pool does not match its {:?} driver", pool.driver()))
}

/// Remove rows of `table` with `expires_at <= now`. Returns rows removed.
pub(crate) async fn delete_expired_rows(
    pool: &DynDatabasePool,
    table: &'static str,
    now: DateTime<Utc>,
) -> Result<u64> {
    let sql = format!("DELETE FROM {} WHERE expires_at <= ?", table);
    let result = match backend(pool)? {
        Backend::Sqlite(p) => sqlx::query(&sql).bind(now).execute(p).await.map(|r| r.rows_affected()),
        Backend::Mysql(p) => sqlx::query(&sql).bind(now).execute(p).await.map(|r| r.rows_affected()),
    };
    result.with_context(|| format!("Failed to delete expired rows from {}", table))
}
