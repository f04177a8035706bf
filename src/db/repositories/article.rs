//! Article repository
//!
//! Database operations for articles.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Article;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, article: &Article) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// All articles, newest first, drafts included
    async fn list(&self) -> Result<Vec<Article>>;

    /// All published articles, most recently published first
    async fn list_published(&self) -> Result<Vec<Article>>;

    /// One page of published articles
    async fn list_published_paged(&self, limit: i64, offset: i64) -> Result<Vec<Article>>;

    async fn count_published(&self) -> Result<i64>;

    async fn update(&self, article: &Article) -> Result<Article>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_article_sqlite(self.pool.as_sqlite().unwrap(), article).await,
            DatabaseDriver::Mysql => create_article_mysql(self.pool.as_mysql().unwrap(), article).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_article_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_article_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_article_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_article_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_articles_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_articles_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_published(&self) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_sqlite(self.pool.as_sqlite().unwrap(), -1, 0).await
            }
            DatabaseDriver::Mysql => {
                list_published_mysql(self.pool.as_mysql().unwrap(), i64::MAX, 0).await
            }
        }
    }

    async fn list_published_paged(&self, limit: i64, offset: i64) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_sqlite(self.pool.as_sqlite().unwrap(), limit, offset).await
            }
            DatabaseDriver::Mysql => {
                list_published_mysql(self.pool.as_mysql().unwrap(), limit, offset).await
            }
        }
    }

    async fn count_published(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_published_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_published_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_article_sqlite(self.pool.as_sqlite().unwrap(), article).await,
            DatabaseDriver::Mysql => update_article_mysql(self.pool.as_mysql().unwrap(), article).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_article_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_article_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await,
            DatabaseDriver::Mysql => exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await,
        }
    }
}

const SELECT_ARTICLE: &str = r#"
    SELECT id, slug, title, excerpt, content, content_html, cover_image, status, published_at, created_at, updated_at
    FROM articles
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, excerpt, content, content_html, cover_image, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.excerpt)
    .bind(&article.content)
    .bind(&article.content_html)
    .bind(&article.cover_image)
    .bind(article.status.as_str())
    .bind(article.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

async fn get_article_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ARTICLE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_article_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_article_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_ARTICLE))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_article_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_articles_sqlite(pool: &SqlitePool) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_ARTICLE))
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

/// A negative `limit` means no limit in SQLite
async fn list_published_sqlite(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        "{} WHERE status = 'published' ORDER BY published_at DESC, id DESC LIMIT ? OFFSET ?",
        SELECT_ARTICLE
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

async fn count_published_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE status = 'published'")
        .fetch_one(pool)
        .await
        .context("Failed to count published articles")?;

    Ok(row.get("count"))
}

async fn update_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE articles
        SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?, cover_image = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.excerpt)
    .bind(&article.content)
    .bind(&article.content_html)
    .bind(&article.cover_image)
    .bind(article.status.as_str())
    .bind(article.published_at)
    .bind(now)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    get_article_by_id_sqlite(pool, article.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
}

async fn delete_article_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(())
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check article slug")?;

    Ok(row.get::<i64, _>("count") > 0)
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let status: String = row.get("status");
    Ok(Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        cover_image: row.get("cover_image"),
        status: status.parse().unwrap_or_default(),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, article: &Article) -> Result<Article> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, excerpt, content, content_html, cover_image, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.excerpt)
    .bind(&article.content)
    .bind(&article.content_html)
    .bind(&article.cover_image)
    .bind(article.status.as_str())
    .bind(article.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

async fn get_article_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ARTICLE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_article_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_article_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_ARTICLE))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_article_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_articles_mysql(pool: &MySqlPool) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_ARTICLE))
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

async fn list_published_mysql(pool: &MySqlPool, limit: i64, offset: i64) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        "{} WHERE status = 'published' ORDER BY published_at DESC, id DESC LIMIT ? OFFSET ?",
        SELECT_ARTICLE
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

async fn count_published_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE status = 'published'")
        .fetch_one(pool)
        .await
        .context("Failed to count published articles")?;

    Ok(row.get("count"))
}

async fn update_article_mysql(pool: &MySqlPool, article: &Article) -> Result<Article> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE articles
        SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?, cover_image = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.excerpt)
    .bind(&article.content)
    .bind(&article.content_html)
    .bind(&article.cover_image)
    .bind(article.status.as_str())
    .bind(article.published_at)
    .bind(now)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    get_article_by_id_mysql(pool, article.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
}

async fn delete_article_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(())
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check article slug")?;

    Ok(row.get::<i64, _>("count") > 0)
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    let status: String = row.get("status");
    Ok(Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        cover_image: row.get("cover_image"),
        status: status.parse().unwrap_or_default(),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
