//! Singleton content repository
//!
//! `home_content` and `about_content` each hold at most one row, id 1.
//! Saves are upserts on that row.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AboutContent, HomeContent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const SINGLETON_ID: i64 = 1;

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Saved home content, `None` before the first save
    async fn get_home(&self) -> Result<Option<HomeContent>>;

    async fn save_home(&self, home: &HomeContent) -> Result<HomeContent>;

    /// Saved about content, `None` before the first save
    async fn get_about(&self) -> Result<Option<AboutContent>>;

    async fn save_about(&self, about: &AboutContent) -> Result<AboutContent>;
}

pub struct SqlxContentRepository {
    pool: DynDatabasePool,
}

impl SqlxContentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn get_home(&self) -> Result<Option<HomeContent>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_home_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => get_home_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn save_home(&self, home: &HomeContent) -> Result<HomeContent> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => save_home_sqlite(self.pool.as_sqlite().unwrap(), home).await,
            DatabaseDriver::Mysql => save_home_mysql(self.pool.as_mysql().unwrap(), home).await,
        }
    }

    async fn get_about(&self) -> Result<Option<AboutContent>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_about_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => get_about_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn save_about(&self, about: &AboutContent) -> Result<AboutContent> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => save_about_sqlite(self.pool.as_sqlite().unwrap(), about).await,
            DatabaseDriver::Mysql => save_about_mysql(self.pool.as_mysql().unwrap(), about).await,
        }
    }
}

const HOME_COLUMNS: &str =
    "headline, tagline, intro, intro_html, hero_image, cta_label, cta_url, updated_at";
const ABOUT_COLUMNS: &str =
    "title, body, body_html, portrait_image, resume_url, skills, updated_at";

fn encode_skills(skills: &[String]) -> Result<String> {
    serde_json::to_string(skills).context("Failed to encode skills")
}

fn decode_skills(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_home_sqlite(pool: &SqlitePool) -> Result<Option<HomeContent>> {
    let row = sqlx::query(&format!("SELECT {} FROM home_content WHERE id = ?", HOME_COLUMNS))
        .bind(SINGLETON_ID)
        .fetch_optional(pool)
        .await
        .context("Failed to get home content")?;
    row.map(|r| row_to_home_sqlite(&r)).transpose()
}

async fn save_home_sqlite(pool: &SqlitePool, home: &HomeContent) -> Result<HomeContent> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO home_content (id, headline, tagline, intro, intro_html, hero_image, cta_label, cta_url, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            headline = excluded.headline,
            tagline = excluded.tagline,
            intro = excluded.intro,
            intro_html = excluded.intro_html,
            hero_image = excluded.hero_image,
            cta_label = excluded.cta_label,
            cta_url = excluded.cta_url,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(SINGLETON_ID)
    .bind(&home.headline)
    .bind(&home.tagline)
    .bind(&home.intro)
    .bind(&home.intro_html)
    .bind(&home.hero_image)
    .bind(&home.cta_label)
    .bind(&home.cta_url)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to save home content")?;

    get_home_sqlite(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Home content missing after save"))
}

async fn get_about_sqlite(pool: &SqlitePool) -> Result<Option<AboutContent>> {
    let row = sqlx::query(&format!("SELECT {} FROM about_content WHERE id = ?", ABOUT_COLUMNS))
        .bind(SINGLETON_ID)
        .fetch_optional(pool)
        .await
        .context("Failed to get about content")?;
    row.map(|r| row_to_about_sqlite(&r)).transpose()
}

async fn save_about_sqlite(pool: &SqlitePool, about: &AboutContent) -> Result<AboutContent> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO about_content (id, title, body, body_html, portrait_image, resume_url, skills, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            body = excluded.body,
            body_html = excluded.body_html,
            portrait_image = excluded.portrait_image,
            resume_url = excluded.resume_url,
            skills = excluded.skills,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(SINGLETON_ID)
    .bind(&about.title)
    .bind(&about.body)
    .bind(&about.body_html)
    .bind(&about.portrait_image)
    .bind(&about.resume_url)
    .bind(encode_skills(&about.skills)?)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to save about content")?;

    get_about_sqlite(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("About content missing after save"))
}

fn row_to_home_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<HomeContent> {
    Ok(HomeContent {
        headline: row.get("headline"),
        tagline: row.get("tagline"),
        intro: row.get("intro"),
        intro_html: row.get("intro_html"),
        hero_image: row.get("hero_image"),
        cta_label: row.get("cta_label"),
        cta_url: row.get("cta_url"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_about_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<AboutContent> {
    let skills: String = row.get("skills");
    Ok(AboutContent {
        title: row.get("title"),
        body: row.get("body"),
        body_html: row.get("body_html"),
        portrait_image: row.get("portrait_image"),
        resume_url: row.get("resume_url"),
        skills: decode_skills(&skills),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_home_mysql(pool: &MySqlPool) -> Result<Option<HomeContent>> {
    let row = sqlx::query(&format!("SELECT {} FROM home_content WHERE id = ?", HOME_COLUMNS))
        .bind(SINGLETON_ID)
        .fetch_optional(pool)
        .await
        .context("Failed to get home content")?;
    row.map(|r| row_to_home_mysql(&r)).transpose()
}

async fn save_home_mysql(pool: &MySqlPool, home: &HomeContent) -> Result<HomeContent> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO home_content (id, headline, tagline, intro, intro_html, hero_image, cta_label, cta_url, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            headline = VALUES(headline),
            tagline = VALUES(tagline),
            intro = VALUES(intro),
            intro_html = VALUES(intro_html),
            hero_image = VALUES(hero_image),
            cta_label = VALUES(cta_label),
            cta_url = VALUES(cta_url),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(SINGLETON_ID)
    .bind(&home.headline)
    .bind(&home.tagline)
    .bind(&home.intro)
    .bind(&home.intro_html)
    .bind(&home.hero_image)
    .bind(&home.cta_label)
    .bind(&home.cta_url)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to save home content")?;

    get_home_mysql(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Home content missing after save"))
}

async fn get_about_mysql(pool: &MySqlPool) -> Result<Option<AboutContent>> {
    let row = sqlx::query(&format!("SELECT {} FROM about_content WHERE id = ?", ABOUT_COLUMNS))
        .bind(SINGLETON_ID)
        .fetch_optional(pool)
        .await
        .context("Failed to get about content")?;
    row.map(|r| row_to_about_mysql(&r)).transpose()
}

async fn save_about_mysql(pool: &MySqlPool, about: &AboutContent) -> Result<AboutContent> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO about_content (id, title, body, body_html, portrait_image, resume_url, skills, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            title = VALUES(title),
            body = VALUES(body),
            body_html = VALUES(body_html),
            portrait_image = VALUES(portrait_image),
            resume_url = VALUES(resume_url),
            skills = VALUES(skills),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(SINGLETON_ID)
    .bind(&about.title)
    .bind(&about.body)
    .bind(&about.body_html)
    .bind(&about.portrait_image)
    .bind(&about.resume_url)
    .bind(encode_skills(&about.skills)?)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to save about content")?;

    get_about_mysql(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("About content missing after save"))
}

fn row_to_home_mysql(row: &sqlx::mysql::MySqlRow) -> Result<HomeContent> {
    Ok(HomeContent {
        headline: row.get("headline"),
        tagline: row.get("tagline"),
        intro: row.get("intro"),
        intro_html: row.get("intro_html"),
        hero_image: row.get("hero_image"),
        cta_label: row.get("cta_label"),
        cta_url: row.get("cta_url"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_about_mysql(row: &sqlx::mysql::MySqlRow) -> Result<AboutContent> {
    let skills: String = row.get("skills");
    Ok(AboutContent {
        title: row.get("title"),
        body: row.get("body"),
        body_html: row.get("body_html"),
        portrait_image: row.get("portrait_image"),
        resume_url: row.get("resume_url"),
        skills: decode_skills(&skills),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxContentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxContentRepository::new(pool)
    }

    #[tokio::test]
    async fn test_empty_tables_return_none() {
        let repo = setup_test_repo().await;
        assert!(repo.get_home().await.unwrap().is_none());
        assert!(repo.get_about().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_home_round_trip_and_overwrite() {
        let repo = setup_test_repo().await;

        let mut home = HomeContent {
            headline: "Builder of things".to_string(),
            tagline: "Rust, web, storage".to_string(),
            intro: "I *build*".to_string(),
            intro_html: "<p>I <em>build</em></p>\n".to_string(),
            hero_image: Some("https://cdn.example.com/images/a.png".to_string()),
            cta_label: Some("Contact".to_string()),
            cta_url: Some("mailto:me@example.com".to_string()),
            ..HomeContent::default()
        };
        let saved = repo.save_home(&home).await.expect("Failed to save home");
        assert_eq!(saved.headline, home.headline);
        assert_eq!(saved.hero_image, home.hero_image);

        home.headline = "Second headline".to_string();
        home.hero_image = None;
        repo.save_home(&home).await.expect("Failed to overwrite home");

        let loaded = repo.get_home().await.unwrap().expect("home row");
        assert_eq!(loaded.headline, "Second headline");
        assert!(loaded.hero_image.is_none());
        assert_eq!(loaded.cta_label.as_deref(), Some("Contact"));
    }

    #[tokio::test]
    async fn test_about_round_trip_preserves_skills() {
        let repo = setup_test_repo().await;

        let about = AboutContent {
            title: "About".to_string(),
            body: "Hi".to_string(),
            body_html: "<p>Hi</p>\n".to_string(),
            skills: vec!["Rust".to_string(), "SQL".to_string(), "C++".to_string()],
            ..AboutContent::default()
        };
        repo.save_about(&about).await.expect("Failed to save about");

        let loaded = repo.get_about().await.unwrap().expect("about row");
        assert_eq!(loaded.title, "About");
        assert_eq!(loaded.skills, about.skills);
        assert_eq!(loaded.body_html, about.body_html);
    }

    #[test]
    fn test_decode_skills_tolerates_garbage() {
        assert!(decode_skills("not json").is_empty());
        assert_eq!(decode_skills(r#"["a"]"#), vec!["a".to_string()]);
    }
}
