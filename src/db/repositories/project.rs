//! Project repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Project;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> Result<Project>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Project>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Project>>;
    /// Every project, drafts included
    async fn list(&self) -> Result<Vec<Project>>;
    /// Published projects: featured first, then `sort_order`, then newest
    async fn list_published(&self) -> Result<Vec<Project>>;
    async fn update(&self, project: &Project) -> Result<Project>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

pub struct SqlxProjectRepository {
    pool: DynDatabasePool,
}

impl SqlxProjectRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProjectRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProjectRepository for SqlxProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), project).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), project).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Project>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await,
            DatabaseDriver::Mysql => get_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Project>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_published(&self) -> Result<Vec<Project>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_published_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_published_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update(&self, project: &Project) -> Result<Project> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), project).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), project).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await,
            DatabaseDriver::Mysql => exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await,
        }
    }
}

const SELECT_PROJECT: &str = "SELECT id, slug, title, summary, description, description_html, image_url, repo_url, live_url, tech_stack, featured, sort_order, status, created_at, updated_at FROM projects";
const PUBLISHED_ORDER: &str = "ORDER BY featured DESC, sort_order ASC, created_at DESC, id DESC";

fn encode_stack(stack: &[String]) -> Result<String> {
    serde_json::to_string(stack).context("Failed to encode tech stack")
}

fn decode_stack(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, project: &Project) -> Result<Project> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO projects (slug, title, summary, description, description_html, image_url, repo_url, live_url, tech_stack, featured, sort_order, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&project.slug)
    .bind(&project.title)
    .bind(&project.summary)
    .bind(&project.description)
    .bind(&project.description_html)
    .bind(&project.image_url)
    .bind(&project.repo_url)
    .bind(&project.live_url)
    .bind(encode_stack(&project.tech_stack)?)
    .bind(project.featured)
    .bind(project.sort_order)
    .bind(project.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create project")?;

    Ok(Project {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..project.clone()
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PROJECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get project")?;
    row.map(|r| row_to_project_sqlite(&r)).transpose()
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_PROJECT))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get project")?;
    row.map(|r| row_to_project_sqlite(&r)).transpose()
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!("{} ORDER BY sort_order ASC, created_at DESC, id DESC", SELECT_PROJECT))
        .fetch_all(pool)
        .await
        .context("Failed to list projects")?;
    rows.iter().map(row_to_project_sqlite).collect()
}

async fn list_published_sqlite(pool: &SqlitePool) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!("{} WHERE status = 'published' {}", SELECT_PROJECT, PUBLISHED_ORDER))
        .fetch_all(pool)
        .await
        .context("Failed to list published projects")?;
    rows.iter().map(row_to_project_sqlite).collect()
}

async fn update_sqlite(pool: &SqlitePool, project: &Project) -> Result<Project> {
    let now = Utc::now();
    sqlx::query("UPDATE projects SET slug = ?, title = ?, summary = ?, description = ?, description_html = ?, image_url = ?, repo_url = ?, live_url = ?, tech_stack = ?, featured = ?, sort_order = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(&project.slug)
        .bind(&project.title)
        .bind(&project.summary)
        .bind(&project.description)
        .bind(&project.description_html)
        .bind(&project.image_url)
        .bind(&project.repo_url)
        .bind(&project.live_url)
        .bind(encode_stack(&project.tech_stack)?)
        .bind(project.featured)
        .bind(project.sort_order)
        .bind(project.status.as_str())
        .bind(now)
        .bind(project.id)
        .execute(pool)
        .await
        .context("Failed to update project")?;
    get_by_id_sqlite(pool, project.id).await?.ok_or_else(|| anyhow::anyhow!("Project not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM projects WHERE id = ?").bind(id).execute(pool).await.context("Failed to delete project")?;
    Ok(())
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM projects WHERE slug = ?").bind(slug).fetch_one(pool).await?;
    Ok(row.get::<i64, _>("count") > 0)
}

fn row_to_project_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Project> {
    let status_str: String = row.get("status");
    let stack: String = row.get("tech_stack");
    Ok(Project {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        summary: row.get("summary"),
        description: row.get("description"),
        description_html: row.get("description_html"),
        image_url: row.get("image_url"),
        repo_url: row.get("repo_url"),
        live_url: row.get("live_url"),
        tech_stack: decode_stack(&stack),
        featured: row.get("featured"),
        sort_order: row.get("sort_order"),
        status: status_str.parse().unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, project: &Project) -> Result<Project> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO projects (slug, title, summary, description, description_html, image_url, repo_url, live_url, tech_stack, featured, sort_order, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&project.slug)
    .bind(&project.title)
    .bind(&project.summary)
    .bind(&project.description)
    .bind(&project.description_html)
    .bind(&project.image_url)
    .bind(&project.repo_url)
    .bind(&project.live_url)
    .bind(encode_stack(&project.tech_stack)?)
    .bind(project.featured)
    .bind(project.sort_order)
    .bind(project.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create project")?;

    Ok(Project {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..project.clone()
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PROJECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get project")?;
    row.map(|r| row_to_project_mysql(&r)).transpose()
}

async fn get_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_PROJECT))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get project")?;
    row.map(|r| row_to_project_mysql(&r)).transpose()
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!("{} ORDER BY sort_order ASC, created_at DESC, id DESC", SELECT_PROJECT))
        .fetch_all(pool)
        .await
        .context("Failed to list projects")?;
    rows.iter().map(row_to_project_mysql).collect()
}

async fn list_published_mysql(pool: &MySqlPool) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!("{} WHERE status = 'published' {}", SELECT_PROJECT, PUBLISHED_ORDER))
        .fetch_all(pool)
        .await
        .context("Failed to list published projects")?;
    rows.iter().map(row_to_project_mysql).collect()
}

async fn update_mysql(pool: &MySqlPool, project: &Project) -> Result<Project> {
    let now = Utc::now();
    sqlx::query("UPDATE projects SET slug = ?, title = ?, summary = ?, description = ?, description_html = ?, image_url = ?, repo_url = ?, live_url = ?, tech_stack = ?, featured = ?, sort_order = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(&project.slug)
        .bind(&project.title)
        .bind(&project.summary)
        .bind(&project.description)
        .bind(&project.description_html)
        .bind(&project.image_url)
        .bind(&project.repo_url)
        .bind(&project.live_url)
        .bind(encode_stack(&project.tech_stack)?)
        .bind(project.featured)
        .bind(project.sort_order)
        .bind(project.status.as_str())
        .bind(now)
        .bind(project.id)
        .execute(pool)
        .await
        .context("Failed to update project")?;
    get_by_id_mysql(pool, project.id).await?.ok_or_else(|| anyhow::anyhow!("Project not found after update"))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM projects WHERE id = ?").bind(id).execute(pool).await.context("Failed to delete project")?;
    Ok(())
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM projects WHERE slug = ?").bind(slug).fetch_one(pool).await?;
    Ok(row.get::<i64, _>("count") > 0)
}

fn row_to_project_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Project> {
    let status_str: String = row.get("status");
    let stack: String = row.get("tech_stack");
    Ok(Project {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        summary: row.get("summary"),
        description: row.get("description"),
        description_html: row.get("description_html"),
        image_url: row.get("image_url"),
        repo_url: row.get("repo_url"),
        live_url: row.get("live_url"),
        tech_stack: decode_stack(&stack),
        featured: row.get("featured"),
        sort_order: row.get("sort_order"),
        status: status_str.parse().unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::PublishStatus;

    async fn setup_test_repo() -> SqlxProjectRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxProjectRepository::new(pool)
    }

    fn project(slug: &str, status: PublishStatus, featured: bool, sort_order: i32) -> Project {
        let mut p = Project::new(slug.to_string(), slug.to_uppercase());
        p.status = status;
        p.featured = featured;
        p.sort_order = sort_order;
        p.tech_stack = vec!["Rust".to_string(), "SQLite".to_string()];
        p
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&project("demo", PublishStatus::Draft, false, 0))
            .await
            .expect("Failed to create project");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("by id");
        assert_eq!(by_id.slug, "demo");
        assert_eq!(by_id.tech_stack, vec!["Rust".to_string(), "SQLite".to_string()]);

        let by_slug = repo.get_by_slug("demo").await.unwrap().expect("by slug");
        assert_eq!(by_slug.id, created.id);
        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&project("same", PublishStatus::Draft, false, 0)).await.unwrap();
        assert!(repo.create(&project("same", PublishStatus::Draft, false, 0)).await.is_err());
        assert!(repo.exists_by_slug("same").await.unwrap());
        assert!(!repo.exists_by_slug("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_published_ordering() {
        let repo = setup_test_repo().await;
        repo.create(&project("draft", PublishStatus::Draft, true, 0)).await.unwrap();
        repo.create(&project("plain-b", PublishStatus::Published, false, 2)).await.unwrap();
        repo.create(&project("plain-a", PublishStatus::Published, false, 1)).await.unwrap();
        repo.create(&project("star", PublishStatus::Published, true, 9)).await.unwrap();

        let slugs: Vec<String> = repo
            .list_published()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["star", "plain-a", "plain-b"]);

        assert_eq!(repo.list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut created = repo.create(&project("edit-me", PublishStatus::Draft, false, 0)).await.unwrap();

        created.title = "Edited".to_string();
        created.status = PublishStatus::Published;
        created.live_url = Some("https://demo.example.com".to_string());
        let updated = repo.update(&created).await.expect("Failed to update");
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.status, PublishStatus::Published);
        assert_eq!(updated.live_url.as_deref(), Some("https://demo.example.com"));

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
