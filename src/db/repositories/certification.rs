//! Certification repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Certification;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CertificationRepository: Send + Sync {
    async fn create(&self, cert: &Certification) -> Result<Certification>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Certification>>;
    /// Ordered by `sort_order`, then most recently issued
    async fn list(&self) -> Result<Vec<Certification>>;
    async fn update(&self, cert: &Certification) -> Result<Certification>;
    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxCertificationRepository {
    pool: DynDatabasePool,
}

impl SqlxCertificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CertificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CertificationRepository for SqlxCertificationRepository {
    async fn create(&self, cert: &Certification) -> Result<Certification> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), cert).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), cert).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Certification>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Certification>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update(&self, cert: &Certification) -> Result<Certification> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), cert).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), cert).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const SELECT_CERT: &str = "SELECT id, name, issuer, issued_on, expires_on, credential_id, credential_url, image_url, sort_order, created_at, updated_at FROM certifications";
const LIST_ORDER: &str = "ORDER BY sort_order ASC, issued_on DESC, id DESC";

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, cert: &Certification) -> Result<Certification> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO certifications (name, issuer, issued_on, expires_on, credential_id, credential_url, image_url, sort_order, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&cert.name)
    .bind(&cert.issuer)
    .bind(cert.issued_on)
    .bind(cert.expires_on)
    .bind(&cert.credential_id)
    .bind(&cert.credential_url)
    .bind(&cert.image_url)
    .bind(cert.sort_order)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create certification")?;

    Ok(Certification {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..cert.clone()
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Certification>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_CERT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get certification")?;
    row.map(|r| row_to_cert_sqlite(&r)).transpose()
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Certification>> {
    let rows = sqlx::query(&format!("{} {}", SELECT_CERT, LIST_ORDER))
        .fetch_all(pool)
        .await
        .context("Failed to list certifications")?;
    rows.iter().map(row_to_cert_sqlite).collect()
}

async fn update_sqlite(pool: &SqlitePool, cert: &Certification) -> Result<Certification> {
    let now = Utc::now();
    sqlx::query("UPDATE certifications SET name = ?, issuer = ?, issued_on = ?, expires_on = ?, credential_id = ?, credential_url = ?, image_url = ?, sort_order = ?, updated_at = ? WHERE id = ?")
        .bind(&cert.name)
        .bind(&cert.issuer)
        .bind(cert.issued_on)
        .bind(cert.expires_on)
        .bind(&cert.credential_id)
        .bind(&cert.credential_url)
        .bind(&cert.image_url)
        .bind(cert.sort_order)
        .bind(now)
        .bind(cert.id)
        .execute(pool)
        .await
        .context("Failed to update certification")?;
    get_by_id_sqlite(pool, cert.id).await?.ok_or_else(|| anyhow::anyhow!("Certification not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM certifications WHERE id = ?").bind(id).execute(pool).await.context("Failed to delete certification")?;
    Ok(())
}

fn row_to_cert_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Certification> {
    Ok(Certification {
        id: row.get("id"),
        name: row.get("name"),
        issuer: row.get("issuer"),
        issued_on: row.get("issued_on"),
        expires_on: row.get("expires_on"),
        credential_id: row.get("credential_id"),
        credential_url: row.get("credential_url"),
        image_url: row.get("image_url"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, cert: &Certification) -> Result<Certification> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO certifications (name, issuer, issued_on, expires_on, credential_id, credential_url, image_url, sort_order, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&cert.name)
    .bind(&cert.issuer)
    .bind(cert.issued_on)
    .bind(cert.expires_on)
    .bind(&cert.credential_id)
    .bind(&cert.credential_url)
    .bind(&cert.image_url)
    .bind(cert.sort_order)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create certification")?;

    Ok(Certification {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..cert.clone()
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Certification>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_CERT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get certification")?;
    row.map(|r| row_to_cert_mysql(&r)).transpose()
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Certification>> {
    let rows = sqlx::query(&format!("{} {}", SELECT_CERT, LIST_ORDER))
        .fetch_all(pool)
        .await
        .context("Failed to list certifications")?;
    rows.iter().map(row_to_cert_mysql).collect()
}

async fn update_mysql(pool: &MySqlPool, cert: &Certification) -> Result<Certification> {
    let now = Utc::now();
    sqlx::query("UPDATE certifications SET name = ?, issuer = ?, issued_on = ?, expires_on = ?, credential_id = ?, credential_url = ?, image_url = ?, sort_order = ?, updated_at = ? WHERE id = ?")
        .bind(&cert.name)
        .bind(&cert.issuer)
        .bind(cert.issued_on)
        .bind(cert.expires_on)
        .bind(&cert.credential_id)
        .bind(&cert.credential_url)
        .bind(&cert.image_url)
        .bind(cert.sort_order)
        .bind(now)
        .bind(cert.id)
        .execute(pool)
        .await
        .context("Failed to update certification")?;
    get_by_id_mysql(pool, cert.id).await?.ok_or_else(|| anyhow::anyhow!("Certification not found after update"))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM certifications WHERE id = ?").bind(id).execute(pool).await.context("Failed to delete certification")?;
    Ok(())
}

fn row_to_cert_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Certification> {
    Ok(Certification {
        id: row.get("id"),
        name: row.get("name"),
        issuer: row.get("issuer"),
        issued_on: row.get("issued_on"),
        expires_on: row.get("expires_on"),
        credential_id: row.get("credential_id"),
        credential_url: row.get("credential_url"),
        image_url: row.get("image_url"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
