//! Certification service

use crate::cache::Cache;
use crate::db::repositories::CertificationRepository;
use crate::models::{Certification, CreateCertificationInput, UpdateCertificationInput};
use crate::services::content::{clean_optional, require_title, ContentServiceError};
use chrono::NaiveDate;
use std::sync::Arc;

const CACHE_KEY_LIST: &str = "certifications:list";

pub struct CertificationService {
    repo: Arc<dyn CertificationRepository>,
    cache: Arc<Cache>,
}

fn check_dates(issued_on: NaiveDate, expires_on: Option<NaiveDate>) -> Result<(), ContentServiceError> {
    match expires_on {
        Some(expires) if expires < issued_on => Err(ContentServiceError::ValidationError(
            "Expiry date cannot be before the issue date".to_string(),
        )),
        _ => Ok(()),
    }
}

impl CertificationService {
    pub fn new(repo: Arc<dyn CertificationRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: CreateCertificationInput) -> Result<Certification, ContentServiceError> {
        let name = require_title("Name", &input.name)?;
        let issuer = require_title("Issuer", &input.issuer)?;
        check_dates(input.issued_on, input.expires_on)?;

        let mut cert = Certification::new(name, issuer, input.issued_on);
        cert.expires_on = input.expires_on;
        cert.credential_id = clean_optional(input.credential_id);
        cert.credential_url = clean_optional(input.credential_url);
        cert.image_url = clean_optional(input.image_url);
        cert.sort_order = input.sort_order;

        let created = self.repo.create(&cert).await?;
        self.cache.delete(CACHE_KEY_LIST).await;
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Certification, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::NotFound(format!("Certification {}", id)))
    }

    /// By `sort_order`, then most recently issued
    pub async fn list(&self) -> Result<Vec<Certification>, ContentServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<Certification>>(CACHE_KEY_LIST).await {
            return Ok(cached);
        }

        let certs = self.repo.list().await?;
        if let Err(e) = self.cache.set(CACHE_KEY_LIST, &certs).await {
            tracing::warn!("Failed to cache certifications: {}", e);
        }
        Ok(certs)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateCertificationInput,
    ) -> Result<Certification, ContentServiceError> {
        let mut cert = self.get_by_id(id).await?;

        if let Some(name) = input.name {
            cert.name = require_title("Name", &name)?;
        }
        if let Some(issuer) = input.issuer {
            cert.issuer = require_title("Issuer", &issuer)?;
        }
        if let Some(issued_on) = input.issued_on {
            cert.issued_on = issued_on;
        }
        if let Some(expires_on) = input.expires_on {
            cert.expires_on = expires_on;
        }
        check_dates(cert.issued_on, cert.expires_on)?;

        if input.credential_id.is_some() {
            cert.credential_id = clean_optional(input.credential_id);
        }
        if input.credential_url.is_some() {
            cert.credential_url = clean_optional(input.credential_url);
        }
        if input.image_url.is_some() {
            cert.image_url = clean_optional(input.image_url);
        }
        if let Some(sort_order) = input.sort_order {
            cert.sort_order = sort_order;
        }

        let updated = self.repo.update(&cert).await?;
        self.cache.delete(CACHE_KEY_LIST).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        let cert = self.get_by_id(id).await?;
        self.repo.delete(cert.id).await?;
        self.cache.delete(CACHE_KEY_LIST).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxCertificationRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CertificationService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        CertificationService::new(
            SqlxCertificationRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(name: &str, issued_on: NaiveDate) -> CreateCertificationInput {
        CreateCertificationInput {
            name: name.to_string(),
            issuer: "Linux Foundation".to_string(),
            issued_on,
            expires_on: None,
            credential_id: Some(" LF-1 ".to_string()),
            credential_url: Some(String::new()),
            image_url: None,
            sort_order: 0,
        }
    }

    #[tokio::test]
    async fn test_create_cleans_optional_fields() {
        let service = setup_test_service().await;
        let cert = service.create(input("CKA", date(2023, 6, 1))).await.unwrap();
        assert_eq!(cert.credential_id.as_deref(), Some("LF-1"));
        assert!(cert.credential_url.is_none());
    }

    #[tokio::test]
    async fn test_expiry_before_issue_rejected() {
        let service = setup_test_service().await;
        let mut bad = input("CKA", date(2023, 6, 1));
        bad.expires_on = Some(date(2023, 5, 31));
        assert!(matches!(
            service.create(bad).await,
            Err(ContentServiceError::ValidationError(_))
        ));

        let cert = service.create(input("CKAD", date(2023, 6, 1))).await.unwrap();
        let result = service
            .update(
                cert.id,
                UpdateCertificationInput {
                    issued_on: Some(date(2030, 1, 1)),
                    expires_on: Some(Some(date(2029, 1, 1))),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ContentServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_list_is_refreshed_after_writes() {
        let service = setup_test_service().await;
        service.create(input("Old", date(2020, 1, 1))).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        let newer = service.create(input("New", date(2024, 1, 1))).await.unwrap();
        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["New", "Old"]);

        service.delete(newer.id).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_can_clear_expiry() {
        let service = setup_test_service().await;
        let mut with_expiry = input("Sec+", date(2021, 1, 1));
        with_expiry.expires_on = Some(date(2024, 1, 1));
        let cert = service.create(with_expiry).await.unwrap();

        let updated = service
            .update(
                cert.id,
                UpdateCertificationInput {
                    expires_on: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.expires_on.is_none());
    }
}
