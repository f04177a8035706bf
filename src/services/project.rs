//! Project service

use crate::cache::Cache;
use crate::db::repositories::ProjectRepository;
use crate::models::{CreateProjectInput, Project, PublishStatus, UpdateProjectInput};
use crate::services::content::{clean_list, clean_optional, require_title, ContentServiceError};
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::generate_slug;
use std::sync::Arc;

const CACHE_PREFIX: &str = "projects:";
const CACHE_KEY_PUBLISHED: &str = "projects:published";
const CACHE_KEY_BY_SLUG: &str = "projects:slug:";

pub struct ProjectService {
    repo: Arc<dyn ProjectRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl ProjectService {
    pub fn new(repo: Arc<dyn ProjectRepository>, cache: Arc<Cache>, markdown: MarkdownRenderer) -> Self {
        Self {
            repo,
            cache,
            markdown,
        }
    }

    pub async fn create(&self, input: CreateProjectInput) -> Result<Project, ContentServiceError> {
        let title = require_title("Title", &input.title)?;
        let slug = resolve_slug(input.slug.as_deref(), &title)?;

        if self.repo.exists_by_slug(&slug).await? {
            return Err(ContentServiceError::DuplicateSlug(slug));
        }

        let mut project = Project::new(slug, title);
        project.summary = input.summary.trim().to_string();
        project.description_html = self.markdown.render(&input.description);
        project.description = input.description;
        project.image_url = clean_optional(input.image_url);
        project.repo_url = clean_optional(input.repo_url);
        project.live_url = clean_optional(input.live_url);
        project.tech_stack = clean_list(input.tech_stack);
        project.featured = input.featured;
        project.sort_order = input.sort_order;
        project.status = input.status.unwrap_or_default();

        let created = self.repo.create(&project).await?;
        self.invalidate().await;
        tracing::info!("Created project {} ({})", created.id, created.slug);
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Project, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::NotFound(format!("Project {}", id)))
    }

    /// Published project by slug; drafts are reported as not found
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Project, ContentServiceError> {
        let key = format!("{}{}", CACHE_KEY_BY_SLUG, slug);
        if let Ok(Some(cached)) = self.cache.get::<Project>(&key).await {
            return Ok(cached);
        }

        let project = self
            .repo
            .get_by_slug(slug)
            .await?
            .filter(|p| p.status == PublishStatus::Published)
            .ok_or_else(|| ContentServiceError::NotFound(format!("Project '{}'", slug)))?;

        if let Err(e) = self.cache.set(&key, &project).await {
            tracing::warn!("Failed to cache project {}: {}", slug, e);
        }
        Ok(project)
    }

    /// Every project, for the admin API
    pub async fn list(&self) -> Result<Vec<Project>, ContentServiceError> {
        Ok(self.repo.list().await?)
    }

    /// Featured first, then `sort_order`, then newest
    pub async fn list_published(&self) -> Result<Vec<Project>, ContentServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<Project>>(CACHE_KEY_PUBLISHED).await {
            return Ok(cached);
        }

        let projects = self.repo.list_published().await?;
        if let Err(e) = self.cache.set(CACHE_KEY_PUBLISHED, &projects).await {
            tracing::warn!("Failed to cache project list: {}", e);
        }
        Ok(projects)
    }

    pub async fn update(&self, id: i64, input: UpdateProjectInput) -> Result<Project, ContentServiceError> {
        let mut project = self.get_by_id(id).await?;

        if let Some(title) = input.title {
            project.title = require_title("Title", &title)?;
        }

        if let Some(slug) = input.slug {
            let slug = resolve_slug(Some(&slug), &project.title)?;
            if slug != project.slug && self.repo.exists_by_slug(&slug).await? {
                return Err(ContentServiceError::DuplicateSlug(slug));
            }
            project.slug = slug;
        }

        if let Some(summary) = input.summary {
            project.summary = summary.trim().to_string();
        }
        if let Some(description) = input.description {
            project.description_html = self.markdown.render(&description);
            project.description = description;
        }
        if input.image_url.is_some() {
            project.image_url = clean_optional(input.image_url);
        }
        if input.repo_url.is_some() {
            project.repo_url = clean_optional(input.repo_url);
        }
        if input.live_url.is_some() {
            project.live_url = clean_optional(input.live_url);
        }
        if let Some(stack) = input.tech_stack {
            project.tech_stack = clean_list(stack);
        }
        if let Some(featured) = input.featured {
            project.featured = featured;
        }
        if let Some(sort_order) = input.sort_order {
            project.sort_order = sort_order;
        }
        if let Some(status) = input.status {
            project.status = status;
        }

        let updated = self.repo.update(&project).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        let project = self.get_by_id(id).await?;
        self.repo.delete(project.id).await?;
        self.invalidate().await;
        tracing::info!("Deleted project {} ({})", project.id, project.slug);
        Ok(())
    }

    async fn invalidate(&self) {
        self.cache.delete_prefix(CACHE_PREFIX).await;
    }
}

/// Normalize an explicit slug, or derive one from the title when blank
pub(crate) fn resolve_slug(explicit: Option<&str>, title: &str) -> Result<String, ContentServiceError> {
    let source = match explicit.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => title,
    };

    let slug = generate_slug(source);
    if slug.is_empty() {
        return Err(ContentServiceError::ValidationError(
            "Slug must contain at least one ASCII letter or digit".to_string(),
        ));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxProjectRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> ProjectService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        ProjectService::new(
            SqlxProjectRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
            MarkdownRenderer::new(),
        )
    }

    fn input(title: &str) -> CreateProjectInput {
        CreateProjectInput {
            title: title.to_string(),
            description: "Built with `axum`.".to_string(),
            tech_stack: vec!["Rust".into(), " axum ".into(), "rust".into()],
            status: Some(PublishStatus::Published),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_generates_slug_and_html() {
        let service = setup_test_service().await;
        let project = service.create(input("My Cool Project!")).await.unwrap();

        assert_eq!(project.slug, "my-cool-project");
        assert!(project.description_html.contains("<code>axum</code>"));
        assert_eq!(project.tech_stack, vec!["Rust".to_string(), "axum".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let service = setup_test_service().await;
        service.create(input("Same Name")).await.unwrap();
        let result = service.create(input("Same name")).await;
        assert!(matches!(result, Err(ContentServiceError::DuplicateSlug(s)) if s == "same-name"));
    }

    #[tokio::test]
    async fn test_create_validates_title_and_slug() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.create(input("  ")).await,
            Err(ContentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input("日本語")).await,
            Err(ContentServiceError::ValidationError(_))
        ));

        let mut explicit = input("日本語");
        explicit.slug = Some("Japanese Notes".into());
        assert_eq!(service.create(explicit).await.unwrap().slug, "japanese-notes");
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public_reads() {
        let service = setup_test_service().await;
        let mut draft = input("Secret");
        draft.status = None;
        let created = service.create(draft).await.unwrap();

        assert!(service.list_published().await.unwrap().is_empty());
        assert!(matches!(
            service.get_published_by_slug(&created.slug).await,
            Err(ContentServiceError::NotFound(_))
        ));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_invalidates_public_cache() {
        let service = setup_test_service().await;
        let created = service.create(input("Cached")).await.unwrap();

        assert_eq!(service.get_published_by_slug("cached").await.unwrap().title, "Cached");
        assert_eq!(service.list_published().await.unwrap().len(), 1);

        service
            .update(
                created.id,
                UpdateProjectInput {
                    title: Some("Renamed".into()),
                    live_url: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(service.get_published_by_slug("cached").await.unwrap().title, "Renamed");

        service
            .update(
                created.id,
                UpdateProjectInput {
                    status: Some(PublishStatus::Draft),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(service.list_published().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_slug_conflict() {
        let service = setup_test_service().await;
        service.create(input("First")).await.unwrap();
        let second = service.create(input("Second")).await.unwrap();

        let result = service
            .update(
                second.id,
                UpdateProjectInput {
                    slug: Some("first".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ContentServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_project() {
        let service = setup_test_service().await;
        assert!(matches!(service.delete(404).await, Err(ContentServiceError::NotFound(_))));

        let created = service.create(input("Gone")).await.unwrap();
        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.get_by_id(created.id).await,
            Err(ContentServiceError::NotFound(_))
        ));
    }
}
