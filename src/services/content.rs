//! Home and about content service
//!
//! Both pages are single admin-editable rows. Reads fall back to defaults
//! until the first save, so a fresh install still renders.

use crate::cache::Cache;
use crate::db::repositories::ContentRepository;
use crate::models::{AboutContent, HomeContent, UpdateAboutInput, UpdateHomeInput};
use crate::services::markdown::MarkdownRenderer;
use chrono::Utc;
use std::sync::Arc;

const CACHE_KEY_HOME: &str = "content:home";
const CACHE_KEY_ABOUT: &str = "content:about";

const MAX_TITLE_LEN: usize = 255;
const MAX_SKILLS: usize = 100;

/// Errors shared by the content services
#[derive(Debug, thiserror::Error)]
pub enum ContentServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Trim an optional field, mapping blank to `None`
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Require a non-blank title no longer than the column allows
pub(crate) fn require_title(field: &str, value: &str) -> Result<String, ContentServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContentServiceError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ContentServiceError::ValidationError(format!(
            "{} must be at most {} characters",
            field, MAX_TITLE_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim entries, drop blanks and duplicates, keep first-seen order
pub(crate) fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

pub struct ContentService {
    repo: Arc<dyn ContentRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl ContentService {
    pub fn new(repo: Arc<dyn ContentRepository>, cache: Arc<Cache>, markdown: MarkdownRenderer) -> Self {
        Self {
            repo,
            cache,
            markdown,
        }
    }

    pub async fn home(&self) -> Result<HomeContent, ContentServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<HomeContent>(CACHE_KEY_HOME).await {
            return Ok(cached);
        }

        let home = self.repo.get_home().await?.unwrap_or_default();
        if let Err(e) = self.cache.set(CACHE_KEY_HOME, &home).await {
            tracing::warn!("Failed to cache home content: {}", e);
        }
        Ok(home)
    }

    pub async fn update_home(&self, input: UpdateHomeInput) -> Result<HomeContent, ContentServiceError> {
        let headline = require_title("Headline", &input.headline)?;
        let intro_html = self.markdown.render(&input.intro);

        let home = HomeContent {
            headline,
            tagline: input.tagline.trim().to_string(),
            intro: input.intro,
            intro_html,
            hero_image: clean_optional(input.hero_image),
            cta_label: clean_optional(input.cta_label),
            cta_url: clean_optional(input.cta_url),
            updated_at: Utc::now(),
        };

        let saved = self.repo.save_home(&home).await?;
        self.cache.delete(CACHE_KEY_HOME).await;
        tracing::info!("Home content updated");
        Ok(saved)
    }

    pub async fn about(&self) -> Result<AboutContent, ContentServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<AboutContent>(CACHE_KEY_ABOUT).await {
            return Ok(cached);
        }

        let about = self.repo.get_about().await?.unwrap_or_default();
        if let Err(e) = self.cache.set(CACHE_KEY_ABOUT, &about).await {
            tracing::warn!("Failed to cache about content: {}", e);
        }
        Ok(about)
    }

    pub async fn update_about(&self, input: UpdateAboutInput) -> Result<AboutContent, ContentServiceError> {
        let title = require_title("Title", &input.title)?;
        let skills = clean_list(input.skills);
        if skills.len() > MAX_SKILLS {
            return Err(ContentServiceError::ValidationError(format!(
                "At most {} skills are allowed",
                MAX_SKILLS
            )));
        }

        let about = AboutContent {
            title,
            body_html: self.markdown.render(&input.body),
            body: input.body,
            portrait_image: clean_optional(input.portrait_image),
            resume_url: clean_optional(input.resume_url),
            skills,
            updated_at: Utc::now(),
        };

        let saved = self.repo.save_about(&about).await?;
        self.cache.delete(CACHE_KEY_ABOUT).await;
        tracing::info!("About content updated");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxContentRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> ContentService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        ContentService::new(
            SqlxContentRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
            MarkdownRenderer::new(),
        )
    }

    fn home_input(headline: &str) -> UpdateHomeInput {
        UpdateHomeInput {
            headline: headline.to_string(),
            tagline: "  Systems & web  ".to_string(),
            intro: "I write **Rust**.".to_string(),
            hero_image: Some("   ".to_string()),
            cta_label: Some("Say hi".to_string()),
            cta_url: Some("mailto:me@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_defaults_before_first_save() {
        let service = setup_test_service().await;
        let home = service.home().await.unwrap();
        assert_eq!(home.headline, HomeContent::default().headline);
        let about = service.about().await.unwrap();
        assert_eq!(about.title, "About me");
        assert!(about.skills.is_empty());
    }

    #[tokio::test]
    async fn test_update_home_round_trip() {
        let service = setup_test_service().await;

        let saved = service.update_home(home_input("  Hi, I'm Sam  ")).await.unwrap();
        assert_eq!(saved.headline, "Hi, I'm Sam");
        assert_eq!(saved.tagline, "Systems & web");
        assert!(saved.intro_html.contains("<strong>Rust</strong>"));
        assert!(saved.hero_image.is_none());

        let loaded = service.home().await.unwrap();
        assert_eq!(loaded.headline, saved.headline);
        assert_eq!(loaded.cta_label.as_deref(), Some("Say hi"));
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_default() {
        let service = setup_test_service().await;
        let before = service.home().await.unwrap();
        assert_ne!(before.headline, "Fresh");

        service.update_home(home_input("Fresh")).await.unwrap();
        assert_eq!(service.home().await.unwrap().headline, "Fresh");
    }

    #[tokio::test]
    async fn test_empty_headline_rejected() {
        let service = setup_test_service().await;
        let result = service.update_home(home_input("   ")).await;
        assert!(matches!(result, Err(ContentServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_about_cleans_skills() {
        let service = setup_test_service().await;
        let saved = service
            .update_about(UpdateAboutInput {
                title: "About".to_string(),
                body: "Hello *there*".to_string(),
                portrait_image: None,
                resume_url: Some("https://cdn.example.com/cv.pdf".to_string()),
                skills: vec![" Rust ".into(), "rust".into(), "".into(), "Go".into()],
            })
            .await
            .unwrap();

        assert_eq!(saved.skills, vec!["Rust".to_string(), "Go".to_string()]);
        assert!(saved.body_html.contains("<em>there</em>"));
        assert_eq!(service.about().await.unwrap().skills, saved.skills);
    }

    #[tokio::test]
    async fn test_empty_about_title_rejected() {
        let service = setup_test_service().await;
        let result = service
            .update_about(UpdateAboutInput {
                title: String::new(),
                body: String::new(),
                portrait_image: None,
                resume_url: None,
                skills: vec![],
            })
            .await;
        assert!(matches!(result, Err(ContentServiceError::ValidationError(_))));
    }

    #[test]
    fn test_require_title_length() {
        assert!(require_title("Title", &"x".repeat(255)).is_ok());
        assert!(require_title("Title", &"x".repeat(256)).is_err());
    }
}
