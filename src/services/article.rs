//! Article service
//!
//! Implements business logic for articles:
//! - Markdown rendering and excerpt derivation
//! - Stamping `published_at` the first time an article goes live
//! - Cached public listing with pagination

use crate::cache::Cache;
use crate::db::repositories::ArticleRepository;
use crate::models::{
    Article, CreateArticleInput, ListParams, PagedResult, PublishStatus, UpdateArticleInput,
};
use crate::services::content::{clean_optional, require_title, ContentServiceError};
use crate::services::markdown::MarkdownRenderer;
use crate::services::project::resolve_slug;
use chrono::Utc;
use std::sync::Arc;

/// Characters kept when an excerpt is derived from content
const EXCERPT_CHARS: usize = 200;

const CACHE_PREFIX: &str = "articles:";
const CACHE_KEY_PAGE: &str = "articles:page:";
const CACHE_KEY_BY_SLUG: &str = "articles:slug:";

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>, cache: Arc<Cache>, markdown: MarkdownRenderer) -> Self {
        Self {
            repo,
            cache,
            markdown,
        }
    }

    fn derive_excerpt(&self, explicit: Option<&str>, content: &str) -> String {
        match explicit.map(str::trim) {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => self.markdown.plain_text(content, EXCERPT_CHARS),
        }
    }

    pub async fn create(&self, input: CreateArticleInput) -> Result<Article, ContentServiceError> {
        let title = require_title("Title", &input.title)?;
        let slug = resolve_slug(input.slug.as_deref(), &title)?;

        if self.repo.exists_by_slug(&slug).await? {
            return Err(ContentServiceError::DuplicateSlug(slug));
        }

        let mut article = Article::new(slug, title, input.content);
        article.content_html = self.markdown.render(&article.content);
        article.excerpt = self.derive_excerpt(input.excerpt.as_deref(), &article.content);
        article.cover_image = clean_optional(input.cover_image);
        article.status = input.status.unwrap_or_default();
        if article.status.is_published() {
            article.published_at = Some(Utc::now());
        }

        let created = self.repo.create(&article).await?;
        self.invalidate().await;
        tracing::info!("Created article {} ({})", created.id, created.slug);
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Article, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::NotFound(format!("Article {}", id)))
    }

    /// Published article by slug; drafts are reported as not found
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Article, ContentServiceError> {
        let key = format!("{}{}", CACHE_KEY_BY_SLUG, slug);
        if let Ok(Some(cached)) = self.cache.get::<Article>(&key).await {
            return Ok(cached);
        }

        let article = self
            .repo
            .get_by_slug(slug)
            .await?
            .filter(|a| a.status == PublishStatus::Published)
            .ok_or_else(|| ContentServiceError::NotFound(format!("Article '{}'", slug)))?;

        if let Err(e) = self.cache.set(&key, &article).await {
            tracing::warn!("Failed to cache article {}: {}", slug, e);
        }
        Ok(article)
    }

    /// Every article, for the admin API
    pub async fn list(&self) -> Result<Vec<Article>, ContentServiceError> {
        Ok(self.repo.list().await?)
    }

    /// One page of published articles, most recent first
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ContentServiceError> {
        let key = format!("{}{}:{}", CACHE_KEY_PAGE, params.page, params.per_page);
        if let Ok(Some(cached)) = self.cache.get::<PagedResult<Article>>(&key).await {
            return Ok(cached);
        }

        let total = self.repo.count_published().await?;
        let items = self
            .repo
            .list_published_paged(params.limit(), params.offset())
            .await?;
        let result = PagedResult::new(items, total, params);

        if let Err(e) = self.cache.set(&key, &result).await {
            tracing::warn!("Failed to cache article page: {}", e);
        }
        Ok(result)
    }

    pub async fn update(&self, id: i64, input: UpdateArticleInput) -> Result<Article, ContentServiceError> {
        let mut article = self.get_by_id(id).await?;

        if let Some(title) = input.title {
            article.title = require_title("Title", &title)?;
        }

        if let Some(slug) = input.slug {
            let slug = resolve_slug(Some(&slug), &article.title)?;
            if slug != article.slug && self.repo.exists_by_slug(&slug).await? {
                return Err(ContentServiceError::DuplicateSlug(slug));
            }
            article.slug = slug;
        }

        // An excerpt that was derived follows the content; a hand-written one stays.
        let excerpt_was_derived =
            article.excerpt == self.markdown.plain_text(&article.content, EXCERPT_CHARS);

        if let Some(content) = input.content {
            article.content_html = self.markdown.render(&content);
            article.content = content;
        }

        match input.excerpt {
            Some(excerpt) => {
                article.excerpt = self.derive_excerpt(Some(&excerpt), &article.content);
            }
            None if excerpt_was_derived => {
                article.excerpt = self.derive_excerpt(None, &article.content);
            }
            None => {}
        }

        if input.cover_image.is_some() {
            article.cover_image = clean_optional(input.cover_image);
        }

        if let Some(status) = input.status {
            article.status = status;
            if status.is_published() && article.published_at.is_none() {
                article.published_at = Some(Utc::now());
            }
        }

        let updated = self.repo.update(&article).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        let article = self.get_by_id(id).await?;
        self.repo.delete(article.id).await?;
        self.invalidate().await;
        tracing::info!("Deleted article {} ({})", article.id, article.slug);
        Ok(())
    }

    async fn invalidate(&self) {
        self.cache.delete_prefix(CACHE_PREFIX).await;
    }
}
