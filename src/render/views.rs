//! View models for templates and public JSON
//!
//! Stored image URLs may use any shape the storage layer has produced over
//! time; views rewrite them to the current public URL.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::models::{AboutContent, Article, Certification, HomeContent, PagedResult, Project};
use crate::services::StorageUrls;

pub fn home(urls: &StorageUrls, home: &HomeContent) -> HomeContent {
    let mut home = home.clone();
    home.hero_image = urls.normalize_opt(home.hero_image.as_deref());
    home
}

pub fn about(urls: &StorageUrls, about: &AboutContent) -> AboutContent {
    let mut about = about.clone();
    about.portrait_image = urls.normalize_opt(about.portrait_image.as_deref());
    about
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
}

impl ProjectView {
    pub fn new(urls: &StorageUrls, project: &Project) -> Self {
        let mut project = project.clone();
        project.image_url = urls.normalize_opt(project.image_url.as_deref());
        Self { project }
    }

    pub fn list(urls: &StorageUrls, projects: &[Project]) -> Vec<Self> {
        projects.iter().map(|p| Self::new(urls, p)).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub reading_minutes: usize,
}

impl ArticleView {
    pub fn new(urls: &StorageUrls, article: &Article) -> Self {
        let mut article = article.clone();
        article.cover_image = urls.normalize_opt(article.cover_image.as_deref());
        let reading_minutes = article.reading_minutes();
        Self {
            article,
            reading_minutes,
        }
    }

    pub fn page(urls: &StorageUrls, page: &PagedResult<Article>) -> PagedResult<Self> {
        PagedResult {
            items: page.items.iter().map(|a| Self::new(urls, a)).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificationView {
    #[serde(flatten)]
    pub certification: Certification,
    pub expired: bool,
}

impl CertificationView {
    pub fn new(urls: &StorageUrls, certification: &Certification, today: NaiveDate) -> Self {
        let mut certification = certification.clone();
        certification.image_url = urls.normalize_opt(certification.image_url.as_deref());
        let expired = certification.is_expired(today);
        Self {
            certification,
            expired,
        }
    }

    pub fn list(urls: &StorageUrls, certifications: &[Certification]) -> Vec<Self> {
        let today = Utc::now().date_naive();
        certifications
            .iter()
            .map(|c| Self::new(urls, c, today))
            .collect()
    }
}

/// Insert a page of items under `key` along with the pager variables
pub fn insert_page<T: Serialize>(context: &mut TeraContext, key: &str, page: &PagedResult<T>) {
    context.insert(key, &page.items);
    context.insert("page", &page.page);
    context.insert("total_pages", &page.total_pages());
    context.insert("has_prev", &page.has_prev());
    context.insert("has_next", &page.has_next());
}
