//! Project model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PublishStatus;

/// A portfolio project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// One-line card text
    pub summary: String,
    /// Markdown source
    pub description: String,
    pub description_html: String,
    pub image_url: Option<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub tech_stack: Vec<String>,
    pub featured: bool,
    /// Lower sorts first
    pub sort_order: i32,
    pub status: PublishStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(slug: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            summary: String::new(),
            description: String::new(),
            description_html: String::new(),
            image_url: None,
            repo_url: None,
            live_url: None,
            tech_stack: Vec::new(),
            featured: false,
            sort_order: 0,
            status: PublishStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectInput {
    /// Generated from the title when absent or blank
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub status: Option<PublishStatus>,
}

/// Partial update. An empty string clears an optional URL field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub sort_order: Option<i32>,
    pub status: Option<PublishStatus>,
}
