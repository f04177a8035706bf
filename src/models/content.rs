//! Singleton page content
//!
//! Home and about are each stored as a single admin-editable row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Landing page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeContent {
    pub headline: String,
    pub tagline: String,
    /// Markdown source
    pub intro: String,
    /// Rendered intro
    pub intro_html: String,
    pub hero_image: Option<String>,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for HomeContent {
    fn default() -> Self {
        Self {
            headline: "Hello, welcome to my portfolio".to_string(),
            tagline: String::new(),
            intro: String::new(),
            intro_html: String::new(),
            hero_image: None,
            cta_label: None,
            cta_url: None,
            updated_at: Utc::now(),
        }
    }
}

/// About page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AboutContent {
    pub title: String,
    /// Markdown source
    pub body: String,
    pub body_html: String,
    pub portrait_image: Option<String>,
    pub resume_url: Option<String>,
    pub skills: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for AboutContent {
    fn default() -> Self {
        Self {
            title: "About me".to_string(),
            body: String::new(),
            body_html: String::new(),
            portrait_image: None,
            resume_url: None,
            skills: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Replacement for the home row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHomeInput {
    pub headline: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub hero_image: Option<String>,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default)]
    pub cta_url: Option<String>,
}

/// Replacement for the about row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAboutInput {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub portrait_image: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}
