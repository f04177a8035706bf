//! Public site rendering
//!
//! Pages are Tera templates compiled into the binary with rust-embed. Every
//! page gets the standard variables (`site_name`, `site_description`,
//! `site_author`, `social`, `year`, `request_path`); image URLs in the
//! view models are normalized through `StorageUrls` first.

use chrono::Datelike;
use rust_embed::RustEmbed;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::config::SiteConfig;
use crate::services::StorageUrls;

mod error;
pub mod views;

pub use error::RenderError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct TemplateAssets;

/// Embedded CSS and other files served under `/static`
#[derive(RustEmbed)]
#[folder = "static/"]
pub struct StaticAssets;

pub struct SiteRenderer {
    tera: Tera,
    site: SiteConfig,
    urls: StorageUrls,
}

/// Render error with its cause chain flattened into one message
fn describe(template: &str, e: &tera::Error) -> String {
    let mut message = format!("Failed to render '{}': {}", template, e);
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

impl SiteRenderer {
    pub fn new(site: SiteConfig, urls: StorageUrls) -> Result<Self, RenderError> {
        let mut templates = Vec::new();
        for name in TemplateAssets::iter() {
            if let Some(file) = TemplateAssets::get(&name) {
                let content = String::from_utf8_lossy(&file.data).into_owned();
                templates.push((name.to_string(), content));
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| RenderError::TemplateError(describe("templates", &e)))?;
        tracing::debug!("Loaded {} page templates", tera.get_template_names().count());

        Ok(Self { tera, site, urls })
    }

    pub fn urls(&self) -> &StorageUrls {
        &self.urls
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Render with the standard page variables added to `context`
    pub fn render(
        &self,
        template: &str,
        context: &TeraContext,
        request_path: &str,
    ) -> Result<String, RenderError> {
        if !self.has_template(template) {
            return Err(RenderError::NotFound(template.to_string()));
        }

        let mut full = context.clone();
        full.insert("site_name", &self.site.name);
        full.insert("site_description", &self.site.description);
        full.insert("site_author", &self.site.author);
        full.insert("social", &self.site.social);
        full.insert("year", &chrono::Utc::now().year());
        full.insert("request_path", request_path);

        self.tera
            .render(template, &full)
            .map_err(|e| RenderError::TemplateError(describe(template, &e)))
    }

    /// Render, falling back to a bare error page
    pub fn render_with_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        request_path: &str,
    ) -> String {
        match self.render(template, context, request_path) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("{}", e);
                simple_error_page(&self.site.name)
            }
        }
    }

    /// Bare page for failures outside template rendering
    pub fn error_page(&self) -> String {
        simple_error_page(&self.site.name)
    }

    pub fn not_found(&self, request_path: &str) -> String {
        self.render_with_fallback("not_found.html", &TeraContext::new(), request_path)
    }
}

fn simple_error_page(site_name: &str) -> String {
    let name = site_name
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{0}</title></head>\
         <body><h1>Something went wrong</h1><p>This page could not be rendered.</p>\
         <p><a href=\"/\">{0}</a></p></body></html>",
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SocialLink, StorageConfig};
    use crate::models::{AboutContent, Article, HomeContent, PagedResult, ListParams, Project};
    use crate::render::views::{ArticleView, ProjectView};

    fn renderer() -> SiteRenderer {
        let site = SiteConfig {
            name: "Jane Doe".to_string(),
            description: "Engineer".to_string(),
            author: "Jane".to_string(),
            social: vec![SocialLink {
                label: "GitHub".to_string(),
                url: "https://github.com/jane".to_string(),
            }],
        };
        SiteRenderer::new(site, StorageUrls::from_config(&StorageConfig::default())).unwrap()
    }

    #[test]
    fn test_all_pages_are_embedded() {
        let r = renderer();
        for name in [
            "base.html",
            "home.html",
            "about.html",
            "projects.html",
            "project.html",
            "articles.html",
            "article.html",
            "certifications.html",
            "not_found.html",
        ] {
            assert!(r.has_template(name), "missing {}", name);
        }
        assert!(StaticAssets::get("site.css").is_some());
    }

    #[test]
    fn test_home_page_renders_standard_vars() {
        let r = renderer();
        let mut ctx = TeraContext::new();
        let mut home = HomeContent::default();
        home.intro_html = "<p>I build <strong>things</strong></p>".to_string();
        ctx.insert("home", &home);
        ctx.insert("featured", &Vec::<ProjectView>::new());
        ctx.insert("recent", &Vec::<ArticleView>::new());

        let html = r.render("home.html", &ctx, "/").unwrap();
        assert!(html.contains("<title>Jane Doe</title>"));
        assert!(html.contains(&home.headline));
        assert!(html.contains("<strong>things</strong>"));
        assert!(html.contains("https://github.com/jane"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let r = renderer();
        let mut about = AboutContent::default();
        about.title = "<script>alert(1)</script>".to_string();
        let mut ctx = TeraContext::new();
        ctx.insert("about", &about);

        let html = r.render("about.html", &ctx, "/about").unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_articles_page_pagination() {
        let r = renderer();
        let mut article = Article::new("hello".into(), "Hello".into(), "word ".repeat(450));
        article.published_at = Some(chrono::Utc::now());
        let items = vec![ArticleView::new(r.urls(), &article)];
        let page = PagedResult::new(items, 25, &ListParams::new(2, 10));

        let mut ctx = TeraContext::new();
        views::insert_page(&mut ctx, "articles", &page);
        let html = r.render("articles.html", &ctx, "/articles").unwrap();

        assert!(html.contains("Page 2 of 3"));
        assert!(html.contains("/articles?page=1"));
        assert!(html.contains("/articles?page=3"));
        assert!(html.contains("3 min read"));
    }

    #[test]
    fn test_project_page() {
        let r = renderer();
        let mut project = Project::new("cli".into(), "A CLI".into());
        project.description_html = "<p>Fast.</p>".to_string();
        project.image_url = Some("uploads/images/cli.png".to_string());
        let mut ctx = TeraContext::new();
        ctx.insert("project", &ProjectView::new(r.urls(), &project));

        let html = r.render("project.html", &ctx, "/projects/cli").unwrap();
        assert!(html.contains("<p>Fast.</p>"));
        assert!(html.contains("src=\"/uploads/images/cli.png\""));
    }

    #[test]
    fn test_missing_template_and_fallback() {
        let r = renderer();
        assert!(matches!(
            r.render("nope.html", &TeraContext::new(), "/"),
            Err(RenderError::NotFound(_))
        ));

        // home.html needs `home`; rendering without it falls back
        let html = r.render_with_fallback("home.html", &TeraContext::new(), "/");
        assert!(html.contains("Something went wrong"));
    }

    #[test]
    fn test_not_found_page() {
        let html = renderer().not_found("/missing/page");
        assert!(html.contains("Page not found"));
        assert!(html.contains("/missing/page"));
    }
}
