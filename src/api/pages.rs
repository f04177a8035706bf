//! Public HTML pages
//!
//! Server-rendered views of the portfolio content. Missing or draft items
//! render the not-found page with a 404.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use crate::api::common::PaginationQuery;
use crate::api::middleware::AppState;
use crate::models::ListParams;
use crate::render::views::{self, ArticleView, CertificationView, ProjectView};
use crate::services::ContentServiceError;

/// Projects shown on the home page
const FEATURED_ON_HOME: usize = 6;
/// Articles shown on the home page
const RECENT_ON_HOME: u32 = 3;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/projects", get(projects))
        .route("/projects/{slug}", get(project))
        .route("/articles", get(articles))
        .route("/articles/{slug}", get(article))
        .route("/certifications", get(certifications))
}

fn render(state: &AppState, template: &str, context: &TeraContext, uri: &Uri) -> Response {
    Html(state.renderer.render_with_fallback(template, context, uri.path())).into_response()
}

fn page_error(state: &AppState, error: ContentServiceError, uri: &Uri) -> Response {
    match error {
        ContentServiceError::NotFound(_) => not_found_page(state, uri),
        e => {
            tracing::error!("Failed to load {}: {}", uri.path(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(state.renderer.error_page())).into_response()
        }
    }
}

fn not_found_page(state: &AppState, uri: &Uri) -> Response {
    (StatusCode::NOT_FOUND, Html(state.renderer.not_found(uri.path()))).into_response()
}

/// Router fallback
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    not_found_page(&state, &uri)
}

async fn home(State(state): State<AppState>, uri: Uri) -> Response {
    let urls = state.renderer.urls();
    let loaded = async {
        let home = state.content_service.home().await?;
        let projects = state.project_service.list_published().await?;
        let recent = state
            .article_service
            .list_published(&ListParams::new(1, RECENT_ON_HOME))
            .await?;
        Ok::<_, ContentServiceError>((home, projects, recent))
    }
    .await;

    match loaded {
        Ok((home, projects, recent)) => {
            let featured: Vec<ProjectView> = projects
                .iter()
                .filter(|p| p.featured)
                .take(FEATURED_ON_HOME)
                .map(|p| ProjectView::new(urls, p))
                .collect();
            let recent: Vec<ArticleView> =
                recent.items.iter().map(|a| ArticleView::new(urls, a)).collect();

            let mut context = TeraContext::new();
            context.insert("home", &views::home(urls, &home));
            context.insert("featured", &featured);
            context.insert("recent", &recent);
            render(&state, "home.html", &context, &uri)
        }
        Err(e) => page_error(&state, e, &uri),
    }
}

async fn about(State(state): State<AppState>, uri: Uri) -> Response {
    match state.content_service.about().await {
        Ok(about) => {
            let mut context = TeraContext::new();
            context.insert("about", &views::about(state.renderer.urls(), &about));
            render(&state, "about.html", &context, &uri)
        }
        Err(e) => page_error(&state, e, &uri),
    }
}

async fn projects(State(state): State<AppState>, uri: Uri) -> Response {
    match state.project_service.list_published().await {
        Ok(projects) => {
            let mut context = TeraContext::new();
            context.insert("projects", &ProjectView::list(state.renderer.urls(), &projects));
            render(&state, "projects.html", &context, &uri)
        }
        Err(e) => page_error(&state, e, &uri),
    }
}

async fn project(State(state): State<AppState>, Path(slug): Path<String>, uri: Uri) -> Response {
    match state.project_service.get_published_by_slug(&slug).await {
        Ok(project) => {
            let mut context = TeraContext::new();
            context.insert("project", &ProjectView::new(state.renderer.urls(), &project));
            render(&state, "project.html", &context, &uri)
        }
        Err(e) => page_error(&state, e, &uri),
    }
}

async fn articles(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
    uri: Uri,
) -> Response {
    match state.article_service.list_published(&query.params()).await {
        Ok(result) => {
            let page = ArticleView::page(state.renderer.urls(), &result);
            if page.is_empty() && page.page > 1 {
                return not_found_page(&state, &uri);
            }
            let mut context = TeraContext::new();
            views::insert_page(&mut context, "articles", &page);
            render(&state, "articles.html", &context, &uri)
        }
        Err(e) => page_error(&state, e, &uri),
    }
}

async fn article(State(state): State<AppState>, Path(slug): Path<String>, uri: Uri) -> Response {
    match state.article_service.get_published_by_slug(&slug).await {
        Ok(article) => {
            let mut context = TeraContext::new();
            context.insert("article", &ArticleView::new(state.renderer.urls(), &article));
            render(&state, "article.html", &context, &uri)
        }
        Err(e) => page_error(&state, e, &uri),
    }
}

async fn certifications(State(state): State<AppState>, uri: Uri) -> Response {
    match state.certification_service.list().await {
        Ok(certifications) => {
            let mut context = TeraContext::new();
            context.insert(
                "certifications",
                &CertificationView::list(state.renderer.urls(), &certifications),
            );
            render(&state, "certifications.html", &context, &uri)
        }
        Err(e) => page_error(&state, e, &uri),
    }
}
