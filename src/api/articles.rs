//! Article API endpoints
//!
//! Public:
//! - GET /api/v1/articles - Published articles, newest first, paginated
//! - GET /api/v1/articles/{slug} - One published article
//!
//! Admin:
//! - GET|POST /api/v1/admin/articles
//! - GET|PUT|DELETE /api/v1/admin/articles/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Article, CreateArticleInput, UpdateArticleInput};
use crate::render::views::ArticleView;

/// Response for article list
#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleView>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles))
        .route("/{slug}", get(get_article))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_articles).post(create_article))
        .route(
            "/{id}",
            get(get_article_by_id).put(update_article).delete(delete_article),
        )
}

/// GET /api/v1/articles?page=&page_size=
async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let result = state.article_service.list_published(&query.params()).await?;
    let page = ArticleView::page(state.renderer.urls(), &result);

    Ok(Json(ArticleListResponse {
        total: page.total,
        page: page.page,
        page_size: page.per_page,
        total_pages: page.total_pages(),
        articles: page.items,
    }))
}

/// GET /api/v1/articles/{slug}
///
/// Drafts answer 404.
async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleView>, ApiError> {
    let article = state.article_service.get_published_by_slug(&slug).await?;
    Ok(Json(ArticleView::new(state.renderer.urls(), &article)))
}

/// GET /api/v1/admin/articles - All articles, drafts included
async fn admin_list_articles(State(state): State<AppState>) -> Result<Json<Vec<Article>>, ApiError> {
    Ok(Json(state.article_service.list().await?))
}

/// GET /api/v1/admin/articles/{id}
async fn get_article_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get_by_id(id).await?))
}

/// POST /api/v1/admin/articles
async fn create_article(
    State(state): State<AppState>,
    Json(body): Json<CreateArticleInput>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state.article_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// PUT /api/v1/admin/articles/{id}
async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.update(id, body).await?))
}

/// DELETE /api/v1/admin/articles/{id}
async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
