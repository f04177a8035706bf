//! Singleton content API endpoints
//!
//! - GET /api/v1/content/home, GET /api/v1/content/about (public)
//! - PUT /api/v1/admin/content/home, PUT /api/v1/admin/content/about (admin)

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{AboutContent, HomeContent, UpdateAboutInput, UpdateHomeInput};
use crate::render::views;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/home", get(get_home))
        .route("/about", get(get_about))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/home", put(update_home))
        .route("/about", put(update_about))
}

/// GET /api/v1/content/home
async fn get_home(State(state): State<AppState>) -> Result<Json<HomeContent>, ApiError> {
    let home = state.content_service.home().await?;
    Ok(Json(views::home(state.renderer.urls(), &home)))
}

/// GET /api/v1/content/about
async fn get_about(State(state): State<AppState>) -> Result<Json<AboutContent>, ApiError> {
    let about = state.content_service.about().await?;
    Ok(Json(views::about(state.renderer.urls(), &about)))
}

/// PUT /api/v1/admin/content/home
async fn update_home(
    State(state): State<AppState>,
    Json(body): Json<UpdateHomeInput>,
) -> Result<Json<HomeContent>, ApiError> {
    Ok(Json(state.content_service.update_home(body).await?))
}

/// PUT /api/v1/admin/content/about
async fn update_about(
    State(state): State<AppState>,
    Json(body): Json<UpdateAboutInput>,
) -> Result<Json<AboutContent>, ApiError> {
    Ok(Json(state.content_service.update_about(body).await?))
}
