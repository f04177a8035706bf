//! Project API endpoints
//!
//! Public:
//! - GET /api/v1/projects - Published projects, featured first
//! - GET /api/v1/projects/{slug} - One published project
//!
//! Admin:
//! - GET|POST /api/v1/admin/projects
//! - GET|PUT|DELETE /api/v1/admin/projects/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateProjectInput, Project, UpdateProjectInput};
use crate::render::views::ProjectView;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects))
        .route("/{slug}", get(get_project))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_projects).post(create_project))
        .route(
            "/{id}",
            get(get_project_by_id).put(update_project).delete(delete_project),
        )
}

/// GET /api/v1/projects
async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectView>>, ApiError> {
    let projects = state.project_service.list_published().await?;
    Ok(Json(ProjectView::list(state.renderer.urls(), &projects)))
}

/// GET /api/v1/projects/{slug}
///
/// Drafts answer 404.
async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProjectView>, ApiError> {
    let project = state.project_service.get_published_by_slug(&slug).await?;
    Ok(Json(ProjectView::new(state.renderer.urls(), &project)))
}

/// GET /api/v1/admin/projects - All projects, drafts included
async fn admin_list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.project_service.list().await?))
}

/// GET /api/v1/admin/projects/{id}
async fn get_project_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.project_service.get_by_id(id).await?))
}

/// POST /api/v1/admin/projects
async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state.project_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/v1/admin/projects/{id}
async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProjectInput>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.project_service.update(id, body).await?))
}

/// DELETE /api/v1/admin/projects/{id}
async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.project_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
