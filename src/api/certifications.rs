//! Certification API endpoints
//!
//! - GET /api/v1/certifications (public)
//! - GET|POST /api/v1/admin/certifications
//! - GET|PUT|DELETE /api/v1/admin/certifications/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Certification, CreateCertificationInput, UpdateCertificationInput};
use crate::render::views::CertificationView;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_certifications))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_certifications).post(create_certification))
        .route(
            "/{id}",
            get(get_certification)
                .put(update_certification)
                .delete(delete_certification),
        )
}

/// GET /api/v1/certifications
async fn list_certifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<CertificationView>>, ApiError> {
    let certifications = state.certification_service.list().await?;
    Ok(Json(CertificationView::list(state.renderer.urls(), &certifications)))
}

async fn admin_list_certifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<Certification>>, ApiError> {
    Ok(Json(state.certification_service.list().await?))
}

async fn get_certification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Certification>, ApiError> {
    Ok(Json(state.certification_service.get_by_id(id).await?))
}

async fn create_certification(
    State(state): State<AppState>,
    Json(body): Json<CreateCertificationInput>,
) -> Result<(StatusCode, Json<Certification>), ApiError> {
    let certification = state.certification_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(certification)))
}

async fn update_certification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCertificationInput>,
) -> Result<Json<Certification>, ApiError> {
    Ok(Json(state.certification_service.update(id, body).await?))
}

async fn delete_certification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.certification_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
