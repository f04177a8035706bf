//! Public site information and health check
//!
//! - GET /api/v1/site - Site name, description, author and social links
//! - GET /api/v1/health - Liveness plus a database ping

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::config::SocialLink;

/// Response for public site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub social: Vec<SocialLink>,
    pub storage: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/site", get(get_site_info))
        .route("/health", get(health))
}

/// GET /api/v1/site
async fn get_site_info(State(state): State<AppState>) -> Json<SiteInfoResponse> {
    let site = &state.config.site;
    Json(SiteInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: site.name.clone(),
        description: site.description.clone(),
        author: site.author.clone(),
        social: site.social.clone(),
        storage: state.upload_service.store_name(),
    })
}

/// GET /api/v1/health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: true,
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: false,
                }),
            )
        }
    }
}
