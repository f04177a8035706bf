//! Admin API endpoints that are not content CRUD
//!
//! - GET /api/v1/admin/users - Every profile that has signed in

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::models::User;

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

/// GET /api/v1/admin/users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.auth_service.list_users().await?))
}
