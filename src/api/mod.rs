//! API layer - HTTP handlers and routing
//!
//! - JSON API under `/api/v1` (public reads, sign-in, admin CRUD, uploads)
//! - Server-rendered public pages
//! - Embedded static assets and locally stored uploads

pub mod admin;
pub mod articles;
pub mod auth;
pub mod certifications;
pub mod common;
pub mod content;
pub mod middleware;
pub mod pages;
pub mod projects;
pub mod site;
pub mod static_files;
pub mod upload;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::StorageDriver;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .nest("/admin/content", content::admin_router())
        .nest("/admin/projects", projects::admin_router())
        .nest("/admin/articles", articles::admin_router())
        .nest("/admin/certifications", certifications::admin_router())
        .nest(
            "/admin/uploads",
            upload::router(state.config.upload.max_file_size),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(site::router())
        .nest("/content", content::public_router())
        .nest("/projects", projects::public_router())
        .nest("/articles", articles::public_router())
        .nest("/certifications", certifications::public_router())
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    // Credentialed CORS cannot use a wildcard origin
    if origin.trim() == "*" {
        tracing::warn!("Ignoring wildcard CORS origin; set server.cors_origin to the admin origin");
        return cors;
    }

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(pages::router())
        .route("/static/{*path}", get(static_files::serve_static));

    let prefix = config.storage.local_url_prefix.trim_end_matches('/');
    if config.storage.driver == StorageDriver::Local && prefix.starts_with('/') {
        router = router.route(
            &format!("{}/{{*key}}", prefix),
            get(static_files::serve_upload),
        );
    }

    router
        .fallback(pages::not_found)
        .layer(cors_layer(&config.server.cors_origin))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
