//! Static file serving
//!
//! - `/static/*` - CSS and other assets compiled into the binary
//! - `/uploads/*` - images saved by the local storage driver

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use tokio::fs;

use crate::api::middleware::AppState;
use crate::render::StaticAssets;
use crate::services::storage::validate_key;

/// Uploaded objects never change under the same key
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const SHORT_LIVED: &str = "public, max-age=3600";

/// GET /static/{*path}
pub async fn serve_static(Path(path): Path<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(file) => file_response(&path, file.data.into_owned(), SHORT_LIVED),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET {local_url_prefix}/{*path}
pub async fn serve_upload(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    if validate_key(&key).is_err() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let file_path: PathBuf = state.config.upload.path.join(&key);
    match fs::read(&file_path).await {
        Ok(contents) => {
            let mut response = file_response(&key, contents, IMMUTABLE);
            // Uploaded SVGs must not run scripts in the site's origin
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static("default-src 'none'; style-src 'unsafe-inline'; sandbox"),
            );
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            response
        }
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to read upload {}: {}", file_path.display(), e);
            }
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn file_response(path: &str, contents: Vec<u8>, cache_control: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, get_content_type(path)),
            (header::CACHE_CONTROL, cache_control),
        ],
        Body::from(contents),
    )
        .into_response()
}

fn get_content_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
