//! Common API utilities and shared types

use axum::http::{header, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::net::IpAddr;

use crate::api::middleware::SESSION_COOKIE;
use crate::config::AuthConfig;
use crate::models::ListParams;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for public lists
pub fn default_page_size() -> u32 {
    10
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.page_size)
    }
}

/// Client address as reported by the reverse proxy
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
    {
        return Some(ip);
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

fn cookie_header(value: String) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(header::SET_COOKIE, value);
    }
    headers
}

/// `Set-Cookie` for a new session
pub fn session_cookie(token: &str, auth: &AuthConfig) -> HeaderMap {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        auth.session_days * 24 * 60 * 60
    );
    if auth.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie_header(cookie)
}

/// `Set-Cookie` that clears the session
pub fn clear_session_cookie() -> HeaderMap {
    cookie_header(format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    ))
}
