//! Rate limiter for sign-in link requests
//!
//! Keeps mailboxes from being flooded:
//! - at most 5 links per email address per 15 minutes
//! - at most 10 requests per IP address per minute

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

const EMAIL_LIMIT: usize = 5;
const EMAIL_WINDOW_MINUTES: i64 = 15;
const IP_LIMIT: usize = 10;
const IP_WINDOW_MINUTES: i64 = 1;

/// Sliding-window limiter for `POST /auth/magic-link`
pub struct SignInRateLimiter {
    email_requests: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    ip_requests: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl SignInRateLimiter {
    pub fn new() -> Self {
        Self {
            email_requests: Arc::new(RwLock::new(HashMap::new())),
            ip_requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn email_key(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub async fn is_email_limited(&self, email: &str) -> bool {
        let mut requests = self.email_requests.write().await;
        let cutoff = Utc::now() - Duration::minutes(EMAIL_WINDOW_MINUTES);

        let times = requests.entry(Self::email_key(email)).or_default();
        times.retain(|time| *time > cutoff);
        times.len() >= EMAIL_LIMIT
    }

    pub async fn record_email(&self, email: &str) {
        let mut requests = self.email_requests.write().await;
        requests
            .entry(Self::email_key(email))
            .or_default()
            .push(Utc::now());
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut requests = self.ip_requests.write().await;
        let cutoff = Utc::now() - Duration::minutes(IP_WINDOW_MINUTES);

        let times = requests.entry(ip).or_default();
        times.retain(|time| *time > cutoff);
        times.len() >= IP_LIMIT
    }

    pub async fn record_ip(&self, ip: IpAddr) {
        let mut requests = self.ip_requests.write().await;
        requests.entry(ip).or_default().push(Utc::now());
    }

    /// Drop expired entries (called periodically)
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let email_cutoff = now - Duration::minutes(EMAIL_WINDOW_MINUTES);
        let ip_cutoff = now - Duration::minutes(IP_WINDOW_MINUTES);

        {
            let mut requests = self.email_requests.write().await;
            requests.retain(|_, times| {
                times.retain(|time| *time > email_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut requests = self.ip_requests.write().await;
            requests.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> (usize, usize) {
        (
            self.email_requests.read().await.len(),
            self.ip_requests.read().await.len(),
        )
    }
}

impl Default for SignInRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
