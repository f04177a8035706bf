//! Public URLs for stored objects
//!
//! An uploaded image can be reachable under several URL shapes over the
//! life of a site:
//!
//! | shape            | example                                                  |
//! |------------------|----------------------------------------------------------|
//! | custom domain    | `https://images.example.com/{key}`                       |
//! | dev subdomain    | `https://pub-abc.r2.dev/{key}`                           |
//! | direct endpoint  | `https://{account}.r2.cloudflarestorage.com/{bucket}/{key}` |
//! | virtual host     | `https://{bucket}.{account}.r2.cloudflarestorage.com/{key}` |
//! | local driver     | `/uploads/{key}`                                         |
//!
//! New URLs use the first configured of custom domain, dev subdomain and
//! direct endpoint (or the local prefix for the local driver). Every shape
//! is recognized when reading a URL back, so content saved under an older
//! configuration keeps resolving.

use super::validate_key;
use crate::config::{StorageConfig, StorageDriver};

const R2_HOST_SUFFIX: &str = "r2.cloudflarestorage.com";

#[derive(Debug, Clone)]
pub struct StorageUrls {
    driver: StorageDriver,
    bucket: String,
    endpoint: String,
    virtual_host: Option<String>,
    custom_domain: Option<String>,
    dev_url: Option<String>,
    local_prefix: String,
}

fn clean_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(clean_base)
        .filter(|v| !v.is_empty())
}

/// Drop `http://` or `https://`
fn without_scheme(url: &str) -> &str {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    if lower.starts_with("https://") {
        &url[8..]
    } else if lower.starts_with("http://") {
        &url[7..]
    } else {
        url
    }
}

/// Remainder of `url` after `base/`, ignoring scheme and case of the base
fn strip_base<'a>(url: &'a str, base: &str) -> Option<&'a str> {
    let url_rest = without_scheme(url);
    let base_rest = without_scheme(base);
    let scheme_matches = (url_rest.len() == url.len()) == (base_rest.len() == base.len());
    if !scheme_matches || url_rest.len() <= base_rest.len() {
        return None;
    }

    let (head, tail) = url_rest.split_at(base_rest.len());
    if head.eq_ignore_ascii_case(base_rest) {
        tail.strip_prefix('/')
    } else {
        None
    }
}

/// Percent-encode each path segment of a key
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl StorageUrls {
    pub fn from_config(config: &StorageConfig) -> Self {
        let account = config.account_id.trim();
        let bucket = config.bucket.trim().to_string();

        let endpoint = match non_empty(&config.endpoint) {
            Some(endpoint) => endpoint,
            None => format!("https://{}.{}", account, R2_HOST_SUFFIX),
        };
        let virtual_host = (config.endpoint.is_none() && !account.is_empty() && !bucket.is_empty())
            .then(|| format!("https://{}.{}.{}", bucket, account, R2_HOST_SUFFIX));

        let mut local_prefix = clean_base(&config.local_url_prefix);
        if !local_prefix.starts_with('/') && !local_prefix.contains("://") {
            local_prefix.insert(0, '/');
        }

        Self {
            driver: config.driver,
            bucket,
            endpoint,
            virtual_host,
            custom_domain: non_empty(&config.public_url),
            dev_url: non_empty(&config.dev_url),
            local_prefix,
        }
    }

    /// S3 API endpoint, without the bucket
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Canonical public URL for `key`
    pub fn public_url(&self, key: &str) -> String {
        let key = encode_key(key.trim_start_matches('/'));
        match self.driver {
            StorageDriver::Local => format!("{}/{}", self.local_prefix, key),
            StorageDriver::R2 => {
                if let Some(domain) = &self.custom_domain {
                    format!("{}/{}", domain, key)
                } else if let Some(dev) = &self.dev_url {
                    format!("{}/{}", dev, key)
                } else {
                    format!("{}/{}/{}", self.endpoint, self.bucket, key)
                }
            }
        }
    }

    /// Bases this configuration may have produced URLs under
    fn known_bases(&self) -> Vec<String> {
        let mut bases = Vec::with_capacity(5);
        if let Some(domain) = &self.custom_domain {
            bases.push(domain.clone());
        }
        if let Some(dev) = &self.dev_url {
            bases.push(dev.clone());
        }
        if !self.bucket.is_empty() {
            bases.push(format!("{}/{}", self.endpoint, self.bucket));
        }
        if let Some(host) = &self.virtual_host {
            bases.push(host.clone());
        }
        bases.push(self.local_prefix.clone());
        bases
    }

    /// Object key behind a URL of any recognized shape.
    ///
    /// Query strings and fragments are ignored and the key is
    /// percent-decoded. Returns `None` for foreign URLs and for keys that
    /// would escape the bucket.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let url = url.trim();
        let end = url.find(['?', '#']).unwrap_or(url.len());
        let url = &url[..end];

        // Relative local paths may come without the leading slash
        let relative = format!("/{}", url);
        let local_candidate = if !url.starts_with('/') && !url.contains("://") {
            relative.as_str()
        } else {
            url
        };

        let raw = self.known_bases().iter().find_map(|base| {
            let target = if base.starts_with('/') { local_candidate } else { url };
            strip_base(target, base)
        })?;

        let key = urlencoding::decode(raw).ok()?.into_owned();
        validate_key(&key).ok()?;
        Some(key)
    }

    /// Rewrite a recognized URL to the current canonical shape; anything
    /// else is returned as given
    pub fn normalize(&self, url: &str) -> String {
        match self.key_from_url(url) {
            Some(key) => self.public_url(&key),
            None => url.to_string(),
        }
    }

    /// `normalize` over an optional field
    pub fn normalize_opt(&self, url: Option<&str>) -> Option<String> {
        url.map(|u| self.normalize(u))
    }
}
