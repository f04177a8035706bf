//! Certification model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub id: i64,
    pub name: String,
    pub issuer: String,
    pub issued_on: NaiveDate,
    /// `None` for credentials that never expire
    pub expires_on: Option<NaiveDate>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certification {
    pub fn new(name: String, issuer: String, issued_on: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            issuer,
            issued_on,
            expires_on: None,
            credential_id: None,
            credential_url: None,
            image_url: None,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// A credential is expired once its expiry date has passed
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expires_on, Some(expires) if expires < today)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCertificationInput {
    pub name: String,
    pub issuer: String,
    pub issued_on: NaiveDate,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub credential_id: Option<String>,
    #[serde(default)]
    pub credential_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Partial update. An empty string clears an optional text field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCertificationInput {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub issued_on: Option<NaiveDate>,
    /// `Some(None)` clears the expiry
    #[serde(default, deserialize_with = "double_option")]
    pub expires_on: Option<Option<NaiveDate>>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: Option<i32>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<NaiveDate>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_is_expired() {
        let mut cert = Certification::new("CKA".into(), "CNCF".into(), date(2022, 1, 1));
        assert!(!cert.is_expired(date(2030, 1, 1)));

        cert.expires_on = Some(date(2025, 1, 1));
        assert!(!cert.is_expired(date(2025, 1, 1)));
        assert!(cert.is_expired(date(2025, 1, 2)));
    }

    #[test]
    fn test_update_input_distinguishes_null_from_missing() {
        let missing: UpdateCertificationInput = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.expires_on, None);

        let cleared: UpdateCertificationInput =
            serde_json::from_str(r#"{"expires_on":null}"#).unwrap();
        assert_eq!(cleared.expires_on, Some(None));

        let set: UpdateCertificationInput =
            serde_json::from_str(r#"{"expires_on":"2027-03-01"}"#).unwrap();
        assert_eq!(set.expires_on, Some(Some(date(2027, 3, 1))));
    }
}
