//! Publication status shared by projects and articles

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    /// Only visible in the admin API
    #[default]
    Draft,
    /// Visible on the public site
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Published => "published",
        }
    }

    pub fn is_published(&self) -> bool {
        *self == PublishStatus::Published
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PublishStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(anyhow::anyhow!("Invalid publish status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!(PublishStatus::from_str("Published").unwrap(), PublishStatus::Published);
        assert_eq!(PublishStatus::from_str(" draft ").unwrap(), PublishStatus::Draft);
        assert!(PublishStatus::from_str("archived").is_err());
        assert_eq!(PublishStatus::Published.to_string(), "published");
        assert_eq!(PublishStatus::default(), PublishStatus::Draft);
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&PublishStatus::Published).unwrap();
        assert_eq!(json, "\"published\"");
        let parsed: PublishStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(parsed, PublishStatus::Draft);
    }
}
