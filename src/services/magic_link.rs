//! Magic-link tokens
//!
//! A token is a compact HS256 JWT:
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(HMAC-SHA256(secret, header.claims))
//! ```
//!
//! Segments use URL-safe base64 without padding, so the token can be put in
//! a query string as-is. Verification checks the signature in constant time
//! before looking at any claim. Redemption records the token id (`jti`) so
//! each link signs in once.

use crate::config::AuthConfig;
use crate::db::repositories::MagicLinkRepository;
use chrono::{DateTime, Duration, TimeZone, Utc};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Value of the `purpose` claim
pub const MAGIC_LINK_PURPOSE: &str = "magic_link";

/// Path the emailed link points at
pub const VERIFY_PATH: &str = "/api/v1/auth/verify";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a magic-link token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLinkClaims {
    /// Lowercased email address
    pub sub: String,
    pub purpose: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    pub jti: String,
}

impl MagicLinkClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// A freshly signed link
#[derive(Debug, Clone)]
pub struct IssuedLink {
    pub token: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum MagicLinkError {
    #[error("Malformed token")]
    Malformed,

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token is not a sign-in link")]
    WrongPurpose,

    #[error("Sign-in link has expired")]
    Expired,

    #[error("Sign-in link has already been used")]
    AlreadyUsed,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct MagicLinkService {
    secret: Vec<u8>,
    ttl: Duration,
    base_url: String,
    repo: Arc<dyn MagicLinkRepository>,
}

impl MagicLinkService {
    pub fn new(auth: &AuthConfig, base_url: &str, repo: Arc<dyn MagicLinkRepository>) -> Self {
        Self {
            secret: auth.secret.as_bytes().to_vec(),
            ttl: Duration::minutes(auth.magic_link_ttl_minutes),
            base_url: base_url.trim_end_matches('/').to_string(),
            repo,
        }
    }

    fn mac(&self) -> Result<HmacSha256, MagicLinkError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| MagicLinkError::InternalError(anyhow::anyhow!("HMAC key: {}", e)))
    }

    /// Sign a link for `email`
    pub fn issue(&self, email: &str) -> Result<IssuedLink, MagicLinkError> {
        self.issue_at(email, Utc::now())
    }

    fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<IssuedLink, MagicLinkError> {
        let expires_at = now + self.ttl;
        let claims = MagicLinkClaims {
            sub: email.trim().to_lowercase(),
            purpose: MAGIC_LINK_PURPOSE.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };

        let token = self.sign(&claims)?;
        let url = format!(
            "{}{}?token={}",
            self.base_url,
            VERIFY_PATH,
            urlencoding::encode(&token)
        );

        Ok(IssuedLink {
            token,
            url,
            expires_at,
        })
    }

    fn sign(&self, claims: &MagicLinkClaims) -> Result<String, MagicLinkError> {
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let header = serde_json::to_vec(&header).map_err(anyhow::Error::from)?;
        let claims = serde_json::to_vec(claims).map_err(anyhow::Error::from)?;

        let signing_input = format!(
            "{}.{}",
            BASE64URL_NOPAD.encode(&header),
            BASE64URL_NOPAD.encode(&claims)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", signing_input, BASE64URL_NOPAD.encode(&signature)))
    }

    /// Check a token without consuming it
    pub fn verify(&self, token: &str) -> Result<MagicLinkClaims, MagicLinkError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<MagicLinkClaims, MagicLinkError> {
        let mut parts = token.trim().split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(MagicLinkError::Malformed),
            };

        let header_bytes = BASE64URL_NOPAD
            .decode(header_b64.as_bytes())
            .map_err(|_| MagicLinkError::Malformed)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| MagicLinkError::Malformed)?;
        if header.alg != "HS256" {
            return Err(MagicLinkError::UnsupportedAlgorithm(header.alg));
        }

        let signature = BASE64URL_NOPAD
            .decode(signature_b64.as_bytes())
            .map_err(|_| MagicLinkError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| MagicLinkError::InvalidSignature)?;

        let claims_bytes = BASE64URL_NOPAD
            .decode(claims_b64.as_bytes())
            .map_err(|_| MagicLinkError::Malformed)?;
        let claims: MagicLinkClaims =
            serde_json::from_slice(&claims_bytes).map_err(|_| MagicLinkError::Malformed)?;

        if claims.purpose != MAGIC_LINK_PURPOSE {
            return Err(MagicLinkError::WrongPurpose);
        }
        if claims.exp <= now.timestamp() {
            return Err(MagicLinkError::Expired);
        }

        Ok(claims)
    }

    /// Verify and mark the token used. A second redemption fails.
    pub async fn consume(&self, token: &str) -> Result<MagicLinkClaims, MagicLinkError> {
        let claims = self.verify(token)?;

        let first_use = self
            .repo
            .mark_used(&claims.jti, &claims.sub, claims.expires_at())
            .await?;
        if !first_use {
            tracing::warn!("Rejected reused sign-in link for {}", claims.sub);
            return Err(MagicLinkError::AlreadyUsed);
        }

        Ok(claims)
    }

    /// Forget consumed ids of expired tokens
    pub async fn cleanup_expired(&self) -> Result<u64, MagicLinkError> {
        Ok(self.repo.delete_expired(Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxMagicLinkRepository;
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_service() -> MagicLinkService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        MagicLinkService::new(
            &AuthConfig::default(),
            "https://me.example.com/",
            SqlxMagicLinkRepository::boxed(pool),
        )
    }

    fn offline_service(secret: &str) -> MagicLinkService {
        struct NoRepo;

        #[async_trait::async_trait]
        impl MagicLinkRepository for NoRepo {
            async fn mark_used(&self, _: &str, _: &str, _: DateTime<Utc>) -> anyhow::Result<bool> {
                Ok(true)
            }
            async fn delete_expired(&self, _: DateTime<Utc>) -> anyhow::Result<u64> {
                Ok(0)
            }
        }

        let auth = AuthConfig {
            secret: secret.to_string(),
            ..Default::default()
        };
        MagicLinkService::new(&auth, "http://localhost:8080", Arc::new(NoRepo))
    }

    fn segment(value: &serde_json::Value) -> String {
        BASE64URL_NOPAD.encode(value.to_string().as_bytes())
    }

    #[test]
    fn test_issue_and_verify() {
        let service = offline_service("a-secret-that-is-long-enough-for-tests");
        let link = service.issue("  Me@Example.COM ").unwrap();

        assert_eq!(link.token.split('.').count(), 3);
        assert!(!link.token.contains('='));
        assert!(link.url.starts_with("http://localhost:8080/api/v1/auth/verify?token="));

        let claims = service.verify(&link.token).unwrap();
        assert_eq!(claims.sub, "me@example.com");
        assert_eq!(claims.purpose, MAGIC_LINK_PURPOSE);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.expires_at().timestamp(), link.expires_at.timestamp());
    }

    #[test]
    fn test_each_link_has_unique_id() {
        let service = offline_service("a-secret-that-is-long-enough-for-tests");
        let a = service.verify(&service.issue("me@example.com").unwrap().token).unwrap();
        let b = service.verify(&service.issue("me@example.com").unwrap().token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_at_exact_boundary() {
        let service = offline_service("a-secret-that-is-long-enough-for-tests");
        let issued = Utc::now() - Duration::minutes(20);
        let link = service.issue_at("me@example.com", issued).unwrap();

        assert!(matches!(service.verify(&link.token), Err(MagicLinkError::Expired)));

        let boundary = issued + Duration::minutes(15);
        assert!(matches!(
            service.verify_at(&link.token, boundary),
            Err(MagicLinkError::Expired)
        ));
        assert!(service
            .verify_at(&link.token, boundary - Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = offline_service("a-secret-that-is-long-enough-for-tests");
        let other = offline_service("another-secret-that-is-long-enough!!");
        let link = issuer.issue("me@example.com").unwrap();

        assert!(matches!(other.verify(&link.token), Err(MagicLinkError::InvalidSignature)));
    }

    #[test]
    fn test_malformed_tokens() {
        let service = offline_service("a-secret-that-is-long-enough-for-tests");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(
                matches!(service.verify(token), Err(MagicLinkError::Malformed)),
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let service = offline_service("a-secret-that-is-long-enough-for-tests");
        let header = segment(&serde_json::json!({"alg": "none", "typ": "JWT"}));
        let claims = segment(&serde_json::json!({
            "sub": "me@example.com", "purpose": "magic_link",
            "iat": 0, "exp": i64::MAX, "jti": "x"
        }));
        let token = format!("{}.{}.", header, claims);

        assert!(matches!(
            service.verify(&token),
            Err(MagicLinkError::UnsupportedAlgorithm(alg)) if alg == "none"
        ));
    }

    #[test]
    fn test_wrong_purpose_rejected() {
        let service = offline_service("a-secret-that-is-long-enough-for-tests");
        let now = Utc::now();
        let claims = MagicLinkClaims {
            sub: "me@example.com".to_string(),
            purpose: "password_reset".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(5)).timestamp(),
            jti: "j".to_string(),
        };
        let token = service.sign(&claims).unwrap();

        assert!(matches!(service.verify(&token), Err(MagicLinkError::WrongPurpose)));
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let service = setup_test_service().await;
        let link = service.issue("me@example.com").unwrap();
        assert!(link.url.starts_with("https://me.example.com/api/v1/auth/verify?token="));

        let claims = service.consume(&link.token).await.unwrap();
        assert_eq!(claims.sub, "me@example.com");

        assert!(matches!(
            service.consume(&link.token).await,
            Err(MagicLinkError::AlreadyUsed)
        ));
        // Verification alone does not look at redemption state
        assert!(service.verify(&link.token).is_ok());
    }

    #[tokio::test]
    async fn test_consume_rejects_expired_before_recording() {
        let service = setup_test_service().await;
        let link = service
            .issue_at("me@example.com", Utc::now() - Duration::hours(1))
            .unwrap();
        assert!(matches!(service.consume(&link.token).await, Err(MagicLinkError::Expired)));
        assert_eq!(service.cleanup_expired().await.unwrap(), 0);
    }

    const TOKEN_ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.";

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_single_character_change_is_rejected(pos in any::<prop::sample::Index>(), pick in any::<prop::sample::Index>()) {
            let service = offline_service("a-secret-that-is-long-enough-for-tests");
            let token = service.issue("me@example.com").unwrap().token;

            let mut bytes = token.into_bytes();
            let i = pos.index(bytes.len());
            let original = bytes[i];
            let mut replacement = TOKEN_ALPHABET[pick.index(TOKEN_ALPHABET.len())];
            if replacement == original {
                replacement = if original == b'A' { b'B' } else { b'A' };
            }
            bytes[i] = replacement;

            let tampered = String::from_utf8(bytes).unwrap();
            prop_assert!(service.verify(&tampered).is_err());
        }

        #[test]
        fn subject_is_normalized(local in "[A-Za-z0-9]{1,12}", domain in "[A-Za-z]{1,12}") {
            let service = offline_service("a-secret-that-is-long-enough-for-tests");
            let email = format!(" {}@{}.Com ", local, domain);
            let claims = service.verify(&service.issue(&email).unwrap().token).unwrap();
            prop_assert_eq!(claims.sub, email.trim().to_lowercase());
        }
    }
}
