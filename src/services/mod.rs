//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They:
//! - validate input and apply business rules
//! - render Markdown once, on save
//! - cache public reads and invalidate on writes
//! - run sign-in and uploads

pub mod article;
pub mod auth;
pub mod certification;
pub mod content;
pub mod email;
pub mod magic_link;
pub mod markdown;
pub mod project;
pub mod rate_limiter;
pub mod slug;
pub mod storage;
pub mod upload;

pub use article::ArticleService;
pub use auth::{normalize_email, AuthService, AuthServiceError};
pub use certification::CertificationService;
pub use content::{ContentService, ContentServiceError};
pub use email::{create_mailer, LogMailer, Mailer, SignInMail, SmtpMailer};
pub use magic_link::{IssuedLink, MagicLinkClaims, MagicLinkError, MagicLinkService};
pub use markdown::MarkdownRenderer;
pub use project::ProjectService;
pub use rate_limiter::SignInRateLimiter;
pub use slug::{generate_slug, is_valid_slug};
pub use storage::{create_store, ObjectStore, StorageError, StorageUrls};
pub use upload::{UploadError, UploadService, UploadedImage};
