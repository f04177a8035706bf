//! Data models
//!
//! Database entities for the portfolio (singleton content, projects,
//! articles, certifications, users, sessions) and the request inputs that
//! create or change them.

mod article;
mod certification;
mod content;
mod project;
mod session;
mod status;
mod user;

pub use article::{Article, CreateArticleInput, ListParams, PagedResult, UpdateArticleInput};
pub use certification::{Certification, CreateCertificationInput, UpdateCertificationInput};
pub use content::{AboutContent, HomeContent, UpdateAboutInput, UpdateHomeInput};
pub use project::{CreateProjectInput, Project, UpdateProjectInput};
pub use session::Session;
pub use status::PublishStatus;
pub use user::{UpdateProfileInput, User, UserRole};
