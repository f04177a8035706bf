//! Rendering errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// No embedded template with this name
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template failed to parse or render
    #[error("Template error: {0}")]
    TemplateError(String),
}
