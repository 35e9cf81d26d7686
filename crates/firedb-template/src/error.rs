//! Template error types.

use thiserror::Error;

/// Errors raised while fetching or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template data must be a JSON object.
    #[error("template data should be an object, got {kind}")]
    NotAnObject { kind: &'static str },

    /// The target region does not exist on the page.
    #[error("placeholder '{id}' has not been found on the page")]
    PlaceholderNotFound { id: String },

    /// The template resource could not be fetched.
    #[error("template {path} has not been fetched: {message}")]
    Fetch { path: String, message: String },

    /// The template source is not valid handlebars.
    #[error("template {path} does not compile: {message}")]
    Compile { path: String, message: String },

    /// Rendering with the current data failed.
    #[error("rendering failed: {message}")]
    Render { message: String },

    /// Rendering was requested before the template was fetched.
    #[error("template {path} has not been fetched yet")]
    NotFetched { path: String },
}

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, TemplateError>;
