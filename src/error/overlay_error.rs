//! Overlay-level error types.

use std::path::PathBuf;

use crate::dsl::validation::ValidationReport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("DSL parse error: {0}")]
    DslParseError(String),
    #[error("Undefined anchor: *{0}")]
    UndefinedAnchor(String),
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Domain not found: {0}")]
    DomainNotFound(String),
    #[error("Validation failed with {} error(s)", .0.errors().len())]
    ValidationFailed(Box<ValidationReport>),
    #[error("Emit error: {0}")]
    EmitError(String),
}

impl OverlayError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OverlayError::Io {
            path: path.into(),
            source,
        }
    }

    /// The report carried by a validation failure.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            OverlayError::ValidationFailed(report) => Some(report),
            _ => None,
        }
    }
}
