//! Error types shared across Slidecast crates.
//!
//! Every variant is fatal to a conversion. Non-fatal anomalies are logged
//! where they are detected and never surface as errors.

use std::path::PathBuf;

use crate::time::TimeParseError;

/// Top-level error type for Slidecast operations.
#[derive(Debug, thiserror::Error)]
pub enum SlidecastError {
    /// Malformed time value or metadata.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Missing or unreadable source, credit, or backdrop file.
    #[error("Asset error at {path}: {message}")]
    Asset { path: PathBuf, message: String },

    /// Degenerate fit box or source size.
    #[error("Geometry error: {message}")]
    Geometry { message: String },

    /// Rasterizer failure.
    #[error("Render error: {message}")]
    Render { message: String },

    /// Timeline library failure during placement or save.
    #[error("Timeline library error: {message}")]
    Library { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SlidecastError.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

impl SlidecastError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn asset(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Asset {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn library(msg: impl Into<String>) -> Self {
        Self::Library {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Prefix the message with `context`, keeping the error category.
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Parse { message } => Self::parse(format!("{context}: {message}")),
            Self::Asset { path, message } => Self::asset(path, format!("{context}: {message}")),
            Self::Geometry { message } => Self::geometry(format!("{context}: {message}")),
            Self::Render { message } => Self::render(format!("{context}: {message}")),
            Self::Library { message } => Self::library(format!("{context}: {message}")),
            Self::Config { message } => Self::config(format!("{context}: {message}")),
            Self::Io(err) => Self::Io(std::io::Error::new(err.kind(), format!("{context}: {err}"))),
            Self::Json(err) => Self::parse(format!("{context}: {err}")),
            Self::Other(err) => Self::Other(err.context(context.to_string())),
        }
    }
}

impl From<TimeParseError> for SlidecastError {
    fn from(err: TimeParseError) -> Self {
        Self::parse(err.to_string())
    }
}
