// Custom error types for the pipeline and its collaborators
//
// Using thiserror for ergonomic error definitions with context
// preservation and source error chaining.

use thiserror::Error;

use crate::core::types::PageStatus;

/// Page-level pipeline errors. All of these are terminal for the page
/// (status → error) and none of them abort the batch.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to decode image payload: {0}")]
    Decode(#[source] image::ImageError),

    #[error("detection/translation failed: {0}")]
    Inference(#[source] anyhow::Error),

    #[error("rendering failed: {0}")]
    Render(#[source] anyhow::Error),

    #[error("store update failed: {0}")]
    Store(#[from] StoreError),
}

/// Store boundary errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("duplicate {kind} key: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("invalid status transition for page {page_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        page_id: String,
        from: PageStatus,
        to: PageStatus,
    },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Configuration errors, surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("transformer URL must not be empty (set TRANSFORMER_URL)")]
    MissingTransformerUrl,

    #[error("font directory does not exist: {0}")]
    InvalidFontDir(String),

    #[error("font size must be in [6.0, 72.0], got {0}")]
    InvalidFontSize(f32),

    #[error("history limit must be > 0, got {0}")]
    InvalidHistoryLimit(usize),

    #[error("upload body limit must be > 0, got {0}")]
    InvalidBodyLimit(usize),
}

// Convenience type aliases for Results
pub type PageResult<T> = Result<T, PageError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
