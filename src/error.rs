use std::fmt;

use serde::{Deserialize, Serialize};

/// A request that was rejected before any backend call was made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("pages_count must be between 1 and 50 (got {0})")]
    PagesCountOutOfRange(u32),

    #[error("max_tokens must be between 100 and 2000 (got {0})")]
    MaxTokensOutOfRange(u32),

    #[error("unknown style {0:?}. expected one of: educational, marketing, technical")]
    UnknownStyle(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    RateLimited,
    Timeout,
    InvalidResponse,
    AuthFailure,
    Unknown,
}

impl BackendErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
            Self::AuthFailure => "auth_failure",
            Self::Unknown => "unknown",
        }
    }

    /// Transient failures that a later attempt may get past.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout)
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::RateLimited, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidResponse, message)
    }

    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::AuthFailure, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unknown, message)
    }
}

/// The first slot failure of one site; the site produces no bundle.
#[derive(Debug, Clone, thiserror::Error)]
#[error("slot {slot} failed: {source}")]
pub struct AssemblyError {
    pub slot: String,
    #[source]
    pub source: BackendError,
}

impl AssemblyError {
    pub fn new(slot: impl Into<String>, source: BackendError) -> Self {
        Self {
            slot: slot.into(),
            source,
        }
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.source.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("section catalog has no entries for style {0}")]
    MissingStyle(String),

    #[error("section catalog for style {style} has {len} entries; at least {min} are required")]
    TooFewSections {
        style: String,
        len: usize,
        min: usize,
    },

    #[error("section catalog for style {style} repeats section id {id:?}")]
    DuplicateSection { style: String, id: String },
}
