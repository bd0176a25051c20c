//! Error types for the groupsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.
//!
//! Only construction-time failures live here. Per-group and per-member
//! findings (orphaned references, unresolved ids) are data in the
//! reconciliation report, never errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{LocalId, RemoteId};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration and groups-file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML or JSON parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Canvas API errors
// ---------------------------------------------------------------------------

/// Errors from Canvas REST API interactions.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("Canvas HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("Canvas API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Access token is missing or was rejected.
    #[error("Canvas authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("Canvas rate limit exceeded (remaining quota {remaining})")]
    RateLimited { remaining: String },

    /// JSON deserialization failure.
    #[error("Canvas response parse error: {0}")]
    ParseError(String),

    /// A pagination link pointed outside the configured Canvas instance.
    #[error("refusing to follow pagination link outside {api_url}: {url}")]
    ForeignNextLink { api_url: String, url: String },
}

// ---------------------------------------------------------------------------
// Source errors
// ---------------------------------------------------------------------------

/// Failure of a student or group source. Always fatal for the run.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not deliver the requested data.
    #[error("{resource} unavailable: {detail}")]
    Unavailable { resource: String, detail: String },
}

impl SourceError {
    pub fn unavailable(resource: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            resource: resource.into(),
            detail: detail.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors from building the local <-> remote identifier map.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Two records claim the same local id.
    #[error("duplicate local id '{local_id}' (mapped to both {first} and {second})")]
    DuplicateLocalId {
        local_id: LocalId,
        first: RemoteId,
        second: RemoteId,
    },

    /// Two records claim the same remote id.
    #[error("duplicate remote id {remote_id} (mapped to both '{first}' and '{second}')")]
    DuplicateRemoteId {
        remote_id: RemoteId,
        first: LocalId,
        second: LocalId,
    },

    /// The cache missed and the student source failed as well.
    #[error("student source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

/// Errors from persisting the identifier cache. Callers log these; they
/// never abort a run.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Snapshot could not be serialized.
    #[error("identifier cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Snapshot could not be written to its final location.
    #[error("identifier cache write failed at '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// Generic I/O error.
    #[error("identifier cache I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

/// Errors from fetching the remote group catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The group source failed.
    #[error("group source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    /// The source reported the same group id twice.
    #[error("group {0} reported more than once by the group source")]
    DuplicateGroup(RemoteId),
}

impl From<CanvasError> for SourceError {
    fn from(err: CanvasError) -> Self {
        SourceError::unavailable("Canvas", err)
    }
}
