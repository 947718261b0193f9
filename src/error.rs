//! Error types for canonicalization, schema normalization, and document
//! validation.

use std::path::PathBuf;

use thiserror::Error;

use crate::pointer::PointerError;

/// Errors from the canonical JSON encoder.
#[derive(Debug, Error)]
pub enum CanonicalizeError {
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid JSON: empty input")]
    EmptyInput,

    #[error("invalid JSON: trailing data")]
    TrailingData,

    #[error("invalid JSON number: NaN or Infinity")]
    NonFinite,
}

impl CanonicalizeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors from schema normalization and compatibility checks.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The schema uses a keyword outside the compatibility profile.
    #[error("outside profile at {path}: keyword {keyword:?}")]
    OutsideProfile { path: String, keyword: String },

    /// A `$ref` could not be resolved.
    #[error("{path}.$ref {reference:?}: {cause}")]
    Ref {
        path: String,
        reference: String,
        #[source]
        cause: RefCause,
    },

    /// Irreconcilable schema constraints (e.g. an empty `allOf` type
    /// intersection).
    #[error("schema error at {path}: {message}")]
    Schema { path: String, message: String },

    /// A value that must be a schema component has the wrong shape.
    #[error("{path}: {message}")]
    Shape { path: String, message: String },

    /// Canonical encoding failed while ordering or comparing schema values.
    #[error("{path}: {source}")]
    Canonicalize {
        path: String,
        #[source]
        source: CanonicalizeError,
    },
}

impl NormalizeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// The underlying cause of a `$ref` resolution failure.
#[derive(Debug, Error)]
pub enum RefCause {
    #[error("invalid reference: {source}")]
    Parse {
        #[source]
        source: url::ParseError,
    },

    #[error("relative $ref with no base")]
    NoBase,

    #[error("fragment-only $ref with no root document")]
    NoRoot,

    #[error("external $ref unsupported (no fetcher)")]
    NoFetcher,

    #[error("fetch failed: {message}")]
    Fetch { message: String },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid JSON: empty document")]
    EmptyDocument,

    #[error("invalid JSON: trailing data")]
    TrailingData,

    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error("resolved $ref is not an object")]
    NotAnObject,

    #[error("cycle detected")]
    Cycle,
}

/// Errors while loading documents from files, strings, or URLs.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::Read { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::Network { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Deterministic, multi-problem document validation error.
#[derive(Debug, Error)]
#[error("invalid interface: {}", problems.join("; "))]
pub struct ValidationError {
    /// Every problem found, in a stable order.
    pub problems: Vec<String>,
}

impl ValidationError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Errors from parsing `<name>@<version>` format tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("format token: empty")]
    Empty,

    #[error("format token: invalid {token:?}")]
    Invalid { token: String },
}

/// Error for version strings that are not `MAJOR.MINOR.PATCH`.
#[derive(Debug, Error)]
#[error("invalid semver: {version:?}")]
pub struct VersionError {
    pub version: String,
}
