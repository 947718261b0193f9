//! Toolkit for bindspec interface-binding documents.
//!
//! This library provides the pieces tooling needs to work with bindspec
//! interface documents:
//!
//! - **Canonical JSON** ([`canonical`]): deterministic RFC 8785 (JCS) bytes
//!   for any JSON value. This is the equality primitive used for hashing,
//!   golden tests, and schema comparison.
//! - **Schema compatibility profile** ([`Normalizer`]): deterministic
//!   normalization of a restricted JSON Schema subset ($ref inlining, allOf
//!   flattening, canonical ordering) plus directional compatibility checks.
//! - **Document model** ([`Interface`] and friends): typed document shapes
//!   with lossless round-tripping of extension (`x-*`) and unknown fields.
//! - **Shape validation** ([`ValidateOptions`]): reference-integrity and
//!   structural checks over documents, deliberately not JSON Schema
//!   validation.
//!
//! # Example
//!
//! ```
//! use bindspec::Normalizer;
//! use serde_json::json;
//!
//! // An integer-typed target is accepted by a number-typed candidate when
//! // the candidate acts as the input (writer) side.
//! let target = json!({"type": "integer"});
//! let candidate = json!({"type": "number"});
//!
//! let mut normalizer = Normalizer::new();
//! assert!(normalizer.input_compatible(&target, &candidate).unwrap());
//! assert!(!normalizer.output_compatible(&target, &candidate).unwrap());
//! ```
//!
//! # Compatibility directions
//!
//! | Direction | Question |
//! |-----------|----------|
//! | input     | Does the candidate accept every instance the target accepts? |
//! | output    | Is every instance the candidate emits acceptable to the target? |
//!
//! An input-compatible candidate may accept *more* than the target (be more
//! permissive); an output-compatible candidate may emit *less* (be more
//! restrictive).

mod allof;
pub mod canonical;
mod compat;
pub mod document;
pub mod error;
pub mod loader;
mod normalizer;
mod pointer;
mod profile;
pub mod token;
mod validator;
pub mod version;

pub use canonical::{canonical_string, canonicalize, canonicalize_bytes};
pub use document::{
    BindingEntry, Interface, JsonSchema, Lossless, Operation, OperationExample, OperationKind,
    Satisfies, Source, Transform, TransformOrRef, TRANSFORM_REF_PREFIX,
};
pub use error::{
    CanonicalizeError, LoadError, NormalizeError, RefCause, TokenError, ValidationError,
    VersionError,
};
#[cfg(feature = "remote")]
pub use loader::{load_json_url, HttpFetcher};
pub use loader::{
    is_url, load_document, load_document_str, load_json, load_json_auto, load_json_str,
};
pub use normalizer::{Fetcher, Normalizer};
pub use pointer::{resolve_pointer, PointerError};
pub use profile::{ANNOTATION_KEYWORDS, IN_SCOPE_KEYWORDS};
pub use token::FormatToken;
pub use validator::ValidateOptions;
