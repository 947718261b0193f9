//! Keyword profile (v0.1) for the schema compatibility engine.
//!
//! The profile partitions schema keys into keywords the engine interprets and
//! annotation-only keywords it strips; anything else fails closed.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::canonical;
use crate::error::NormalizeError;

/// Keywords the compatibility profile interprets.
pub const IN_SCOPE_KEYWORDS: &[&str] = &[
    "$ref",
    "$defs",
    "allOf",
    "type",
    "enum",
    "const",
    "properties",
    "required",
    "additionalProperties",
    "items",
    "oneOf",
    "anyOf",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
];

/// Keywords stripped during normalization and ignored by compatibility
/// decisions. `$schema` is allowed for JSON Schema 2020-12 documents but
/// stripped for comparison.
pub const ANNOTATION_KEYWORDS: &[&str] = &[
    "title",
    "description",
    "examples",
    "default",
    "deprecated",
    "readOnly",
    "writeOnly",
    "$schema",
];

/// Rejects any key that is neither interpreted nor annotation-only.
pub(crate) fn assert_profile_keywords(
    schema: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<(), NormalizeError> {
    for key in schema.keys() {
        if IN_SCOPE_KEYWORDS.contains(&key.as_str()) || ANNOTATION_KEYWORDS.contains(&key.as_str())
        {
            continue;
        }
        return Err(NormalizeError::OutsideProfile {
            path: path_or_root(path).to_string(),
            keyword: key.clone(),
        });
    }
    Ok(())
}

/// Displays the root path as `<root>` in error messages.
pub(crate) fn path_or_root(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// Joins a path segment onto a prefix, using `.` unless the segment already
/// carries its own punctuation (`[...]`).
pub(crate) fn join_path(prefix: &str, next: &str) -> String {
    if prefix.is_empty() {
        return next.to_string();
    }
    if next.is_empty() {
        return prefix.to_string();
    }
    if next.starts_with('[') || next.starts_with('.') {
        format!("{prefix}{next}")
    } else {
        format!("{prefix}.{next}")
    }
}

/// Canonicalizes a `type` value to a sorted array of unique non-empty
/// strings. A bare string becomes a one-element array.
pub(crate) fn normalize_type(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            Ok(Value::Array(vec![Value::String(s.clone())]))
        }
        Value::String(_) => Err("must not be empty".to_string()),
        Value::Array(items) => {
            let mut set = BTreeSet::new();
            for item in items {
                match item.as_str() {
                    Some(s) if !s.trim().is_empty() => {
                        set.insert(s.to_string());
                    }
                    _ => return Err("must be array of non-empty strings".to_string()),
                }
            }
            Ok(Value::Array(set.into_iter().map(Value::String).collect()))
        }
        _ => Err("must be string or array of strings".to_string()),
    }
}

/// Canonicalizes `required` (and other string sets) to a sorted array of
/// unique non-empty strings.
pub(crate) fn normalize_string_set(value: &Value) -> Result<Value, String> {
    let Some(items) = value.as_array() else {
        return Err("must be array".to_string());
    };
    let mut set = BTreeSet::new();
    for item in items {
        match item.as_str() {
            Some(s) if !s.trim().is_empty() => {
                set.insert(s.to_string());
            }
            _ => return Err("must contain only non-empty strings".to_string()),
        }
    }
    Ok(Value::Array(set.into_iter().map(Value::String).collect()))
}

/// Double-precision view of a JSON numeric value. Non-numeric values read as
/// 0; callers guard with presence checks before comparing.
pub(crate) fn as_f64(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// Canonical JSON string of `value`, used as a stable equivalence key for
/// enum/const comparisons and union ordering.
pub(crate) fn canonical_key(value: &Value) -> String {
    canonical::canonical_string(value).unwrap_or_else(|_| "<unserializable>".to_string())
}
