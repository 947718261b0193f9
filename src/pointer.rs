//! JSON Pointer (RFC 6901) traversal over decoded documents.

use serde_json::Value;
use thiserror::Error;

/// Errors from resolving a JSON Pointer fragment.
#[derive(Debug, Error)]
pub enum PointerError {
    #[error("unsupported fragment (must be JSON Pointer)")]
    NotAPointer,

    #[error("pointer not found: {token:?}")]
    NotFound { token: String },

    #[error("pointer '-' is not valid for array lookup")]
    AppendToken,

    #[error("array index out of range: {token:?}")]
    IndexOutOfRange { token: String },

    #[error("pointer traversed non-container")]
    NonContainer,
}

/// Resolves a JSON Pointer `fragment` (the substring after `#`) against `doc`.
///
/// An empty fragment addresses the whole document. Tokens are unescaped per
/// RFC 6901 (`~1` to `/`, then `~0` to `~`). Object lookups require the key
/// to exist; array lookups require an in-range decimal index, and the `-`
/// append token is rejected.
pub fn resolve_pointer<'a>(doc: &'a Value, fragment: &str) -> Result<&'a Value, PointerError> {
    if fragment.is_empty() {
        return Ok(doc);
    }
    let Some(rest) = fragment.strip_prefix('/') else {
        return Err(PointerError::NotAPointer);
    };

    let mut current = doc;
    for raw in rest.split('/') {
        let token = raw.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map
                .get(&token)
                .ok_or(PointerError::NotFound { token: token.clone() })?,
            Value::Array(items) => {
                if token == "-" {
                    return Err(PointerError::AppendToken);
                }
                let index: usize = token
                    .parse()
                    .map_err(|_| PointerError::IndexOutOfRange {
                        token: token.clone(),
                    })?;
                items.get(index).ok_or(PointerError::IndexOutOfRange {
                    token: token.clone(),
                })?
            }
            _ => return Err(PointerError::NonContainer),
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_fragment_returns_document() {
        let doc = json!({"a": 1});
        assert_eq!(resolve_pointer(&doc, "").unwrap(), &doc);
    }

    #[test]
    fn object_traversal() {
        let doc = json!({"schemas": {"Thing": {"type": "object"}}});
        let value = resolve_pointer(&doc, "/schemas/Thing").unwrap();
        assert_eq!(value, &json!({"type": "object"}));
    }

    #[test]
    fn array_traversal() {
        let doc = json!({"items": [10, 20, 30]});
        assert_eq!(resolve_pointer(&doc, "/items/1").unwrap(), &json!(20));
    }

    #[test]
    fn escaped_tokens() {
        let doc = json!({"a/b": 1, "m~n": 2, "~1": 3});
        assert_eq!(resolve_pointer(&doc, "/a~1b").unwrap(), &json!(1));
        assert_eq!(resolve_pointer(&doc, "/m~0n").unwrap(), &json!(2));
        // "~01" unescapes to "~1" (the ~1 pass must run before ~0).
        assert_eq!(resolve_pointer(&doc, "/~01").unwrap(), &json!(3));
    }

    #[test]
    fn missing_key() {
        let doc = json!({"a": 1});
        assert!(matches!(
            resolve_pointer(&doc, "/b"),
            Err(PointerError::NotFound { token }) if token == "b"
        ));
    }

    #[test]
    fn append_token_rejected() {
        let doc = json!([1, 2]);
        assert!(matches!(
            resolve_pointer(&doc, "/-"),
            Err(PointerError::AppendToken)
        ));
    }

    #[test]
    fn index_out_of_range() {
        let doc = json!([1, 2]);
        assert!(matches!(
            resolve_pointer(&doc, "/5"),
            Err(PointerError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            resolve_pointer(&doc, "/-1"),
            Err(PointerError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn traversal_through_scalar_fails() {
        let doc = json!({"a": 1});
        assert!(matches!(
            resolve_pointer(&doc, "/a/b"),
            Err(PointerError::NonContainer)
        ));
    }

    #[test]
    fn fragment_without_leading_slash_rejected() {
        let doc = json!({"a": 1});
        assert!(matches!(
            resolve_pointer(&doc, "a"),
            Err(PointerError::NotAPointer)
        ));
    }
}
