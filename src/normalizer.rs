//! Deterministic schema normalization for the compatibility profile.
//!
//! Normalization rewrites a schema into a canonical form: `$ref` inlined,
//! `allOf` flattened, annotations and `$defs` stripped, `type`/`required`
//! sorted, and union variants ordered by their canonical JSON bytes. The
//! compatibility deciders run on this form only.

use std::collections::HashSet;

use serde_json::{Map, Value};
use url::Url;

use crate::allof;
use crate::canonical;
use crate::compat;
use crate::error::{NormalizeError, RefCause};
use crate::pointer::resolve_pointer;
use crate::profile::{self, join_path, path_or_root};

/// Provides bytes for external `$ref` targets.
///
/// The core ships no filesystem or HTTP implementation; tools own IO. The
/// `remote` feature's `HttpFetcher` is one implementation.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Normalizes schemas deterministically per the compatibility profile (v0.1)
/// and answers directional compatibility questions.
///
/// A `Normalizer` holds the `$ref` cycle state for the duration of a call, so
/// every public operation takes `&mut self`; the state is reset at the start
/// of each call. Create separate instances for concurrent use.
pub struct Normalizer<'a> {
    root: Option<&'a Value>,
    base: Option<Url>,
    fetcher: Option<&'a dyn Fetcher>,
    ref_stack: HashSet<String>,
}

impl<'a> Normalizer<'a> {
    pub fn new() -> Self {
        Self {
            root: None,
            base: None,
            fetcher: None,
            ref_stack: HashSet::new(),
        }
    }

    /// Sets the containing document against which fragment-only `$ref`s
    /// (e.g. `#/schemas/Foo`) resolve. Without it, fragment-only refs fail.
    pub fn with_root(mut self, root: &'a Value) -> Self {
        self.root = Some(root);
        self
    }

    /// Sets the base URL against which relative `$ref`s resolve. Without it,
    /// relative refs fail.
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Sets the fetcher used for external `$ref`s. Without it, external refs
    /// fail.
    pub fn with_fetcher(mut self, fetcher: &'a dyn Fetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Returns a normalized copy of `schema`. The input is not mutated.
    ///
    /// `Null` is treated as the absent schema and normalizes to Top (`{}`).
    pub fn normalize(&mut self, schema: &Value) -> Result<Value, NormalizeError> {
        self.ref_stack.clear();
        self.normalize_at(schema, "")
    }

    /// Reports whether `candidate` can stand in for `target` as an input
    /// (writer) contract: the candidate must accept every instance the
    /// target accepts.
    pub fn input_compatible(
        &mut self,
        target: &Value,
        candidate: &Value,
    ) -> Result<bool, NormalizeError> {
        self.ref_stack.clear();
        let target = self.normalize_at(target, "")?;
        let candidate = self.normalize_at(candidate, "")?;
        compat::input_compatible(&target, &candidate)
    }

    /// Reports whether `candidate` can stand in for `target` as an output
    /// (reader) contract: every instance the candidate emits must be
    /// acceptable to the target.
    pub fn output_compatible(
        &mut self,
        target: &Value,
        candidate: &Value,
    ) -> Result<bool, NormalizeError> {
        self.ref_stack.clear();
        let target = self.normalize_at(target, "")?;
        let candidate = self.normalize_at(candidate, "")?;
        compat::output_compatible(&target, &candidate)
    }

    pub(crate) fn normalize_at(
        &mut self,
        schema: &Value,
        path: &str,
    ) -> Result<Value, NormalizeError> {
        let map = match schema {
            // Absent schema is Top.
            Value::Null => return Ok(Value::Object(Map::new())),
            Value::Object(map) => map,
            _ => {
                return Err(NormalizeError::Shape {
                    path: path_or_root(path).to_string(),
                    message: "schema must be an object".to_string(),
                })
            }
        };
        self.normalize_map(map, path)
    }

    fn normalize_map(
        &mut self,
        schema: &Map<String, Value>,
        path: &str,
    ) -> Result<Value, NormalizeError> {
        profile::assert_profile_keywords(schema, path)?;

        // Inline $ref. Sibling keys are not part of the profile's $ref
        // semantics; inlining replaces the whole object.
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if !reference.trim().is_empty() {
                let (resolved, key) = self.resolve_ref(reference, path)?;
                if !resolved.is_object() {
                    self.ref_stack.remove(&key);
                    return Err(NormalizeError::Ref {
                        path: path_or_root(path).to_string(),
                        reference: reference.to_string(),
                        cause: RefCause::NotAnObject,
                    });
                }
                // The ref stays on the stack while its target normalizes so
                // recursive $refs inside the target surface as cycles; it is
                // removed on every exit path.
                let result = self.normalize_at(&resolved, path);
                self.ref_stack.remove(&key);
                return result;
            }
        }

        // Strip annotation-only keywords and $defs. $defs only feeds $ref
        // resolution and is dead weight after inlining.
        let mut out = Map::new();
        for (key, value) in schema {
            if profile::ANNOTATION_KEYWORDS.contains(&key.as_str()) || key == "$defs" {
                continue;
            }
            out.insert(key.clone(), value.clone());
        }

        // Flatten allOf before anything else; the merged schema replaces
        // this one and is re-normalized from the top.
        if let Some(all_of) = out.get("allOf") {
            let merged = allof::flatten(self, all_of, path)?;
            return self.normalize_map(&merged, path);
        }

        if let Some(value) = out.get("type") {
            let types = profile::normalize_type(value).map_err(|message| NormalizeError::Shape {
                path: format!("{}.type", path_or_root(path)),
                message,
            })?;
            out.insert("type".to_string(), types);
        }

        if let Some(value) = out.get("required") {
            let required =
                profile::normalize_string_set(value).map_err(|message| NormalizeError::Shape {
                    path: format!("{}.required", path_or_root(path)),
                    message,
                })?;
            out.insert("required".to_string(), required);
        }

        // Recurse into nested schemas.
        if let Some(value) = out.remove("properties") {
            let Value::Object(props) = value else {
                return Err(NormalizeError::Shape {
                    path: format!("{}.properties", path_or_root(path)),
                    message: "must be object".to_string(),
                });
            };
            let mut normalized = Map::new();
            for (name, prop) in &props {
                if !prop.is_object() {
                    return Err(NormalizeError::Shape {
                        path: format!("{}.properties[{name:?}]", path_or_root(path)),
                        message: "must be object".to_string(),
                    });
                }
                let child_path = join_path(path, &format!("properties[{name:?}]"));
                normalized.insert(name.clone(), self.normalize_at(prop, &child_path)?);
            }
            out.insert("properties".to_string(), Value::Object(normalized));
        }

        if let Some(value) = out.remove("additionalProperties") {
            let normalized = match value {
                Value::Bool(allowed) => Value::Bool(allowed),
                Value::Object(_) => {
                    self.normalize_at(&value, &join_path(path, "additionalProperties"))?
                }
                _ => {
                    return Err(NormalizeError::Shape {
                        path: format!("{}.additionalProperties", path_or_root(path)),
                        message: "must be boolean or object".to_string(),
                    })
                }
            };
            out.insert("additionalProperties".to_string(), normalized);
        }

        if let Some(value) = out.remove("items") {
            if !value.is_object() {
                return Err(NormalizeError::Shape {
                    path: format!("{}.items", path_or_root(path)),
                    message: "must be object".to_string(),
                });
            }
            let normalized = self.normalize_at(&value, &join_path(path, "items"))?;
            out.insert("items".to_string(), normalized);
        }

        // Normalize union variants, then order them by canonical JSON so the
        // variant order is deterministic regardless of authoring order.
        for union_key in ["oneOf", "anyOf"] {
            let Some(value) = out.remove(union_key) else {
                continue;
            };
            let Value::Array(items) = value else {
                return Err(NormalizeError::Shape {
                    path: format!("{}.{union_key}", path_or_root(path)),
                    message: "must be array".to_string(),
                });
            };
            let mut variants = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if !item.is_object() {
                    return Err(NormalizeError::Shape {
                        path: format!("{}.{union_key}[{index}]", path_or_root(path)),
                        message: "must be object".to_string(),
                    });
                }
                let child_path = join_path(path, &format!("{union_key}[{index}]"));
                let normalized = self.normalize_at(item, &child_path)?;
                let canon = canonical::canonical_string(&normalized).map_err(|source| {
                    NormalizeError::Canonicalize {
                        path: format!("{}.{union_key}", path_or_root(path)),
                        source,
                    }
                })?;
                variants.push((canon, normalized));
            }
            variants.sort_by(|a, b| a.0.cmp(&b.0));
            out.insert(
                union_key.to_string(),
                Value::Array(variants.into_iter().map(|(_, v)| v).collect()),
            );
        }

        Ok(Value::Object(out))
    }

    /// Resolves a `$ref` and pushes its absolute key onto the cycle stack.
    ///
    /// The caller must remove the returned key from the stack once it is
    /// done with the resolved target, on every exit path; this keeps cycle
    /// state scoped to one top-level call.
    pub(crate) fn resolve_ref(
        &mut self,
        reference: &str,
        path: &str,
    ) -> Result<(Value, String), NormalizeError> {
        let ref_error = |cause: RefCause| NormalizeError::Ref {
            path: path_or_root(path).to_string(),
            reference: reference.to_string(),
            cause,
        };

        enum Target {
            // Fragment-only ref, resolved against the configured root.
            Root(String),
            // Absolute URL, fetched through the configured fetcher.
            External(Url),
        }

        let target = match Url::parse(reference) {
            Ok(url) => Target::External(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                if let Some(fragment) = reference.strip_prefix('#') {
                    Target::Root(fragment.to_string())
                } else {
                    let Some(base) = &self.base else {
                        return Err(ref_error(RefCause::NoBase));
                    };
                    let url = base
                        .join(reference)
                        .map_err(|source| ref_error(RefCause::Parse { source }))?;
                    Target::External(url)
                }
            }
            Err(source) => return Err(ref_error(RefCause::Parse { source })),
        };

        let key = match &target {
            Target::Root(fragment) => format!("#{fragment}"),
            Target::External(url) => url.to_string(),
        };

        // Cycle detection: a ref already being resolved on this stack is a
        // cycle.
        if self.ref_stack.contains(&key) {
            return Err(ref_error(RefCause::Cycle));
        }
        self.ref_stack.insert(key.clone());

        let resolved = (|| -> Result<Value, RefCause> {
            let fetched;
            let (doc, fragment): (&Value, &str) = match &target {
                Target::Root(fragment) => {
                    let root = self.root.ok_or(RefCause::NoRoot)?;
                    (root, fragment.as_str())
                }
                Target::External(url) => {
                    let fetcher = self.fetcher.ok_or(RefCause::NoFetcher)?;
                    let bytes = fetcher.fetch(url).map_err(|err| RefCause::Fetch {
                        message: err.to_string(),
                    })?;
                    fetched = decode_document(&bytes)?;
                    (&fetched, url.fragment().unwrap_or(""))
                }
            };
            Ok(resolve_pointer(doc, fragment)?.clone())
        })();

        match resolved {
            Ok(value) => Ok((value, key)),
            Err(cause) => {
                self.ref_stack.remove(&key);
                Err(ref_error(cause))
            }
        }
    }

    /// Pops a key pushed by [`Normalizer::resolve_ref`].
    pub(crate) fn remove_ref(&mut self, key: &str) {
        self.ref_stack.remove(key);
    }
}

impl Default for Normalizer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a fetched document, rejecting trailing data after the root value.
fn decode_document(bytes: &[u8]) -> Result<Value, RefCause> {
    let mut stream = serde_json::Deserializer::from_slice(bytes).into_iter::<Value>();
    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(source)) => return Err(RefCause::InvalidJson { source }),
        None => return Err(RefCause::EmptyDocument),
    };
    if stream.next().is_some() {
        return Err(RefCause::TrailingData);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_schema_is_top() {
        let mut normalizer = Normalizer::new();
        assert_eq!(normalizer.normalize(&Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn non_object_schema_is_a_shape_error() {
        let mut normalizer = Normalizer::new();
        let err = normalizer.normalize(&json!("string")).unwrap_err();
        assert!(matches!(err, NormalizeError::Shape { .. }));
    }

    #[test]
    fn annotations_and_defs_are_stripped() {
        let mut normalizer = Normalizer::new();
        let out = normalizer
            .normalize(&json!({
                "type": "string",
                "title": "A string",
                "description": "doc",
                "default": "x",
                "$defs": {"Unused": {"type": "number"}}
            }))
            .unwrap();
        assert_eq!(out, json!({"type": ["string"]}));
    }

    #[test]
    fn type_and_required_are_sorted_unique() {
        let mut normalizer = Normalizer::new();
        let out = normalizer
            .normalize(&json!({
                "type": ["string", "null"],
                "required": ["b", "a", "b"]
            }))
            .unwrap();
        assert_eq!(out["type"], json!(["null", "string"]));
        assert_eq!(out["required"], json!(["a", "b"]));
    }

    #[test]
    fn nested_schemas_are_normalized() {
        let mut normalizer = Normalizer::new();
        let out = normalizer
            .normalize(&json!({
                "type": "object",
                "properties": {"id": {"type": "string", "title": "drop me"}},
                "additionalProperties": {"type": "number"},
                "items": {"type": "integer"}
            }))
            .unwrap();
        assert_eq!(out["properties"]["id"], json!({"type": ["string"]}));
        assert_eq!(out["additionalProperties"], json!({"type": ["number"]}));
        assert_eq!(out["items"], json!({"type": ["integer"]}));
    }

    #[test]
    fn ref_keeps_stack_entry_while_target_normalizes() {
        // #/a -> #/a is the smallest cycle: the inner resolution must see the
        // outer entry still on the stack.
        let root = json!({"a": {"$ref": "#/a"}});
        let mut normalizer = Normalizer::new().with_root(&root);
        let err = normalizer.normalize(&json!({"$ref": "#/a"})).unwrap_err();
        match err {
            NormalizeError::Ref { cause, .. } => {
                assert!(matches!(cause, RefCause::Cycle));
            }
            other => panic!("expected RefError, got {other:?}"),
        }
    }

    #[test]
    fn sibling_refs_to_the_same_target_are_not_a_cycle() {
        let root = json!({"s": {"type": "string"}});
        let mut normalizer = Normalizer::new().with_root(&root);
        let out = normalizer
            .normalize(&json!({
                "type": "object",
                "properties": {
                    "a": {"$ref": "#/s"},
                    "b": {"$ref": "#/s"}
                }
            }))
            .unwrap();
        assert_eq!(out["properties"]["a"], json!({"type": ["string"]}));
        assert_eq!(out["properties"]["b"], json!({"type": ["string"]}));
    }

    #[test]
    fn fragment_ref_without_root_fails() {
        let mut normalizer = Normalizer::new();
        let err = normalizer.normalize(&json!({"$ref": "#/a"})).unwrap_err();
        match err {
            NormalizeError::Ref { cause, .. } => assert!(matches!(cause, RefCause::NoRoot)),
            other => panic!("expected RefError, got {other:?}"),
        }
    }

    #[test]
    fn ref_to_non_object_fails() {
        let root = json!({"a": "not a schema"});
        let mut normalizer = Normalizer::new().with_root(&root);
        let err = normalizer.normalize(&json!({"$ref": "#/a"})).unwrap_err();
        match err {
            NormalizeError::Ref { cause, .. } => assert!(matches!(cause, RefCause::NotAnObject)),
            other => panic!("expected RefError, got {other:?}"),
        }
    }

    #[test]
    fn decode_document_rejects_trailing_data() {
        assert!(matches!(
            decode_document(b"{} extra"),
            Err(RefCause::TrailingData)
        ));
        assert!(matches!(decode_document(b""), Err(RefCause::EmptyDocument)));
        assert_eq!(decode_document(b" {\"a\": 1} ").unwrap(), json!({"a": 1}));
    }
}
