//! Typed document model with lossless JSON round-tripping.
//!
//! Documents may carry extension fields (`x-*`) at any object location and
//! unknown fields from future format versions. Every typed object preserves
//! both across a decode → encode round-trip by capturing keys its typed
//! fields do not consume. A key can never exist both as a typed field and a
//! preserved entry, so typed fields win over collisions by construction.
//!
//! Schemas inside documents stay untyped JSON objects; the compatibility
//! engine owns their interpretation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON Schema as an untyped JSON object.
pub type JsonSchema = Map<String, Value>;

/// Prefix of a `$ref` to a named transform.
pub const TRANSFORM_REF_PREFIX: &str = "#/transforms/";

/// Access to the fields preserved on a typed document object.
pub trait Lossless {
    /// All preserved fields (extensions and unknown keys alike).
    fn preserved(&self) -> &Map<String, Value>;

    /// Preserved `x-*` extension fields.
    fn extensions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.preserved()
            .iter()
            .filter(|(key, _)| key.starts_with("x-"))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Preserved fields that are neither typed nor extensions
    /// (forward-compat fields from newer format versions).
    fn unknown_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.preserved()
            .iter()
            .filter(|(key, _)| !key.starts_with("x-"))
            .map(|(key, value)| (key.as_str(), value))
    }
}

macro_rules! impl_lossless {
    ($($ty:ty),* $(,)?) => {
        $(impl Lossless for $ty {
            fn preserved(&self) -> &Map<String, Value> {
                &self.extra
            }
        })*
    };
}

/// The kind of an operation. Known kinds are `method` (request/response) and
/// `event` (one-way notification); unknown kinds round-trip untouched and
/// are reported by validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKind(pub String);

impl OperationKind {
    pub const METHOD: &'static str = "method";
    pub const EVENT: &'static str = "event";

    pub fn method() -> Self {
        Self(Self::METHOD.to_string())
    }

    pub fn event() -> Self {
        Self(Self::EVENT.to_string())
    }

    pub fn is_method(&self) -> bool {
        self.0 == Self::METHOD
    }

    pub fn is_event(&self) -> bool {
        self.0 == Self::EVENT
    }

    pub fn is_known(&self) -> bool {
        self.is_method() || self.is_event()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A claim that an operation satisfies an operation of an imported interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Satisfies {
    pub interface: String,
    pub operation: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named example input/output pair for an operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // method only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    // event only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single operation of an interface document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub satisfies: Vec<Satisfies>,

    // method only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JsonSchema>,

    // event only; payload is optional per the format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonSchema>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub examples: BTreeMap<String, OperationExample>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A binding source: where an operation is implemented.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Source {
    /// A `<name>@<version>` format token.
    pub format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A JSON-to-JSON transformation. For v0.1 the type must be `jsonata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transform {
    #[serde(rename = "type")]
    pub kind: String,
    pub expression: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Either an inline [`Transform`] or a `{"$ref": "#/transforms/<name>"}`
/// reference object. The `$ref` form wins when both could apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformOrRef {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Inline(Transform),
}

impl TransformOrRef {
    /// True when this is a reference to a named transform.
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref { .. })
    }

    /// Returns the transform, resolving `#/transforms/<name>` references
    /// against `transforms`. Returns `None` for unresolvable references.
    pub fn resolve<'a>(
        &'a self,
        transforms: &'a BTreeMap<String, Transform>,
    ) -> Option<&'a Transform> {
        match self {
            Self::Inline(transform) => Some(transform),
            Self::Ref { reference, .. } => {
                let name = reference.strip_prefix(TRANSFORM_REF_PREFIX)?;
                if name.is_empty() {
                    return None;
                }
                transforms.get(name)
            }
        }
    }
}

/// One operation-to-source binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingEntry {
    pub operation: String,
    pub source: String,

    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    /// Transforms operation input into the binding's input structure.
    #[serde(
        default,
        rename = "inputTransform",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_transform: Option<TransformOrRef>,
    /// Transforms binding output into the operation's output structure.
    #[serde(
        default,
        rename = "outputTransform",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_transform: Option<TransformOrRef>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The interface document shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interface {
    /// Format version, `MAJOR.MINOR.PATCH`.
    pub bindspec: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, JsonSchema>,
    /// Required; `None` (emitted as `null`) means the document omitted it.
    #[serde(default)]
    pub operations: Option<BTreeMap<String, Operation>>,

    /// Import table mapping local aliases to URLs/paths of other interfaces,
    /// used by `satisfies` references.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub imports: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, Source>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, BindingEntry>,

    /// Named transforms referenced by bindings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transforms: BTreeMap<String, Transform>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_lossless!(
    Satisfies,
    OperationExample,
    Operation,
    Source,
    Transform,
    BindingEntry,
    Interface,
);
