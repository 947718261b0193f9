//! Shape-level validation of interface documents.
//!
//! Deliberately not JSON Schema validation: the checks here are the ones
//! tooling needs to trust a document's structure (version shape, operation
//! kinds, alias hygiene, and reference integrity across sources, bindings,
//! and transforms). All problems are collected into one deterministic error.

use std::sync::OnceLock;

use regex::Regex;

use crate::document::{
    Interface, Lossless, Transform, TransformOrRef, TRANSFORM_REF_PREFIX,
};
use crate::error::ValidationError;
use crate::version::{self, MAX_TESTED_VERSION, MIN_SUPPORTED_VERSION};

/// Options for [`Interface::validate`]. The defaults are forward-compatible:
/// unknown fields are allowed, event payloads are optional, and versions
/// outside the supported range pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    reject_unknown_fields: bool,
    require_event_payload: bool,
    require_supported_version: bool,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat unknown (non-`x-`) fields in typed objects as errors.
    pub fn reject_unknown_fields(mut self, reject: bool) -> Self {
        self.reject_unknown_fields = reject;
        self
    }

    /// Require `kind = "event"` operations to declare a payload schema.
    pub fn require_event_payload(mut self, require: bool) -> Self {
        self.require_event_payload = require;
        self
    }

    /// Require the document format version to fall in the supported range.
    pub fn require_supported_version(mut self, require: bool) -> Self {
        self.require_supported_version = require;
        self
    }
}

fn semverish() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("invalid regex"))
}

impl Interface {
    /// Performs shape-level checks useful for tooling correctness and
    /// returns every problem found, in a stable order.
    pub fn validate(&self, options: &ValidateOptions) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        if self.bindspec.trim().is_empty() {
            problems.push("bindspec: required".to_string());
        } else if !semverish().is_match(&self.bindspec) {
            problems.push("bindspec: must be MAJOR.MINOR.PATCH (e.g. 0.1.0)".to_string());
        } else if options.require_supported_version {
            match version::is_supported_version(&self.bindspec) {
                Err(err) => problems.push(format!("bindspec: invalid version: {err}")),
                Ok(false) => problems.push(format!(
                    "bindspec: unsupported version {:?} (supported {MIN_SUPPORTED_VERSION}-{MAX_TESTED_VERSION})",
                    self.bindspec
                )),
                Ok(true) => {}
            }
        }

        for (alias, target) in &self.imports {
            if target.trim().is_empty() {
                problems.push(format!("imports[{alias:?}]: value must be non-empty"));
            }
        }

        let Some(operations) = &self.operations else {
            problems.push("operations: required".to_string());
            self.check_collaborators(options, &mut problems);
            return finish(problems);
        };

        // Aliases must not be shared across operations or shadow operation
        // keys; either would make alias matching ambiguous.
        let mut alias_owner: std::collections::BTreeMap<&str, &str> =
            std::collections::BTreeMap::new();

        for (key, op) in operations {
            if !op.kind.is_known() {
                problems.push(format!(
                    "operations[{key:?}].kind: must be \"method\" or \"event\""
                ));
                continue;
            }

            if options.require_event_payload && op.kind.is_event() && op.payload.is_none() {
                problems.push(format!(
                    "operations[{key:?}].payload: required for kind=\"event\""
                ));
            }

            for alias in &op.aliases {
                if alias.trim().is_empty() {
                    problems.push(format!(
                        "operations[{key:?}].aliases: must not contain empty strings"
                    ));
                    continue;
                }
                if operations.contains_key(alias) && alias != key {
                    problems.push(format!(
                        "operations[{key:?}].aliases: {alias:?} conflicts with operation key {alias:?}"
                    ));
                    continue;
                }
                match alias_owner.get(alias.as_str()) {
                    Some(owner) if *owner != key.as_str() => {
                        problems.push(format!(
                            "operations[{key:?}].aliases: {alias:?} is also an alias of {owner:?}"
                        ));
                        continue;
                    }
                    _ => {}
                }
                alias_owner.insert(alias.as_str(), key.as_str());
            }

            for (index, satisfies) in op.satisfies.iter().enumerate() {
                if satisfies.interface.trim().is_empty() {
                    problems.push(format!(
                        "operations[{key:?}].satisfies[{index}].interface: required"
                    ));
                } else if !self.imports.contains_key(&satisfies.interface) {
                    problems.push(format!(
                        "operations[{key:?}].satisfies[{index}].interface: references unknown import {:?}",
                        satisfies.interface
                    ));
                }
                if satisfies.operation.trim().is_empty() {
                    problems.push(format!(
                        "operations[{key:?}].satisfies[{index}].operation: required"
                    ));
                }
            }

            if options.reject_unknown_fields {
                push_unknown_fields(&mut problems, &format!("operations[{key:?}]"), op);
                for (index, satisfies) in op.satisfies.iter().enumerate() {
                    push_unknown_fields(
                        &mut problems,
                        &format!("operations[{key:?}].satisfies[{index}]"),
                        satisfies,
                    );
                }
                for (name, example) in &op.examples {
                    push_unknown_fields(
                        &mut problems,
                        &format!("operations[{key:?}].examples[{name:?}]"),
                        example,
                    );
                }
            }
        }

        self.check_collaborators(options, &mut problems);
        finish(problems)
    }

    /// Checks sources, transforms, and bindings, which do not depend on the
    /// operations table being present.
    fn check_collaborators(&self, options: &ValidateOptions, problems: &mut Vec<String>) {
        for (key, source) in &self.sources {
            if source.format.trim().is_empty() {
                problems.push(format!("sources[{key:?}].format: required"));
            }
            let has_location = source
                .location
                .as_deref()
                .is_some_and(|loc| !loc.trim().is_empty());
            let has_content = source.content.is_some();
            if has_location && has_content {
                problems.push(format!(
                    "sources[{key:?}]: cannot have both location and content"
                ));
            }
            if !has_location && !has_content {
                problems.push(format!("sources[{key:?}]: must have location or content"));
            }
            if options.reject_unknown_fields {
                push_unknown_fields(problems, &format!("sources[{key:?}]"), source);
            }
        }

        for (key, transform) in &self.transforms {
            check_transform(problems, &format!("transforms[{key:?}]"), transform);
            if options.reject_unknown_fields {
                push_unknown_fields(problems, &format!("transforms[{key:?}]"), transform);
            }
        }

        for (key, binding) in &self.bindings {
            if binding.operation.trim().is_empty() {
                problems.push(format!("bindings[{key:?}].operation: required"));
            } else if !self
                .operations
                .as_ref()
                .is_some_and(|ops| ops.contains_key(&binding.operation))
            {
                problems.push(format!(
                    "bindings[{key:?}].operation: references unknown operation {:?}",
                    binding.operation
                ));
            }
            if binding.source.trim().is_empty() {
                problems.push(format!("bindings[{key:?}].source: required"));
            } else if !self.sources.contains_key(&binding.source) {
                problems.push(format!(
                    "bindings[{key:?}].source: references unknown source {:?}",
                    binding.source
                ));
            }

            for (label, transform) in [
                ("inputTransform", &binding.input_transform),
                ("outputTransform", &binding.output_transform),
            ] {
                let Some(transform) = transform else {
                    continue;
                };
                match transform {
                    TransformOrRef::Ref { reference, .. } => {
                        if let Err(message) = self.check_transform_ref(reference) {
                            problems.push(format!(
                                "bindings[{key:?}].{label}.$ref: {message}"
                            ));
                        }
                    }
                    TransformOrRef::Inline(inline) => {
                        check_transform(
                            problems,
                            &format!("bindings[{key:?}].{label}"),
                            inline,
                        );
                        if options.reject_unknown_fields {
                            push_unknown_fields(
                                problems,
                                &format!("bindings[{key:?}].{label}"),
                                inline,
                            );
                        }
                    }
                }
            }

            if options.reject_unknown_fields {
                push_unknown_fields(problems, &format!("bindings[{key:?}]"), binding);
            }
        }

        if options.reject_unknown_fields {
            push_unknown_fields(problems, "", self);
        }
    }

    fn check_transform_ref(&self, reference: &str) -> Result<(), String> {
        let Some(name) = reference.strip_prefix(TRANSFORM_REF_PREFIX) else {
            return Err(format!("must start with {TRANSFORM_REF_PREFIX:?}"));
        };
        if name.is_empty() {
            return Err("transform name is empty".to_string());
        }
        if !self.transforms.contains_key(name) {
            return Err(format!("references unknown transform {name:?}"));
        }
        Ok(())
    }
}

fn check_transform(problems: &mut Vec<String>, prefix: &str, transform: &Transform) {
    if transform.kind.trim().is_empty() {
        problems.push(format!("{prefix}.type: required"));
    } else if transform.kind != "jsonata" {
        problems.push(format!(
            "{prefix}.type: must be \"jsonata\" (got {:?})",
            transform.kind
        ));
    }
    if transform.expression.trim().is_empty() {
        problems.push(format!("{prefix}.expression: required"));
    }
}

fn push_unknown_fields(problems: &mut Vec<String>, prefix: &str, object: &impl Lossless) {
    let keys: Vec<&str> = object.unknown_fields().map(|(key, _)| key).collect();
    if keys.is_empty() {
        return;
    }
    if prefix.is_empty() {
        problems.push(format!("unknown fields: {}", keys.join(", ")));
    } else {
        problems.push(format!("{prefix}: unknown fields: {}", keys.join(", ")));
    }
}

fn finish(problems: Vec<String>) -> Result<(), ValidationError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { problems })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(doc: serde_json::Value) -> Interface {
        serde_json::from_value(doc).unwrap()
    }

    fn problems(doc: serde_json::Value, options: &ValidateOptions) -> Vec<String> {
        match parse(doc).validate(options) {
            Ok(()) => Vec::new(),
            Err(err) => err.problems,
        }
    }

    #[test]
    fn valid_minimal_document() {
        let doc = json!({
            "bindspec": "0.1.0",
            "operations": {
                "add": {"kind": "method"}
            }
        });
        assert!(parse(doc).validate(&ValidateOptions::new()).is_ok());
    }

    #[test]
    fn missing_bindspec_and_operations() {
        let errs = problems(json!({"bindspec": ""}), &ValidateOptions::new());
        assert!(errs.contains(&"bindspec: required".to_string()));
        assert!(errs.contains(&"operations: required".to_string()));
    }

    #[test]
    fn malformed_version_string() {
        let errs = problems(
            json!({"bindspec": "0.1", "operations": {}}),
            &ValidateOptions::new(),
        );
        assert!(errs.contains(&"bindspec: must be MAJOR.MINOR.PATCH (e.g. 0.1.0)".to_string()));
    }

    #[test]
    fn unsupported_version_is_opt_in() {
        let doc = json!({"bindspec": "9.9.9", "operations": {}});
        // Forward-compatible by default.
        assert!(parse(doc.clone()).validate(&ValidateOptions::new()).is_ok());

        let errs = problems(doc, &ValidateOptions::new().require_supported_version(true));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("bindspec: unsupported version \"9.9.9\""));
    }

    #[test]
    fn unknown_operation_kind() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "operations": {"weird": {"kind": "stream"}}
            }),
            &ValidateOptions::new(),
        );
        assert_eq!(
            errs,
            vec!["operations[\"weird\"].kind: must be \"method\" or \"event\""]
        );
    }

    #[test]
    fn event_payload_requirement_is_opt_in() {
        let doc = json!({
            "bindspec": "0.1.0",
            "operations": {"changed": {"kind": "event"}}
        });
        assert!(parse(doc.clone()).validate(&ValidateOptions::new()).is_ok());

        let errs = problems(doc, &ValidateOptions::new().require_event_payload(true));
        assert_eq!(
            errs,
            vec!["operations[\"changed\"].payload: required for kind=\"event\""]
        );
    }

    #[test]
    fn alias_hygiene() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "operations": {
                    "add": {"kind": "method", "aliases": ["plus", "sum"]},
                    "sub": {"kind": "method", "aliases": ["plus", "add", ""]}
                }
            }),
            &ValidateOptions::new(),
        );
        assert!(errs
            .iter()
            .any(|p| p.contains("\"plus\" is also an alias of \"add\"")));
        assert!(errs
            .iter()
            .any(|p| p.contains("\"add\" conflicts with operation key \"add\"")));
        assert!(errs
            .iter()
            .any(|p| p.contains("must not contain empty strings")));
    }

    #[test]
    fn satisfies_references_imports() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "imports": {"math": "https://example.com/math.json"},
                "operations": {
                    "add": {
                        "kind": "method",
                        "satisfies": [
                            {"interface": "math", "operation": "add"},
                            {"interface": "missing", "operation": "add"},
                            {"interface": "", "operation": ""}
                        ]
                    }
                }
            }),
            &ValidateOptions::new(),
        );
        assert!(errs
            .iter()
            .any(|p| p.contains("satisfies[1].interface: references unknown import \"missing\"")));
        assert!(errs
            .iter()
            .any(|p| p.contains("satisfies[2].interface: required")));
        assert!(errs
            .iter()
            .any(|p| p.contains("satisfies[2].operation: required")));
    }

    #[test]
    fn empty_import_value() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "imports": {"math": "  "},
                "operations": {}
            }),
            &ValidateOptions::new(),
        );
        assert_eq!(errs, vec!["imports[\"math\"]: value must be non-empty"]);
    }

    #[test]
    fn source_location_xor_content() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "operations": {},
                "sources": {
                    "both": {"format": "openapi@3.1", "location": "./a.yaml", "content": {}},
                    "neither": {"format": "openapi@3.1"},
                    "blank": {"format": " ", "location": "./a.yaml"}
                }
            }),
            &ValidateOptions::new(),
        );
        assert!(errs
            .iter()
            .any(|p| p.contains("sources[\"both\"]: cannot have both location and content")));
        assert!(errs
            .iter()
            .any(|p| p.contains("sources[\"neither\"]: must have location or content")));
        assert!(errs.iter().any(|p| p.contains("sources[\"blank\"].format: required")));
    }

    #[test]
    fn transform_rules() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "operations": {},
                "transforms": {
                    "bad": {"type": "jq", "expression": ".x"},
                    "empty": {"type": "jsonata", "expression": " "}
                }
            }),
            &ValidateOptions::new(),
        );
        assert!(errs
            .iter()
            .any(|p| p.contains("transforms[\"bad\"].type: must be \"jsonata\" (got \"jq\")")));
        assert!(errs
            .iter()
            .any(|p| p.contains("transforms[\"empty\"].expression: required")));
    }

    #[test]
    fn binding_reference_integrity() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "operations": {"add": {"kind": "method"}},
                "sources": {"grpc": {"format": "proto@3", "location": "./calc.proto"}},
                "transforms": {
                    "wrap": {"type": "jsonata", "expression": "{\"v\": $}"}
                },
                "bindings": {
                    "ok": {
                        "operation": "add",
                        "source": "grpc",
                        "inputTransform": {"$ref": "#/transforms/wrap"}
                    },
                    "dangling": {
                        "operation": "nope",
                        "source": "missing",
                        "outputTransform": {"$ref": "#/transforms/nope"}
                    },
                    "badref": {
                        "operation": "add",
                        "source": "grpc",
                        "inputTransform": {"$ref": "#/schemas/wrap"}
                    }
                }
            }),
            &ValidateOptions::new(),
        );
        assert!(errs
            .iter()
            .any(|p| p.contains("bindings[\"dangling\"].operation: references unknown operation \"nope\"")));
        assert!(errs
            .iter()
            .any(|p| p.contains("bindings[\"dangling\"].source: references unknown source \"missing\"")));
        assert!(errs
            .iter()
            .any(|p| p.contains("bindings[\"dangling\"].outputTransform.$ref: references unknown transform \"nope\"")));
        assert!(errs
            .iter()
            .any(|p| p.contains("bindings[\"badref\"].inputTransform.$ref: must start with \"#/transforms/\"")));
        assert!(!errs.iter().any(|p| p.contains("bindings[\"ok\"]")));
    }

    #[test]
    fn inline_transform_in_binding_is_checked() {
        let errs = problems(
            json!({
                "bindspec": "0.1.0",
                "operations": {"add": {"kind": "method"}},
                "sources": {"grpc": {"format": "proto@3", "location": "./calc.proto"}},
                "bindings": {
                    "b": {
                        "operation": "add",
                        "source": "grpc",
                        "inputTransform": {"type": "jq", "expression": "."}
                    }
                }
            }),
            &ValidateOptions::new(),
        );
        assert!(errs
            .iter()
            .any(|p| p.contains("bindings[\"b\"].inputTransform.type: must be \"jsonata\"")));
    }

    #[test]
    fn strict_mode_reports_unknown_fields() {
        let doc = json!({
            "bindspec": "0.1.0",
            "operations": {
                "add": {"kind": "method", "futureFlag": true, "x-ok": 1}
            },
            "futureTop": {}
        });
        // Unknown fields pass by default.
        assert!(parse(doc.clone()).validate(&ValidateOptions::new()).is_ok());

        let errs = problems(doc, &ValidateOptions::new().reject_unknown_fields(true));
        assert!(errs
            .iter()
            .any(|p| p.contains("operations[\"add\"]: unknown fields: futureFlag")));
        assert!(errs.iter().any(|p| p == "unknown fields: futureTop"));
        // x-* extensions are never unknown.
        assert!(!errs.iter().any(|p| p.contains("x-ok")));
    }
}
