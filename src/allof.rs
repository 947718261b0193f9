//! `allOf` flattening for the schema normalizer.
//!
//! Merges every branch of an `allOf` into one accumulator schema. Branches
//! carrying `oneOf`/`anyOf` fail closed (flattening unions inside `allOf`
//! would require combinatorial normalization, which the profile excludes).

use serde_json::{Map, Value};

use crate::error::{NormalizeError, RefCause};
use crate::normalizer::Normalizer;
use crate::profile::{self, as_f64, canonical_key, join_path};

/// Flattens an `allOf` array into a single merged schema.
pub(crate) fn flatten(
    normalizer: &mut Normalizer<'_>,
    all_of: &Value,
    path: &str,
) -> Result<Map<String, Value>, NormalizeError> {
    let Some(branches) = all_of.as_array() else {
        return Err(NormalizeError::Shape {
            path: format!("{}.allOf", profile::path_or_root(path)),
            message: "must be array".to_string(),
        });
    };

    let mut merged = Map::new();
    for (index, item) in branches.iter().enumerate() {
        let branch_path = join_path(path, &format!("allOf[{index}]"));
        let Some(branch) = item.as_object() else {
            return Err(NormalizeError::Shape {
                path: branch_path,
                message: "must be object".to_string(),
            });
        };

        profile::assert_profile_keywords(branch, &branch_path)?;

        // Unions inside allOf branches: fail closed.
        for union_key in ["oneOf", "anyOf"] {
            if branch.contains_key(union_key) {
                return Err(NormalizeError::OutsideProfile {
                    path: branch_path,
                    keyword: format!("{union_key} inside allOf"),
                });
            }
        }

        // A $ref branch resolves once for merging. The cycle entry pops
        // immediately because the target is merged here, not re-normalized
        // through the main loop.
        let resolved_branch;
        let branch = match branch.get("$ref").and_then(Value::as_str) {
            Some(reference) if !reference.trim().is_empty() => {
                let (resolved, key) = normalizer.resolve_ref(reference, &branch_path)?;
                normalizer.remove_ref(&key);
                match resolved {
                    Value::Object(map) => {
                        resolved_branch = map;
                        &resolved_branch
                    }
                    _ => {
                        return Err(NormalizeError::Ref {
                            path: branch_path,
                            reference: reference.to_string(),
                            cause: RefCause::NotAnObject,
                        })
                    }
                }
            }
            _ => branch,
        };

        merge_branch(&mut merged, branch, &branch_path)?;
    }

    Ok(merged)
}

/// Merges one `allOf` branch into the accumulator.
///
/// Keywords handled:
///   - `type`:                 intersection (integer narrows number)
///   - `properties`:           union of keys; overlapping keys merge recursively
///   - `required`:             union
///   - `additionalProperties`: `false` wins; schemas merge recursively
///   - `enum`:                 intersection (empty is a schema error)
///   - `const`:                conflict is a schema error
///   - `items`:                recursive merge
///   - bounds:                 most restrictive wins (lower bounds up, upper bounds down)
fn merge_branch(
    acc: &mut Map<String, Value>,
    branch: &Map<String, Value>,
    path: &str,
) -> Result<(), NormalizeError> {
    let shape = |keyword: &str, message: String| NormalizeError::Shape {
        path: format!("{path}.{keyword}"),
        message,
    };

    // type: intersection.
    if let Some(branch_type) = branch.get("type") {
        let branch_types =
            profile::normalize_type(branch_type).map_err(|m| shape("type", m))?;
        let merged = match acc.get("type") {
            Some(acc_type) => {
                let acc_types =
                    profile::normalize_type(acc_type).map_err(|m| shape("type", m))?;
                let intersection = intersect_types(&acc_types, &branch_types);
                if intersection.as_array().is_some_and(Vec::is_empty) {
                    return Err(NormalizeError::Schema {
                        path: path.to_string(),
                        message: "allOf type intersection is empty".to_string(),
                    });
                }
                intersection
            }
            None => branch_types,
        };
        acc.insert("type".to_string(), merged);
    }

    // properties: union of keys, recursive merge for overlapping keys.
    if let Some(branch_props) = branch.get("properties") {
        let Some(branch_props) = branch_props.as_object() else {
            return Err(shape("properties", "must be object".to_string()));
        };
        let mut acc_props = match acc.remove("properties") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (name, branch_value) in branch_props {
            match acc_props.remove(name) {
                Some(existing) => {
                    let mut merged = existing.as_object().cloned().unwrap_or_default();
                    let branch_map = branch_value.as_object().cloned().unwrap_or_default();
                    merge_branch(
                        &mut merged,
                        &branch_map,
                        &format!("{path}.properties[{name:?}]"),
                    )?;
                    acc_props.insert(name.clone(), Value::Object(merged));
                }
                None => {
                    acc_props.insert(name.clone(), branch_value.clone());
                }
            }
        }
        acc.insert("properties".to_string(), Value::Object(acc_props));
    }

    // required: union.
    if let Some(branch_required) = branch.get("required") {
        let branch_required =
            profile::normalize_string_set(branch_required).map_err(|m| shape("required", m))?;
        let merged = match acc.get("required") {
            Some(acc_required) => {
                let acc_required = profile::normalize_string_set(acc_required)
                    .map_err(|m| shape("required", m))?;
                union_string_sets(&acc_required, &branch_required)
            }
            None => branch_required,
        };
        acc.insert("required".to_string(), merged);
    }

    // additionalProperties: false wins; schemas merge recursively.
    if let Some(branch_ap) = branch.get("additionalProperties") {
        match branch_ap {
            Value::Bool(false) => {
                acc.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            Value::Bool(true) => {
                acc.entry("additionalProperties").or_insert(Value::Bool(true));
            }
            Value::Object(branch_map) => match acc.remove("additionalProperties") {
                Some(Value::Bool(false)) => {
                    acc.insert("additionalProperties".to_string(), Value::Bool(false));
                }
                Some(Value::Object(acc_map)) => {
                    let mut merged = acc_map;
                    merge_branch(&mut merged, branch_map, &format!("{path}.additionalProperties"))?;
                    acc.insert("additionalProperties".to_string(), Value::Object(merged));
                }
                Some(Value::Bool(true)) | None => {
                    acc.insert("additionalProperties".to_string(), branch_ap.clone());
                }
                Some(other) => {
                    acc.insert("additionalProperties".to_string(), other);
                }
            },
            _ => {}
        }
    }

    // enum: intersection under canonical-JSON equality.
    if let Some(branch_enum) = branch.get("enum") {
        let Some(branch_values) = branch_enum.as_array() else {
            return Err(shape("enum", "must be array".to_string()));
        };
        match acc.get("enum") {
            Some(acc_enum) => {
                let acc_values = acc_enum.as_array().cloned().unwrap_or_default();
                let intersection = intersect_values(&acc_values, branch_values);
                if intersection.is_empty() {
                    return Err(NormalizeError::Schema {
                        path: path.to_string(),
                        message: "allOf enum intersection is empty".to_string(),
                    });
                }
                acc.insert("enum".to_string(), Value::Array(intersection));
            }
            None => {
                acc.insert("enum".to_string(), Value::Array(branch_values.clone()));
            }
        }
    }

    // const: values must agree.
    if let Some(branch_const) = branch.get("const") {
        match acc.get("const") {
            Some(acc_const) => {
                if canonical_key(acc_const) != canonical_key(branch_const) {
                    return Err(NormalizeError::Schema {
                        path: path.to_string(),
                        message: "allOf const conflict".to_string(),
                    });
                }
            }
            None => {
                acc.insert("const".to_string(), branch_const.clone());
            }
        }
    }

    // items: recursive merge.
    if let Some(branch_items) = branch.get("items") {
        let Some(branch_map) = branch_items.as_object() else {
            return Err(shape("items", "must be object".to_string()));
        };
        match acc.remove("items") {
            Some(existing) => {
                let mut merged = existing.as_object().cloned().unwrap_or_default();
                merge_branch(&mut merged, branch_map, &format!("{path}.items"))?;
                acc.insert("items".to_string(), Value::Object(merged));
            }
            None => {
                acc.insert("items".to_string(), branch_items.clone());
            }
        }
    }

    // Lower bounds: the highest (most restrictive) wins.
    for key in ["minimum", "exclusiveMinimum", "minLength", "minItems"] {
        if let Some(branch_value) = branch.get(key) {
            let keep_branch = match acc.get(key) {
                Some(acc_value) => as_f64(branch_value) > as_f64(acc_value),
                None => true,
            };
            if keep_branch {
                acc.insert(key.to_string(), branch_value.clone());
            }
        }
    }
    // Upper bounds: the lowest (most restrictive) wins.
    for key in ["maximum", "exclusiveMaximum", "maxLength", "maxItems"] {
        if let Some(branch_value) = branch.get(key) {
            let keep_branch = match acc.get(key) {
                Some(acc_value) => as_f64(branch_value) < as_f64(acc_value),
                None => true,
            };
            if keep_branch {
                acc.insert(key.to_string(), branch_value.clone());
            }
        }
    }

    Ok(())
}

/// Intersects two normalized type arrays, accounting for the JSON Schema
/// rule that `integer` is a subtype of `number`.
///
/// Numeric acceptance per side: `number` accepts all numerics, `integer`
/// (without `number`) accepts only integers. Both `number` keeps `number`;
/// any `integer` side narrows the intersection to `integer`; a side that
/// accepts no numerics removes numerics entirely. Non-numeric types use
/// plain set intersection.
fn intersect_types(a: &Value, b: &Value) -> Value {
    let to_set = |value: &Value| -> std::collections::BTreeSet<String> {
        value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    };
    let a_set = to_set(a);
    let b_set = to_set(b);

    let mut result: std::collections::BTreeSet<String> = a_set
        .iter()
        .filter(|t| t.as_str() != "number" && t.as_str() != "integer" && b_set.contains(*t))
        .cloned()
        .collect();

    let a_number = a_set.contains("number");
    let b_number = b_set.contains("number");
    let a_accepts_numerics = a_number || a_set.contains("integer");
    let b_accepts_numerics = b_number || b_set.contains("integer");

    if a_accepts_numerics && b_accepts_numerics {
        if a_number && b_number {
            result.insert("number".to_string());
        } else {
            result.insert("integer".to_string());
        }
    }

    Value::Array(result.into_iter().map(Value::String).collect())
}

fn union_string_sets(a: &Value, b: &Value) -> Value {
    let mut set = std::collections::BTreeSet::new();
    for value in [a, b] {
        for item in value.as_array().into_iter().flatten() {
            if let Some(s) = item.as_str() {
                set.insert(s.to_string());
            }
        }
    }
    Value::Array(set.into_iter().map(Value::String).collect())
}

/// Intersects two enum value lists under canonical-JSON equality, keeping
/// the first list's order.
fn intersect_values(a: &[Value], b: &[Value]) -> Vec<Value> {
    let b_keys: std::collections::BTreeSet<String> = b.iter().map(canonical_key).collect();
    a.iter()
        .filter(|v| b_keys.contains(&canonical_key(v)))
        .cloned()
        .collect()
}
