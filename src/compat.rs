//! Directional compatibility decisions over normalized schemas.
//!
//! Input direction asks "does the candidate accept every instance the target
//! accepts" (a candidate may be more permissive); output direction asks
//! "is every instance the candidate emits acceptable to the target" (a
//! candidate may be more restrictive). Both run on normalized schemas only.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::profile::{as_f64, canonical_key};

/// Input (writer) compatibility on normalized schemas.
pub(crate) fn input_compatible(
    target: &Value,
    candidate: &Value,
) -> Result<bool, NormalizeError> {
    let target = schema_object(target)?;
    let candidate = schema_object(candidate)?;
    // Top candidate accepts anything.
    if candidate.is_empty() {
        return Ok(true);
    }
    compat(target, candidate, true)
}

/// Output (reader) compatibility on normalized schemas.
pub(crate) fn output_compatible(
    target: &Value,
    candidate: &Value,
) -> Result<bool, NormalizeError> {
    let target = schema_object(target)?;
    let candidate = schema_object(candidate)?;
    // Top candidate emits anything; only a Top target tolerates that.
    if candidate.is_empty() {
        return Ok(target.is_empty());
    }
    compat(target, candidate, false)
}

fn schema_object(value: &Value) -> Result<&Map<String, Value>, NormalizeError> {
    value.as_object().ok_or_else(|| NormalizeError::Shape {
        path: "<root>".to_string(),
        message: "normalized schema must be an object".to_string(),
    })
}

fn compat(
    target: &Map<String, Value>,
    candidate: &Map<String, Value>,
    is_input: bool,
) -> Result<bool, NormalizeError> {
    // Top on either side resolves purely by direction.
    if target.is_empty() {
        return Ok(if is_input { candidate.is_empty() } else { true });
    }
    if candidate.is_empty() {
        return Ok(if is_input { true } else { target.is_empty() });
    }

    // Type sets; an absent type means all types.
    let target_types = type_set(target);
    let candidate_types = type_set(candidate);
    if target_types.is_some() || candidate_types.is_some() {
        let subset = if is_input {
            subset_types(target_types.as_ref(), candidate_types.as_ref())
        } else {
            subset_types(candidate_types.as_ref(), target_types.as_ref())
        };
        if !subset {
            return Ok(false);
        }
    }

    if !compat_const_enum(target, candidate, is_input) {
        return Ok(false);
    }

    if has_type(target, "object") || has_type(candidate, "object") {
        if !compat_object(target, candidate, is_input)? {
            return Ok(false);
        }
    }

    if has_type(target, "array") || has_type(candidate, "array") {
        if !compat_items(target, candidate, is_input)? {
            return Ok(false);
        }
    }

    let numeric = |schema| has_type(schema, "number") || has_type(schema, "integer");
    if numeric(target) || numeric(candidate) {
        if !compat_numeric_bounds(target, candidate, is_input) {
            return Ok(false);
        }
    }

    if has_type(target, "string") || has_type(candidate, "string") {
        if !compat_simple_bounds(target, candidate, is_input, "minLength", "maxLength") {
            return Ok(false);
        }
    }

    if has_type(target, "array") || has_type(candidate, "array") {
        if !compat_simple_bounds(target, candidate, is_input, "minItems", "maxItems") {
            return Ok(false);
        }
    }

    if has_union(target) || has_union(candidate) {
        if !compat_union(target, candidate, is_input)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Returns the `type` set, or `None` when the schema is unconstrained.
fn type_set(schema: &Map<String, Value>) -> Option<BTreeSet<&str>> {
    let types = schema.get("type")?.as_array()?;
    Some(types.iter().filter_map(Value::as_str).collect())
}

/// Subset check with `None` meaning "all types". `integer` on the narrow
/// side is covered by `number` on the wide side.
fn subset_types(a: Option<&BTreeSet<&str>>, b: Option<&BTreeSet<&str>>) -> bool {
    let Some(a) = a else {
        return b.is_none();
    };
    let Some(b) = b else {
        return true;
    };
    a.iter()
        .all(|t| b.contains(t) || (*t == "integer" && b.contains("number")))
}

fn has_type(schema: &Map<String, Value>, name: &str) -> bool {
    type_set(schema).is_some_and(|set| set.contains(name))
}

fn has_union(schema: &Map<String, Value>) -> bool {
    schema.contains_key("oneOf") || schema.contains_key("anyOf")
}

fn compat_const_enum(
    target: &Map<String, Value>,
    candidate: &Map<String, Value>,
    is_input: bool,
) -> bool {
    let target_const = target.get("const");
    let candidate_const = candidate.get("const");
    let target_enum = enum_set(target);
    let candidate_enum = enum_set(candidate);

    if is_input {
        // A target const must be accepted by the candidate.
        if let Some(tc) = target_const {
            if let Some(cc) = candidate_const {
                return canonical_key(tc) == canonical_key(cc);
            }
            if let Some(ce) = &candidate_enum {
                return ce.contains(&canonical_key(tc));
            }
            return true;
        }
        // Every target enum value must be accepted by the candidate.
        if let Some(te) = &target_enum {
            if let Some(cc) = candidate_const {
                return te.len() == 1 && te.contains(&canonical_key(cc));
            }
            if let Some(ce) = &candidate_enum {
                return te.is_subset(ce);
            }
            return true;
        }
        return true;
    }

    // Output: the candidate's allowed values must sit inside the target's.
    if let Some(te) = &target_enum {
        if let Some(cc) = candidate_const {
            return te.contains(&canonical_key(cc));
        }
        if let Some(ce) = &candidate_enum {
            return ce.is_subset(te);
        }
        // Unconstrained candidate can emit values outside the target enum.
        return false;
    }
    if let Some(tc) = target_const {
        if let Some(cc) = candidate_const {
            return canonical_key(tc) == canonical_key(cc);
        }
        if let Some(ce) = &candidate_enum {
            return ce.len() == 1 && ce.contains(&canonical_key(tc));
        }
        return false;
    }
    true
}

/// Enum values as canonical-JSON keys; `None` when no `enum` is present.
fn enum_set(schema: &Map<String, Value>) -> Option<BTreeSet<String>> {
    let value = schema.get("enum")?;
    // A malformed (non-array) enum constrains to nothing.
    let values = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
    Some(values.iter().map(canonical_key).collect())
}

fn compat_object(
    target: &Map<String, Value>,
    candidate: &Map<String, Value>,
    is_input: bool,
) -> Result<bool, NormalizeError> {
    let empty = Map::new();
    let target_required = string_set(target.get("required"));
    let candidate_required = string_set(candidate.get("required"));
    let target_props = object_or(target.get("properties"), &empty);
    let candidate_props = object_or(candidate.get("properties"), &empty);

    if is_input {
        // The candidate may not demand more than the target guarantees.
        if !candidate_required.is_subset(&target_required) {
            return Ok(false);
        }
        for (name, target_prop) in target_props {
            let Some(tv) = target_prop.as_object() else {
                continue;
            };
            if let Some(candidate_prop) = candidate_props.get(name) {
                let Some(cv) = candidate_prop.as_object() else {
                    continue;
                };
                if !compat(tv, cv, true)? {
                    return Ok(false);
                }
            }
            // A property absent on the candidate side is unconstrained.
        }
        // additionalProperties does not restrict what an input accepts.
        return Ok(true);
    }

    // Output: the candidate must guarantee at least the target's required set.
    if !target_required.is_subset(&candidate_required) {
        return Ok(false);
    }

    let target_ap = target.get("additionalProperties");
    for (name, candidate_prop) in candidate_props {
        // An extra candidate property is only acceptable when the target
        // leaves room for additional properties.
        if !target_props.contains_key(name) && target_ap == Some(&Value::Bool(false)) {
            return Ok(false);
        }
        if let Some(target_prop) = target_props.get(name) {
            let (Some(tv), Some(cv)) = (target_prop.as_object(), candidate_prop.as_object())
            else {
                continue;
            };
            if !compat(tv, cv, false)? {
                return Ok(false);
            }
        }
    }

    match target_ap {
        Some(Value::Bool(false)) => {
            // The candidate must also forbid additional properties.
            return Ok(matches!(
                candidate.get("additionalProperties"),
                Some(Value::Bool(false))
            ));
        }
        Some(Value::Object(target_ap_schema)) => match candidate.get("additionalProperties") {
            Some(Value::Object(candidate_ap_schema)) => {
                if !compat(target_ap_schema, candidate_ap_schema, false)? {
                    return Ok(false);
                }
            }
            // A false candidate is stricter than the target's schema.
            Some(Value::Bool(false)) => return Ok(true),
            _ => return Ok(false),
        },
        _ => {}
    }

    Ok(true)
}

fn compat_items(
    target: &Map<String, Value>,
    candidate: &Map<String, Value>,
    is_input: bool,
) -> Result<bool, NormalizeError> {
    let empty = Map::new();
    // A side without items is Top for its elements.
    let tv = object_or(target.get("items"), &empty);
    let cv = object_or(candidate.get("items"), &empty);
    compat(tv, cv, is_input)
}

fn compat_union(
    target: &Map<String, Value>,
    candidate: &Map<String, Value>,
    is_input: bool,
) -> Result<bool, NormalizeError> {
    let (Some(target_vars), Some(candidate_vars)) =
        (union_variants(target), union_variants(candidate))
    else {
        // Only one side is a union; the profile defines no cross-form rules.
        return Ok(false);
    };

    if is_input {
        // Every target variant needs some candidate variant that accepts it.
        for v in &target_vars {
            let mut found = false;
            for w in &candidate_vars {
                if compat(v, w, true)? {
                    found = true;
                    break;
                }
            }
            if !found {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    // Every candidate variant must emit into some target variant.
    for w in &candidate_vars {
        let mut found = false;
        for v in &target_vars {
            if compat(v, w, false)? {
                found = true;
                break;
            }
        }
        if !found {
            return Ok(false);
        }
    }
    Ok(true)
}

fn union_variants(schema: &Map<String, Value>) -> Option<Vec<&Map<String, Value>>> {
    let value = schema.get("oneOf").or_else(|| schema.get("anyOf"))?;
    let items = value.as_array()?;
    items.iter().map(Value::as_object).collect()
}

fn string_set(value: Option<&Value>) -> BTreeSet<&str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

fn object_or<'a>(value: Option<&'a Value>, default: &'a Map<String, Value>) -> &'a Map<String, Value> {
    value.and_then(Value::as_object).unwrap_or(default)
}

// Bound comparisons carry (value, exclusive). For lower bounds an exclusive
// bound is HIGHER (stricter) at equal values: exclusiveMinimum 0 means > 0
// while minimum 0 means >= 0. For upper bounds an exclusive bound is LOWER
// (stricter) at equal values.

/// Effective lower bound and its exclusivity; the stricter of
/// `minimum`/`exclusiveMinimum` when both are present.
fn effective_lower(schema: &Map<String, Value>) -> (f64, bool) {
    let minimum = schema.get("minimum").map(as_f64);
    let exclusive = schema.get("exclusiveMinimum").map(as_f64);
    match (minimum, exclusive) {
        (Some(m), Some(e)) => {
            if e >= m {
                (e, true)
            } else {
                (m, false)
            }
        }
        (None, Some(e)) => (e, true),
        (Some(m), None) => (m, false),
        (None, None) => (0.0, false),
    }
}

/// Effective upper bound and its exclusivity; the stricter of
/// `maximum`/`exclusiveMaximum` when both are present.
fn effective_upper(schema: &Map<String, Value>) -> (f64, bool) {
    let maximum = schema.get("maximum").map(as_f64);
    let exclusive = schema.get("exclusiveMaximum").map(as_f64);
    match (maximum, exclusive) {
        (Some(m), Some(e)) => {
            if e <= m {
                (e, true)
            } else {
                (m, false)
            }
        }
        (None, Some(e)) => (e, true),
        (Some(m), None) => (m, false),
        (None, None) => (0.0, false),
    }
}

fn lower_le(a: (f64, bool), b: (f64, bool)) -> bool {
    if a.0 != b.0 {
        return a.0 < b.0;
    }
    // Equal values: exclusive is the higher (stricter) lower bound.
    !(a.1 && !b.1)
}

fn lower_ge(a: (f64, bool), b: (f64, bool)) -> bool {
    if a.0 != b.0 {
        return a.0 > b.0;
    }
    !(b.1 && !a.1)
}

fn upper_le(a: (f64, bool), b: (f64, bool)) -> bool {
    if a.0 != b.0 {
        return a.0 < b.0;
    }
    // Equal values: exclusive is the lower (stricter) upper bound.
    !(b.1 && !a.1)
}

fn upper_ge(a: (f64, bool), b: (f64, bool)) -> bool {
    if a.0 != b.0 {
        return a.0 > b.0;
    }
    !(a.1 && !b.1)
}

fn compat_numeric_bounds(
    target: &Map<String, Value>,
    candidate: &Map<String, Value>,
    is_input: bool,
) -> bool {
    let target_lower = effective_lower(target);
    let candidate_lower = effective_lower(candidate);
    let target_upper = effective_upper(target);
    let candidate_upper = effective_upper(candidate);

    let target_has_lower =
        target.contains_key("minimum") || target.contains_key("exclusiveMinimum");
    let target_has_upper =
        target.contains_key("maximum") || target.contains_key("exclusiveMaximum");
    let candidate_has_lower =
        candidate.contains_key("minimum") || candidate.contains_key("exclusiveMinimum");
    let candidate_has_upper =
        candidate.contains_key("maximum") || candidate.contains_key("exclusiveMaximum");

    if is_input {
        // The candidate must accept at least the target's range; an absent
        // candidate bound is unconstrained.
        if target_has_lower && candidate_has_lower && !lower_le(candidate_lower, target_lower) {
            return false;
        }
        if target_has_upper && candidate_has_upper && !upper_ge(candidate_upper, target_upper) {
            return false;
        }
    } else {
        // The candidate must emit within the target's range; a target bound
        // with no candidate bound is incompatible.
        if target_has_lower
            && (!candidate_has_lower || !lower_ge(candidate_lower, target_lower))
        {
            return false;
        }
        if target_has_upper
            && (!candidate_has_upper || !upper_le(candidate_upper, target_upper))
        {
            return false;
        }
    }
    true
}

/// Length/items bounds: plain comparisons, no exclusivity.
fn compat_simple_bounds(
    target: &Map<String, Value>,
    candidate: &Map<String, Value>,
    is_input: bool,
    min_key: &str,
    max_key: &str,
) -> bool {
    let (target_min, candidate_min) = (target.get(min_key), candidate.get(min_key));
    let (target_max, candidate_max) = (target.get(max_key), candidate.get(max_key));

    if is_input {
        if let (Some(t), Some(c)) = (target_min, candidate_min) {
            if as_f64(c) > as_f64(t) {
                return false;
            }
        }
        if let (Some(t), Some(c)) = (target_max, candidate_max) {
            if as_f64(c) < as_f64(t) {
                return false;
            }
        }
    } else {
        if let Some(t) = target_min {
            match candidate_min {
                Some(c) if as_f64(c) >= as_f64(t) => {}
                _ => return false,
            }
        }
        if let Some(t) = target_max {
            match candidate_max {
                Some(c) if as_f64(c) <= as_f64(t) => {}
                _ => return false,
            }
        }
    }
    true
}
