//! Canonical JSON serialization per RFC 8785 (JCS).
//!
//! Produces deterministic bytes for any JSON value: object members sorted by
//! UTF-16 code-unit order, ECMAScript number serialization, compact output.
//! The canonical form is the equality primitive of the compatibility engine
//! and the byte format used for hashing and golden-test comparisons.
//!
//! Targeting a published standard keeps the bytes stable across languages and
//! implementations, so the rules here must not drift: any change to this
//! module is a breaking change to normalized-schema equality.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::error::CanonicalizeError;

/// Returns the canonical (RFC 8785) JSON encoding of `value` as a string.
pub fn canonical_string(value: &Value) -> Result<String, CanonicalizeError> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Returns the canonical (RFC 8785) JSON encoding of `value` as UTF-8 bytes.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalizeError> {
    canonical_string(value).map(String::into_bytes)
}

/// Re-decodes a pre-encoded JSON document and emits its canonical bytes.
///
/// The input must contain exactly one JSON value; trailing data after the
/// root is rejected.
pub fn canonicalize_bytes(input: &[u8]) -> Result<Vec<u8>, CanonicalizeError> {
    let mut stream = serde_json::Deserializer::from_slice(input).into_iter::<Value>();
    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(source)) => return Err(CanonicalizeError::InvalidJson { source }),
        None => return Err(CanonicalizeError::EmptyInput),
    };
    if stream.next().is_some() {
        return Err(CanonicalizeError::TrailingData);
    }
    canonicalize(&value)
}

/// Compares two strings by their UTF-16 code units, the member ordering
/// RFC 8785 requires. This matches ECMAScript string comparison and differs
/// from UTF-8 byte order for some characters outside the BMP.
pub fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

fn write_value(out: &mut String, value: &Value) -> Result<(), CanonicalizeError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(number) => {
            let double = number.as_f64().ok_or(CanonicalizeError::NonFinite)?;
            write_number(out, double)?;
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map)?,
    }
    Ok(())
}

fn write_object(out: &mut String, map: &Map<String, Value>) -> Result<(), CanonicalizeError> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| compare_utf16(a.0, b.0));

    out.push('{');
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, value)?;
    }
    out.push('}');
    Ok(())
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            // RFC 8785 §3.2.2.2: these five control characters MUST use
            // shorthand escapes.
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            // Remaining control characters use \u00xx with lowercase hex.
            c if c <= '\u{1F}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Writes `value` using ECMAScript number-to-string rules: plain decimal for
/// magnitudes in `[1e-6, 1e21)`, exponent form otherwise, always the shortest
/// digits that round-trip to the same double.
fn write_number(out: &mut String, value: f64) -> Result<(), CanonicalizeError> {
    if !value.is_finite() {
        return Err(CanonicalizeError::NonFinite);
    }
    // Normalize -0 to 0.
    if value == 0.0 {
        out.push('0');
        return Ok(());
    }

    let abs = value.abs();
    if abs >= 1e21 || abs < 1e-6 {
        // `{:e}` is shortest round-trip but prints `1e21` where ECMAScript
        // prints `1e+21`; the exponent digits are never zero-padded.
        let s = format!("{value:e}");
        match s.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                out.push_str(mantissa);
                out.push_str("e+");
                out.push_str(exponent);
            }
            _ => out.push_str(&s),
        }
    } else {
        out.push_str(&format!("{value}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn canon(value: Value) -> String {
        canonical_string(&value).unwrap()
    }

    #[test]
    fn primitives() {
        assert_eq!(canon(json!(null)), "null");
        assert_eq!(canon(json!(true)), "true");
        assert_eq!(canon(json!(false)), "false");
        assert_eq!(canon(json!(42)), "42");
        assert_eq!(canon(json!(-123)), "-123");
        assert_eq!(canon(json!("hello")), "\"hello\"");
    }

    #[test]
    fn integers_at_double_precision() {
        assert_eq!(canon(json!(9007199254740991i64)), "9007199254740991");
        assert_eq!(canon(json!(0)), "0");
    }

    #[test]
    fn negative_zero_normalizes() {
        assert_eq!(canon(json!(-0.0)), "0");
    }

    #[test]
    fn string_escapes() {
        assert_eq!(canon(json!("a\nb")), "\"a\\nb\"");
        assert_eq!(canon(json!("a\tb")), "\"a\\tb\"");
        assert_eq!(canon(json!("a\"b")), "\"a\\\"b\"");
        assert_eq!(canon(json!("a\\b")), "\"a\\\\b\"");
        assert_eq!(canon(json!("\u{08}\u{0C}\r")), "\"\\b\\f\\r\"");
    }

    #[test]
    fn control_characters_use_lowercase_hex() {
        assert_eq!(canon(json!("\u{0}")), "\"\\u0000\"");
        assert_eq!(canon(json!("\u{1b}")), "\"\\u001b\"");
        assert_eq!(canon(json!("\u{1f}")), "\"\\u001f\"");
    }

    #[test]
    fn non_ascii_is_emitted_literally() {
        assert_eq!(canon(json!("héllo €")), "\"héllo €\"");
    }

    #[test]
    fn number_forms() {
        // Decimal form inside [1e-6, 1e21), exponent form outside.
        assert_eq!(canon(json!(1e-6)), "0.000001");
        assert_eq!(canon(json!(1e-7)), "1e-7");
        assert_eq!(canon(json!(1e21)), "1e+21");
        assert_eq!(canon(json!(1e20)), "100000000000000000000");
        assert_eq!(canon(json!(2.5e-10)), "2.5e-10");
        assert_eq!(canon(json!(0.5)), "0.5");
    }

    #[test]
    fn object_keys_sorted() {
        assert_eq!(canon(json!({"b": 2, "a": 1})), "{\"a\":1,\"b\":2}");
        assert_eq!(canon(json!({})), "{}");
    }

    #[test]
    fn arrays_preserve_order() {
        assert_eq!(canon(json!([3, 1, 2])), "[3,1,2]");
        assert_eq!(canon(json!([])), "[]");
    }

    #[test]
    fn nested_structures() {
        assert_eq!(
            canon(json!({"obj": {"x": 1}, "arr": [1]})),
            "{\"arr\":[1],\"obj\":{\"x\":1}}"
        );
    }

    #[test]
    fn utf16_ordering() {
        assert_eq!(compare_utf16("a", "b"), Ordering::Less);
        assert_eq!(compare_utf16("a", "aa"), Ordering::Less);
        assert_eq!(compare_utf16("abc", "abc"), Ordering::Equal);
        // U+FF61 is a single code unit (FF61); U+1F600 is a surrogate pair
        // starting at D83D, so it sorts first under UTF-16 despite having a
        // higher code point.
        assert_eq!(compare_utf16("\u{1F600}", "\u{FF61}"), Ordering::Less);
    }

    #[test]
    fn bytes_round_trip_is_key_order_invariant() {
        let a = canonicalize_bytes(br#"{"b":2,"a":1}"#).unwrap();
        let b = canonicalize_bytes(br#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_data_is_rejected() {
        let err = canonicalize_bytes(b"{} {}").unwrap_err();
        assert!(matches!(err, CanonicalizeError::TrailingData));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            canonicalize_bytes(b"NaN"),
            Err(CanonicalizeError::InvalidJson { .. })
        ));
        assert!(matches!(
            canonicalize_bytes(b""),
            Err(CanonicalizeError::EmptyInput)
        ));
    }

    #[test]
    fn idempotent() {
        let value = json!({"z": [1e-7, "x\u{1b}"], "a": {"nested": true}});
        let first = canonicalize(&value).unwrap();
        let second = canonicalize_bytes(&first).unwrap();
        assert_eq!(first, second);
    }
}
