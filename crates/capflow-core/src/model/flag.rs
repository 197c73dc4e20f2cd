//! Lenient manifest scalars
//!
//! Manifests are hand-written and often produced by templating tools, so
//! `skip` fields show up as `true`, `"true"`, `"yes"`, `1` or `null`, and
//! numbers as `200` or `"200"`.

use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

/// Interprets a JSON value as a flag.
///
/// Strings are true when, trimmed and lower-cased, they are one of
/// `1`, `true`, `yes`, `y` or `on`.
pub fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// serde adapter for `#[serde(deserialize_with = "flag::lenient")]`
pub fn lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_flag(&value))
}

/// serde adapter for integers given either as numbers or numeric strings.
pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(de::Error::custom(format!("expected an integer, got {}", other))),
    };
    text.parse()
        .map_err(|e| de::Error::custom(format!("invalid integer '{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy_values() {
        for v in [json!(true), json!("true"), json!(" YES "), json!("y"), json!("on"), json!("1"), json!(1)] {
            assert!(parse_flag(&v), "{v} should be true");
        }
    }

    #[derive(Debug, Deserialize)]
    struct Status {
        #[serde(deserialize_with = "number")]
        code: u16,
    }

    #[test]
    fn test_number_accepts_strings() {
        let status: Status = serde_json::from_value(json!({"code": "503"})).unwrap();
        assert_eq!(status.code, 503);
        let status: Status = serde_json::from_value(json!({"code": 200})).unwrap();
        assert_eq!(status.code, 200);
    }

    #[test]
    fn test_number_rejects_garbage() {
        for v in [json!("ok"), json!(-1), json!(null), json!(70000)] {
            assert!(serde_json::from_value::<Status>(json!({ "code": v })).is_err(), "{v}");
        }
    }

    #[test]
    fn test_falsy_values() {
        for v in [json!(false), json!(null), json!("no"), json!("off"), json!(""), json!(0), json!([])] {
            assert!(!parse_flag(&v), "{v} should be false");
        }
    }
}
