use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native value types supported by the settings stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Bool,
    Binary,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Bool => "bool",
            ValueType::Binary => "binary",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed policy value
///
/// Comparison is exact and typed: `Int(1)` never equals `Bool(true)`. Any
/// cross-type tolerance happens earlier, when a value is coerced using the
/// policy's declared [`ValueType`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PolicyValue {
    Bool(bool),
    Int(i64),
    String(String),
    Binary(Vec<u8>),
}

impl PolicyValue {
    /// The native type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            PolicyValue::Bool(_) => ValueType::Bool,
            PolicyValue::Int(_) => ValueType::Int,
            PolicyValue::String(_) => ValueType::String,
            PolicyValue::Binary(_) => ValueType::Binary,
        }
    }

    /// Coerce a JSON value into a policy value of the declared type
    ///
    /// The declared type is the canonical coercion rule: a baseline author may
    /// write `1` or `true` for a bool policy and both mean `Bool(true)`, but a
    /// string is never silently reinterpreted as a number or vice versa.
    pub fn from_json(value: &serde_json::Value, declared: ValueType) -> Result<PolicyValue> {
        use serde_json::Value;

        match declared {
            ValueType::Bool => match value {
                Value::Bool(b) => Ok(PolicyValue::Bool(*b)),
                Value::Number(n) if n.as_i64() == Some(0) => Ok(PolicyValue::Bool(false)),
                Value::Number(n) if n.as_i64() == Some(1) => Ok(PolicyValue::Bool(true)),
                other => anyhow::bail!("expected a boolean (or 0/1), got {}", other),
            },
            ValueType::Int => match value {
                Value::Number(n) => {
                    let i = n.as_i64().context("integer value out of range")?;
                    Ok(PolicyValue::Int(i))
                }
                Value::Bool(b) => Ok(PolicyValue::Int(i64::from(*b))),
                other => anyhow::bail!("expected an integer, got {}", other),
            },
            ValueType::String => match value {
                Value::String(s) => Ok(PolicyValue::String(s.clone())),
                other => anyhow::bail!("expected a string, got {}", other),
            },
            ValueType::Binary => match value {
                Value::Array(items) => {
                    let bytes = items
                        .iter()
                        .map(|item| {
                            item.as_u64()
                                .and_then(|n| u8::try_from(n).ok())
                                .with_context(|| format!("expected a byte (0-255), got {}", item))
                        })
                        .collect::<Result<Vec<u8>>>()?;
                    Ok(PolicyValue::Binary(bytes))
                }
                other => anyhow::bail!("expected a byte array, got {}", other),
            },
        }
    }

    /// Losslessly normalize this value into the declared type, if possible
    ///
    /// Returns `None` when no lossless coercion exists (e.g. a string stored
    /// where an int is declared); callers keep the raw value in that case so
    /// drift against the declared type is visible rather than masked.
    pub fn coerce_to(&self, declared: ValueType) -> Option<PolicyValue> {
        if self.value_type() == declared {
            return Some(self.clone());
        }

        match (self, declared) {
            (PolicyValue::Int(0), ValueType::Bool) => Some(PolicyValue::Bool(false)),
            (PolicyValue::Int(1), ValueType::Bool) => Some(PolicyValue::Bool(true)),
            (PolicyValue::Bool(b), ValueType::Int) => Some(PolicyValue::Int(i64::from(*b))),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyValue::Bool(b) => write!(f, "{}", b),
            PolicyValue::Int(i) => write!(f, "{}", i),
            PolicyValue::String(s) => write!(f, "\"{}\"", s),
            PolicyValue::Binary(bytes) => {
                write!(f, "0x")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Typed equality

    #[test]
    fn int_one_is_not_equal_to_bool_true() {
        assert_ne!(PolicyValue::Int(1), PolicyValue::Bool(true));
        assert_ne!(PolicyValue::Int(0), PolicyValue::Bool(false));
    }

    #[test]
    fn string_one_is_not_equal_to_int_one() {
        assert_ne!(PolicyValue::String("1".to_string()), PolicyValue::Int(1));
    }

    #[test]
    fn identical_values_are_equal() {
        assert_eq!(PolicyValue::Bool(true), PolicyValue::Bool(true));
        assert_eq!(PolicyValue::Int(42), PolicyValue::Int(42));
        assert_eq!(
            PolicyValue::String("x".to_string()),
            PolicyValue::String("x".to_string())
        );
        assert_eq!(
            PolicyValue::Binary(vec![1, 2, 3]),
            PolicyValue::Binary(vec![1, 2, 3])
        );
    }

    // JSON coercion by declared type

    #[test]
    fn from_json_bool_accepts_bool() {
        let value = PolicyValue::from_json(&json!(true), ValueType::Bool).unwrap();
        assert_eq!(value, PolicyValue::Bool(true));
    }

    #[test]
    fn from_json_bool_accepts_zero_and_one() {
        assert_eq!(
            PolicyValue::from_json(&json!(1), ValueType::Bool).unwrap(),
            PolicyValue::Bool(true)
        );
        assert_eq!(
            PolicyValue::from_json(&json!(0), ValueType::Bool).unwrap(),
            PolicyValue::Bool(false)
        );
    }

    #[test]
    fn from_json_bool_rejects_other_numbers() {
        assert!(PolicyValue::from_json(&json!(2), ValueType::Bool).is_err());
    }

    #[test]
    fn from_json_bool_rejects_strings() {
        assert!(PolicyValue::from_json(&json!("true"), ValueType::Bool).is_err());
    }

    #[test]
    fn from_json_int_accepts_number_and_bool() {
        assert_eq!(
            PolicyValue::from_json(&json!(255), ValueType::Int).unwrap(),
            PolicyValue::Int(255)
        );
        assert_eq!(
            PolicyValue::from_json(&json!(true), ValueType::Int).unwrap(),
            PolicyValue::Int(1)
        );
    }

    #[test]
    fn from_json_int_rejects_strings() {
        assert!(PolicyValue::from_json(&json!("42"), ValueType::Int).is_err());
    }

    #[test]
    fn from_json_string_accepts_only_strings() {
        assert_eq!(
            PolicyValue::from_json(&json!("900"), ValueType::String).unwrap(),
            PolicyValue::String("900".to_string())
        );
        assert!(PolicyValue::from_json(&json!(900), ValueType::String).is_err());
    }

    #[test]
    fn from_json_binary_accepts_byte_arrays() {
        assert_eq!(
            PolicyValue::from_json(&json!([0, 127, 255]), ValueType::Binary).unwrap(),
            PolicyValue::Binary(vec![0, 127, 255])
        );
        assert!(PolicyValue::from_json(&json!([0, 256]), ValueType::Binary).is_err());
        assert!(PolicyValue::from_json(&json!("00ff"), ValueType::Binary).is_err());
    }

    // Lossless normalization

    #[test]
    fn coerce_to_same_type_is_identity() {
        let value = PolicyValue::Int(42);
        assert_eq!(value.coerce_to(ValueType::Int), Some(PolicyValue::Int(42)));
    }

    #[test]
    fn coerce_to_bool_accepts_zero_and_one_only() {
        assert_eq!(
            PolicyValue::Int(1).coerce_to(ValueType::Bool),
            Some(PolicyValue::Bool(true))
        );
        assert_eq!(
            PolicyValue::Int(0).coerce_to(ValueType::Bool),
            Some(PolicyValue::Bool(false))
        );
        assert_eq!(PolicyValue::Int(2).coerce_to(ValueType::Bool), None);
    }

    #[test]
    fn coerce_to_int_accepts_bool() {
        assert_eq!(
            PolicyValue::Bool(true).coerce_to(ValueType::Int),
            Some(PolicyValue::Int(1))
        );
    }

    #[test]
    fn coerce_to_never_crosses_string_boundaries() {
        assert_eq!(
            PolicyValue::String("1".to_string()).coerce_to(ValueType::Bool),
            None
        );
        assert_eq!(PolicyValue::Int(1).coerce_to(ValueType::String), None);
    }

    // Display

    #[test]
    fn display_formats_each_variant() {
        assert_eq!(PolicyValue::Bool(true).to_string(), "true");
        assert_eq!(PolicyValue::Int(255).to_string(), "255");
        assert_eq!(PolicyValue::String("none".to_string()).to_string(), "\"none\"");
        assert_eq!(PolicyValue::Binary(vec![0xde, 0xad]).to_string(), "0xdead");
    }
}
