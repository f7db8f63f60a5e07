//! Tool parameter schemas and captured parameter values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// A single value of a tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Number(f64),
    Choice(String),
}

impl ParamValue {
    /// Parse a command-line style value (`true`, `42`, `png`).
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => Self::Flag(true),
            "false" => Self::Flag(false),
            _ => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() => Self::Number(n),
                _ => Self::Choice(raw.to_string()),
            },
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Choice(value.to_string())
    }
}

/// One entry of an enum parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Kind and bounds of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    Number { min: f64, max: f64, step: f64 },
    Enum { choices: Vec<Choice> },
    Boolean,
}

/// Schema entry for one tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamSpec {
    /// Integer-stepped number parameter.
    pub fn number(key: &str, label: &str, min: f64, max: f64, default: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ParamKind::Number { min, max, step: 1.0 },
            default: ParamValue::Number(default.clamp(min, max)),
        }
    }

    /// Enum parameter from `(value, label)` pairs.
    pub fn choice(key: &str, label: &str, choices: &[(&str, &str)], default: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ParamKind::Enum {
                choices: choices.iter().map(|(v, l)| Choice::new(*v, *l)).collect(),
            },
            default: ParamValue::Choice(default.to_string()),
        }
    }

    /// Boolean parameter.
    pub fn flag(key: &str, label: &str, default: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ParamKind::Boolean,
            default: ParamValue::Flag(default),
        }
    }

    /// Check a value against this spec, returning the reason on mismatch.
    pub fn check(&self, value: &ParamValue) -> Result<(), String> {
        match (&self.kind, value) {
            (ParamKind::Number { min, max, .. }, ParamValue::Number(n)) => {
                if !n.is_finite() {
                    Err("not a finite number".to_string())
                } else if n < min || n > max {
                    Err(format!("{} is outside {}..={}", n, min, max))
                } else {
                    Ok(())
                }
            }
            (ParamKind::Enum { choices }, ParamValue::Choice(c)) => {
                if choices.iter().any(|choice| &choice.value == c) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of the offered choices", c))
                }
            }
            (ParamKind::Boolean, ParamValue::Flag(_)) => Ok(()),
            (ParamKind::Number { .. }, _) => Err("expected a number".to_string()),
            (ParamKind::Enum { .. }, _) => Err("expected a choice".to_string()),
            (ParamKind::Boolean, _) => Err("expected true or false".to_string()),
        }
    }
}

/// Parameter values captured for one transform invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamValues {
    values: BTreeMap<String, ParamValue>,
}

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for every entry of a schema.
    pub fn defaults_of(schema: &[ParamSpec]) -> Self {
        Self {
            values: schema
                .iter()
                .map(|spec| (spec.key.clone(), spec.default.clone()))
                .collect(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn number(&self, key: &str) -> Result<f64, TransformError> {
        match self.values.get(key) {
            Some(ParamValue::Number(n)) => Ok(*n),
            Some(_) => Err(TransformError::InvalidParameter(format!("{} is not a number", key))),
            None => Err(missing(key)),
        }
    }

    pub fn choice(&self, key: &str) -> Result<&str, TransformError> {
        match self.values.get(key) {
            Some(ParamValue::Choice(c)) => Ok(c),
            Some(_) => Err(TransformError::InvalidParameter(format!("{} is not a choice", key))),
            None => Err(missing(key)),
        }
    }

    pub fn flag(&self, key: &str) -> Result<bool, TransformError> {
        match self.values.get(key) {
            Some(ParamValue::Flag(b)) => Ok(*b),
            Some(_) => Err(TransformError::InvalidParameter(format!("{} is not a flag", key))),
            None => Err(missing(key)),
        }
    }
}

fn missing(key: &str) -> TransformError {
    TransformError::InvalidParameter(format!("{} is missing", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(ParamValue::parse("true"), ParamValue::Flag(true));
        assert_eq!(ParamValue::parse("75"), ParamValue::Number(75.0));
        assert_eq!(ParamValue::parse("webp"), ParamValue::Choice("webp".to_string()));
        assert_eq!(ParamValue::parse("NaN"), ParamValue::Choice("NaN".to_string()));
    }

    #[test]
    fn test_check_number_bounds() {
        let spec = ParamSpec::number("scale", "Scale", 10.0, 200.0, 100.0);
        assert!(spec.check(&ParamValue::Number(10.0)).is_ok());
        assert!(spec.check(&ParamValue::Number(200.0)).is_ok());
        assert!(spec.check(&ParamValue::Number(9.0)).is_err());
        assert!(spec.check(&ParamValue::Number(f64::NAN)).is_err());
        assert!(spec.check(&ParamValue::Flag(true)).is_err());
    }

    #[test]
    fn test_check_choice() {
        let spec = ParamSpec::choice("format", "Format", &[("jpg", "JPG"), ("png", "PNG")], "jpg");
        assert!(spec.check(&"png".into()).is_ok());
        assert!(spec.check(&"gif".into()).is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let values = ParamValues::new().with("quality", 80u32).with("lossy", true);
        assert_eq!(values.number("quality").unwrap(), 80.0);
        assert!(values.flag("lossy").unwrap());
        assert!(matches!(
            values.choice("quality"),
            Err(TransformError::InvalidParameter(_))
        ));
        assert!(values.number("missing").is_err());
    }
}
