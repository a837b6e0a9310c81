//! Raw layered configuration as read from a descriptor or file
//!
//! A layered section looks like `{default: {...}, <stage>: {...}}`. Each layer
//! maps keys to scalars or, one level deep, to a named scope of scalars.

use deployenv_core::{Error, Result, DEFAULT_LAYER};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single layer entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Literal or secret reference, not yet interpreted
    Literal(String),
    /// Named scope such as `lambda` holding its own key/value pairs
    Scope(BTreeMap<String, String>),
}

/// Keys of one layer (`default` or a stage)
pub type RawLayer = BTreeMap<String, RawValue>;

/// Immutable mapping from layer name to layer contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfig {
    layers: BTreeMap<String, RawLayer>,
}

impl RawConfig {
    #[must_use]
    pub fn new(layers: BTreeMap<String, RawLayer>) -> Self {
        Self { layers }
    }

    /// Parse a layered section. `section` names it in error messages.
    pub fn from_value(value: &Value, section: &str) -> Result<Self> {
        let object = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            other => {
                return Err(Error::configuration(format!(
                    "'{section}' must be a mapping of stage names to layers, found {}",
                    type_name(other)
                )))
            }
        };

        let mut layers = BTreeMap::new();
        for (stage, layer) in object {
            layers.insert(stage.clone(), parse_layer(layer, &format!("{section}.{stage}"))?);
        }
        Ok(Self { layers })
    }

    /// The `default` layer, if present
    #[must_use]
    pub fn default_layer(&self) -> Option<&RawLayer> {
        self.layers.get(DEFAULT_LAYER)
    }

    /// The layer for `stage`, if present
    #[must_use]
    pub fn layer(&self, stage: &str) -> Option<&RawLayer> {
        self.layers.get(stage)
    }

    /// Stage names with a layer, excluding `default`
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.layers
            .keys()
            .map(String::as_str)
            .filter(|name| *name != DEFAULT_LAYER)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

fn parse_layer(value: &Value, path: &str) -> Result<RawLayer> {
    let object = match value {
        Value::Null => return Ok(RawLayer::new()),
        Value::Object(object) => object,
        other => {
            return Err(Error::configuration(format!(
                "layer '{path}' must be a mapping, found {}",
                type_name(other)
            )))
        }
    };

    let mut layer = RawLayer::new();
    for (key, entry) in object {
        let raw = match entry {
            Value::Object(scope) => {
                let mut vars = BTreeMap::new();
                for (scoped_key, scoped_value) in scope {
                    let literal = scalar_to_string(scoped_value)
                        .ok_or_else(|| nested_error(path, &format!("{key}.{scoped_key}"), scoped_value))?;
                    vars.insert(scoped_key.clone(), literal);
                }
                RawValue::Scope(vars)
            }
            other => RawValue::Literal(
                scalar_to_string(other).ok_or_else(|| nested_error(path, key, other))?,
            ),
        };
        layer.insert(key.clone(), raw);
    }
    Ok(layer)
}

/// Scalars become their string form; `null` becomes the empty string
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn nested_error(path: &str, key: &str, value: &Value) -> Error {
    Error::configuration(format!(
        "value at '{path}.{key}' must be a scalar, found {}",
        type_name(value)
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
