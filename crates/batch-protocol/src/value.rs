//! The variant value type carried in operations and load results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EntityPath;

/// A value that can be sent to/from the host.
///
/// Range contents travel as a `List` of row `List`s. `Ref` passes another
/// remote object as a method argument and is keyed `$ref` on the wire;
/// objects may not use that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Ref {
        #[serde(rename = "$ref")]
        entity: EntityPath,
    },
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_ref_path(&self) -> Option<&EntityPath> {
        match self {
            Value::Ref { entity } => Some(entity),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// A short name for the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Ref { .. } => "reference",
            Value::Object(_) => "object",
        }
    }

    /// Build a row-major matrix from rows of convertible cells.
    pub fn matrix<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<Value>,
    {
        Value::List(
            rows.into_iter()
                .map(|row| Value::List(row.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "<null>"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Ref { entity } => write!(f, "<{entity}>"),
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integers_arrive_as_numbers() {
        let v: Value = serde_json::from_str("[120, 142.33, null, true, \"x\"]").unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Number(120.0),
                Value::Number(142.33),
                Value::Null,
                Value::Bool(true),
                Value::String("x".into()),
            ])
        );
    }

    #[test]
    fn test_matrix_builder() {
        let m = Value::matrix([["Date", "Merchant"]]);
        assert_eq!(m.to_string(), r#"[["Date", "Merchant"]]"#);
        assert_eq!(m.as_list().map(<[Value]>::len), Some(1));
    }

    #[test]
    fn test_object_roundtrip_shape() {
        let v: Value = serde_json::from_str(r#"{"criteria":["Education"]}"#).unwrap();
        let map = v.as_object().unwrap();
        assert_eq!(map["criteria"].as_list().unwrap()[0].as_str(), Some("Education"));
        assert_eq!(v.type_name(), "object");
    }

    #[test]
    fn test_reference_is_not_an_object() {
        let v: Value =
            serde_json::from_str(r#"{"$ref":{"root":{"kind":"OpResult","op":3}}}"#).unwrap();
        assert_eq!(
            v.as_ref_path(),
            Some(&EntityPath::op_result(crate::OpId(3)))
        );
    }

    #[test]
    fn test_object_with_entity_key_stays_an_object() {
        let path = serde_json::to_value(EntityPath::op_result(crate::OpId(3))).unwrap();
        let json = serde_json::json!({ "entity": path });
        let v: Value = serde_json::from_value(json).unwrap();
        assert_eq!(v.type_name(), "object");
        assert!(v.as_object().unwrap().contains_key("entity"));

        let r = Value::Ref {
            entity: EntityPath::op_result(crate::OpId(3)),
        };
        let wire = serde_json::to_value(&r).unwrap();
        assert!(wire.get("$ref").is_some());
        assert_eq!(serde_json::from_value::<Value>(wire).unwrap(), r);
    }
}
