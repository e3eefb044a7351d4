//! Typed cell values.
//!
//! Rows are schema-less bags of fields, but each value carries its own tag so
//! the type of a cell is explicit at the boundary.

use crate::{FieldId, Timestamp};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// The fields of a row, keyed by field id.
pub type Fields = BTreeMap<FieldId, FieldValue>;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    /// Always finite; NaN and infinity cannot be encoded
    Number(#[serde(serialize_with = "finite")] f64),
    Boolean(bool),
    /// Milliseconds since epoch
    Date(Timestamp),
    Null,
}

impl FieldValue {
    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    /// Non-finite numbers become [`FieldValue::Null`].
    fn from(value: f64) -> Self {
        if value.is_finite() {
            FieldValue::Number(value)
        } else {
            FieldValue::Null
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

fn finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        Err(S::Error::custom(format!("non-finite number: {value}")))
    }
}

/// Build a [`Fields`] map from `(field, value)` pairs.
pub fn fields<I, K, V>(entries: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<FieldId>,
    V: Into<FieldValue>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(FieldValue::from("x"), FieldValue::Text("x".into()));
        assert_eq!(FieldValue::from(5i64), FieldValue::Number(5.0));
        assert_eq!(FieldValue::from(true), FieldValue::Boolean(true));
        assert_eq!(FieldValue::from(None::<bool>), FieldValue::Null);
    }

    #[test]
    fn type_names() {
        assert_eq!(FieldValue::Date(1000).type_name(), "date");
        assert_eq!(FieldValue::Null.type_name(), "null");
        assert!(FieldValue::Null.is_null());
    }

    #[test]
    fn serialization_format() {
        let json = serde_json::to_string(&FieldValue::Text("hi".into())).unwrap();
        assert_eq!(json, r#"{"text":"hi"}"#);

        let json = serde_json::to_string(&FieldValue::Null).unwrap();
        assert_eq!(json, r#""null""#);

        let parsed: FieldValue = serde_json::from_str(r#"{"date":1706745600000}"#).unwrap();
        assert_eq!(parsed, FieldValue::Date(1706745600000));
    }

    #[test]
    fn non_finite_numbers_are_not_encoded() {
        assert_eq!(FieldValue::from(f64::NAN), FieldValue::Null);
        assert_eq!(FieldValue::from(f64::NEG_INFINITY), FieldValue::Null);
        assert!(serde_json::to_string(&FieldValue::Number(f64::INFINITY)).is_err());
        assert_eq!(
            serde_json::to_string(&FieldValue::Number(2.5)).unwrap(),
            r#"{"number":2.5}"#
        );
    }

    #[test]
    fn fields_builder_orders_keys() {
        let f = fields([("qty", FieldValue::from(1i64)), ("name", "widget".into())]);
        let keys: Vec<_> = f.keys().cloned().collect();
        assert_eq!(keys, vec!["name".to_string(), "qty".to_string()]);
    }
}
