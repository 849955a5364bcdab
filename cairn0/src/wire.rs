//! The engine's value encoding.
//!
//! [`WireValue`] mirrors JSON plus two markers the engine understands: an
//! explicit "unknown" (the value is not determinable during preview) and a
//! "secret" wrapper. Converting an [`OutputData`] into a `WireValue` and back
//! keeps both flags.
//!
//! On the JSON form, unknown is a sentinel string and secret is an object
//! tagged with a signature key, matching the engine's special-signature
//! convention.

use crate::output::{DependencySet, OutputData};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// A resource's properties in wire form.
pub type PropertyBag = BTreeMap<String, WireValue>;

/// Sentinel string standing for an unknown value.
pub const UNKNOWN_SENTINEL: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";

/// Key marking an object as a special-signature value.
pub const SIGNATURE_KEY: &str = "4dabf18193072939515e22adb298388d";

/// Signature value for secrets.
pub const SECRET_SIGNATURE: &str = "1b47061264138c4ac30d75fd1eb44270";

/// A JSON-like value plus explicit unknown and secret markers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WireValue {
    /// JSON null.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. The engine only speaks doubles.
    Number(f64),
    /// A string.
    String(String),
    /// An ordered list.
    Array(Vec<WireValue>),
    /// A string-keyed map.
    Object(BTreeMap<String, WireValue>),
    /// Not determinable yet (preview).
    Unknown,
    /// A value to be withheld from logs and state in plaintext.
    Secret(Box<WireValue>),
}

impl WireValue {
    /// Wrap a value as secret. Wrapping an already-secret value is a no-op.
    pub fn secret(value: WireValue) -> Self {
        match value {
            secret @ WireValue::Secret(_) => secret,
            other => WireValue::Secret(Box::new(other)),
        }
    }

    /// Convert any serializable value. Secret and unknown markers embedded
    /// as their JSON signatures are recognised.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::from_json(serde_json::to_value(value)?))
    }

    /// Deserialize into a plain Rust type. Fails on unknown or secret
    /// markers; lift them with [`WireValue::into_output_data`] first.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }

    /// Borrow the string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow the map, if this is an object.
    pub fn as_object(&self) -> Option<&BTreeMap<String, WireValue>> {
        match self {
            WireValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Whether this is the unknown marker.
    pub fn is_unknown(&self) -> bool {
        matches!(self, WireValue::Unknown)
    }

    /// Whether this is wrapped as secret at the top level.
    pub fn is_secret(&self) -> bool {
        matches!(self, WireValue::Secret(_))
    }

    /// Whether an unknown marker appears anywhere inside.
    pub fn contains_unknowns(&self) -> bool {
        match self {
            WireValue::Unknown => true,
            WireValue::Secret(inner) => inner.contains_unknowns(),
            WireValue::Array(items) => items.iter().any(WireValue::contains_unknowns),
            WireValue::Object(map) => map.values().any(WireValue::contains_unknowns),
            _ => false,
        }
    }

    /// Whether a secret marker appears anywhere inside.
    pub fn contains_secrets(&self) -> bool {
        match self {
            WireValue::Secret(_) => true,
            WireValue::Array(items) => items.iter().any(WireValue::contains_secrets),
            WireValue::Object(map) => map.values().any(WireValue::contains_secrets),
            _ => false,
        }
    }

    /// Remove every secret marker, keeping the wrapped values.
    pub fn strip_secrets(self) -> WireValue {
        match self {
            WireValue::Secret(inner) => inner.strip_secrets(),
            WireValue::Array(items) => {
                WireValue::Array(items.into_iter().map(WireValue::strip_secrets).collect())
            }
            WireValue::Object(map) => WireValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.strip_secrets()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Decode into output data: any nested unknown makes the whole value
    /// unknown, any nested secret makes it secret. Dependencies are empty;
    /// the caller attaches them.
    pub fn into_output_data(self) -> OutputData<WireValue> {
        let secret = self.contains_secrets();
        if self.contains_unknowns() {
            return OutputData::unknown().with_secret(secret);
        }
        OutputData::new(Some(self.strip_secrets()), true, secret, DependencySet::new())
    }

    /// Encode output data. Unknown becomes [`WireValue::Unknown`], secret
    /// wraps the result, an absent known value becomes `Null`.
    pub fn from_output_data(data: &OutputData<WireValue>) -> Self {
        let plain = if data.is_known() {
            data.value().cloned().unwrap_or(WireValue::Null)
        } else {
            WireValue::Unknown
        };
        if data.is_secret() {
            WireValue::secret(plain)
        } else {
            plain
        }
    }

    /// Encode as JSON using the engine's sentinels.
    ///
    /// JSON has no representation for NaN or the infinities, so a
    /// non-finite [`WireValue::Number`] encodes as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            WireValue::Null => Value::Null,
            WireValue::Bool(b) => Value::Bool(*b),
            WireValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            WireValue::String(s) => Value::String(s.clone()),
            WireValue::Array(items) => Value::Array(items.iter().map(WireValue::to_json).collect()),
            WireValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            WireValue::Unknown => Value::String(UNKNOWN_SENTINEL.to_owned()),
            WireValue::Secret(inner) => {
                let mut object = serde_json::Map::new();
                object.insert(
                    SIGNATURE_KEY.to_owned(),
                    Value::String(SECRET_SIGNATURE.to_owned()),
                );
                object.insert("value".to_owned(), inner.to_json());
                Value::Object(object)
            }
        }
    }

    /// Decode JSON, recognising the engine's sentinels.
    ///
    /// Numbers decode as `f64`; one that has no `f64` form decodes as
    /// [`WireValue::Null`].
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => WireValue::Null,
            Value::Bool(b) => WireValue::Bool(b),
            Value::Number(n) => n.as_f64().map(WireValue::Number).unwrap_or(WireValue::Null),
            Value::String(s) if s == UNKNOWN_SENTINEL => WireValue::Unknown,
            Value::String(s) => WireValue::String(s),
            Value::Array(items) => WireValue::Array(items.into_iter().map(WireValue::from_json).collect()),
            Value::Object(mut object) => {
                let is_secret = object
                    .get(SIGNATURE_KEY)
                    .and_then(Value::as_str)
                    .is_some_and(|sig| sig == SECRET_SIGNATURE);
                if is_secret {
                    let inner = object.remove("value").unwrap_or(Value::Null);
                    WireValue::secret(WireValue::from_json(inner))
                } else {
                    WireValue::Object(
                        object
                            .into_iter()
                            .map(|(k, v)| (k, WireValue::from_json(v)))
                            .collect(),
                    )
                }
            }
        }
    }
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(WireValue::from_json)
    }
}

impl From<serde_json::Value> for WireValue {
    fn from(value: serde_json::Value) -> Self {
        WireValue::from_json(value)
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        WireValue::Bool(b)
    }
}

impl From<f64> for WireValue {
    fn from(n: f64) -> Self {
        WireValue::Number(n)
    }
}

impl From<i64> for WireValue {
    fn from(n: i64) -> Self {
        WireValue::Number(n as f64)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::String(s.to_owned())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::String(s)
    }
}

impl<T: Into<WireValue>> From<Vec<T>> for WireValue {
    fn from(items: Vec<T>) -> Self {
        WireValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<PropertyBag> for WireValue {
    fn from(map: PropertyBag) -> Self {
        WireValue::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_encodes_as_sentinel() {
        assert_eq!(WireValue::Unknown.to_json(), json!(UNKNOWN_SENTINEL));
        assert_eq!(WireValue::from_json(json!(UNKNOWN_SENTINEL)), WireValue::Unknown);
    }

    #[test]
    fn secret_encodes_with_signature() {
        let wire = WireValue::secret("hunter2".into());
        let encoded = wire.to_json();
        assert_eq!(encoded[SIGNATURE_KEY], json!(SECRET_SIGNATURE));
        assert_eq!(encoded["value"], json!("hunter2"));
        assert_eq!(WireValue::from_json(encoded), wire);
    }

    #[test]
    fn secret_does_not_double_wrap() {
        let once = WireValue::secret(WireValue::Bool(true));
        let twice = WireValue::secret(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_markers_lift_to_top_level() {
        let wire = WireValue::Object(PropertyBag::from([
            ("a".to_owned(), WireValue::secret("s".into())),
            ("b".to_owned(), WireValue::Number(1.0)),
        ]));
        let data = wire.into_output_data();
        assert!(data.is_known());
        assert!(data.is_secret());
        let value = data.value().unwrap().as_object().unwrap();
        assert_eq!(value["a"], WireValue::String("s".into()));

        let unknown = WireValue::Array(vec![WireValue::Unknown, WireValue::Null]);
        let data = unknown.into_output_data();
        assert!(!data.is_known());
        assert!(data.value().is_none());
    }

    #[test]
    fn secret_unknown_keeps_both_flags() {
        let data = OutputData::<WireValue>::unknown().with_secret(true);
        let wire = WireValue::from_output_data(&data);
        assert_eq!(wire, WireValue::Secret(Box::new(WireValue::Unknown)));
        let back = wire.into_output_data();
        assert!(!back.is_known());
        assert!(back.is_secret());
    }

    #[test]
    fn serde_round_trips_through_json_text() {
        let wire = WireValue::Object(PropertyBag::from([
            ("password".to_owned(), WireValue::secret("pw".into())),
            ("size".to_owned(), WireValue::Number(3.0)),
            ("arn".to_owned(), WireValue::Unknown),
        ]));
        let text = serde_json::to_string(&wire).unwrap();
        let back: WireValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, wire);
    }

    #[test]
    fn non_finite_numbers_encode_as_null() {
        assert_eq!(WireValue::Number(f64::NAN).to_json(), json!(null));
        assert_eq!(WireValue::Number(f64::INFINITY).to_json(), json!(null));
        assert_eq!(
            WireValue::Array(vec![WireValue::Number(1.5), WireValue::Number(f64::NEG_INFINITY)])
                .to_json(),
            json!([1.5, null])
        );
    }
}
