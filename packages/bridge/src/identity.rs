//! # Identity record handed over by the container
//!
//! An [`IdentityRecord`] is whatever the hosting app answers when asked for the
//! current user. The container is not under our control, so the record is kept as
//! an opaque JSON object: only a string `id` is required, every other field is
//! carried verbatim and exposed through read-only accessors.
//!
//! Nothing in a record is trusted until the backend has verified it (see
//! [`crate::handoff`]). In particular `token`, `signature` and `timestamp` are
//! forwarded untouched so the server can check them.
//!
//! | Field | Accessor | Notes |
//! |-------|----------|-------|
//! | `id` | [`IdentityRecord::id`] | required, string |
//! | `name` | [`IdentityRecord::name`] | optional |
//! | `email` | [`IdentityRecord::email`] | optional |
//! | `phone` | [`IdentityRecord::phone`] | optional |
//! | `token` | [`IdentityRecord::token`] | optional, opaque |
//! | `signature` | [`IdentityRecord::signature`] | optional, opaque |
//! | `timestamp` | [`IdentityRecord::timestamp`] | optional, any JSON value |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// User identity as reported by the hosting container.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityRecord {
    fields: Map<String, Value>,
}

impl IdentityRecord {
    /// Build a record from a JSON value.
    ///
    /// The value must be an object with a non-empty string `id`.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(fields) = value else {
            return Err(DecodeError::NotAnObject);
        };
        match fields.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Ok(Self { fields }),
            Some(_) => Err(DecodeError::InvalidId),
            None => Err(DecodeError::MissingId),
        }
    }

    /// Create a record with just an id. Mostly useful for tests and demos.
    pub fn new(id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(id.into()));
        Self { fields }
    }

    /// Builder method to set an arbitrary field. Setting `id` is ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "id" {
            self.fields.insert(key, value.into());
        }
        self
    }

    pub fn id(&self) -> &str {
        self.fields
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    pub fn phone(&self) -> Option<&str> {
        self.str_field("phone")
    }

    pub fn token(&self) -> Option<&str> {
        self.str_field("token")
    }

    pub fn signature(&self) -> Option<&str> {
        self.str_field("signature")
    }

    pub fn timestamp(&self) -> Option<&Value> {
        self.fields.get("timestamp")
    }

    /// Look up any field, including ones the bridge knows nothing about.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or_else(|| self.id())
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl Serialize for IdentityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IdentityRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        IdentityRecord::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requires_string_id() {
        assert!(IdentityRecord::from_value(json!({"id": "u-1"})).is_ok());
        assert_eq!(
            IdentityRecord::from_value(json!({"name": "Ann"})),
            Err(DecodeError::MissingId)
        );
        assert_eq!(
            IdentityRecord::from_value(json!({"id": 42})),
            Err(DecodeError::InvalidId)
        );
        assert_eq!(
            IdentityRecord::from_value(json!({"id": ""})),
            Err(DecodeError::InvalidId)
        );
        assert_eq!(
            IdentityRecord::from_value(json!("u-1")),
            Err(DecodeError::NotAnObject)
        );
    }

    #[test]
    fn test_keeps_unknown_fields() {
        let record = IdentityRecord::from_value(json!({
            "id": "u-7",
            "name": "Mei",
            "signature": "abc",
            "timestamp": 1700000000,
            "district": "Da'an",
        }))
        .unwrap();

        assert_eq!(record.id(), "u-7");
        assert_eq!(record.name(), Some("Mei"));
        assert_eq!(record.email(), None);
        assert_eq!(record.signature(), Some("abc"));
        assert_eq!(record.timestamp(), Some(&json!(1700000000)));
        assert_eq!(record.get("district"), Some(&json!("Da'an")));
        assert_eq!(serde_json::to_value(&record).unwrap()["district"], "Da'an");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let anonymous = IdentityRecord::new("u-9");
        assert_eq!(anonymous.display_name(), "u-9");

        let named = IdentityRecord::new("u-9").with_field("name", "Lin");
        assert_eq!(named.display_name(), "Lin");
    }

    #[test]
    fn test_with_field_cannot_replace_id() {
        let record = IdentityRecord::new("u-1").with_field("id", "spoofed");
        assert_eq!(record.id(), "u-1");
    }

    #[test]
    fn test_deserialize_rejects_missing_id() {
        let parsed: Result<IdentityRecord, _> = serde_json::from_str(r#"{"email":"a@b.c"}"#);
        assert!(parsed.is_err());
    }
}
