//! Conversions between JSON state and typed models.
//!
//! Nested blocks with single nesting are stored as JSON objects;
//! [`single_block`] also accepts the one-element list form some hosts send.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::id::Id;

/// Decode a state or config value into a model. `null` decodes as `{}`.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    let value = if value.is_null() { json!({}) } else { value };
    Ok(serde_json::from_value(value)?)
}

/// Encode a model back into state.
pub(crate) fn encode<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

/// The entity ID stored in a state's `id` field.
pub(crate) fn state_id(id: &Option<String>) -> Result<Id, ProviderError> {
    match non_empty(id) {
        Some(id) => Ok(Id::parse(id)?),
        None => Err(ProviderError::Validation("\"id\": not set".to_string())),
    }
}

/// The string, unless it is unset or empty.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Serde adapter for single-nesting blocks.
///
/// Reads `null`, `[]`, an object, or a one-element list of objects.
/// Writes the object form.
pub(crate) mod single_block {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
            other => other,
        };
        if value.is_null() {
            return Ok(None);
        }
        T::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Inner {
        role: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Outer {
        #[serde(deserialize_with = "single_block::deserialize")]
        infra: Option<Inner>,
    }

    #[test]
    fn test_single_block_forms() {
        let inner = || Some(Inner { role: "admin".into() });

        let outer: Outer = decode(json!({"infra": {"role": "admin"}})).unwrap();
        assert_eq!(outer.infra, inner());
        let outer: Outer = decode(json!({"infra": [{"role": "admin"}]})).unwrap();
        assert_eq!(outer.infra, inner());
        let outer: Outer = decode(json!({"infra": []})).unwrap();
        assert_eq!(outer.infra, None);
        let outer: Outer = decode(json!({"infra": null})).unwrap();
        assert_eq!(outer.infra, None);
        let outer: Outer = decode(Value::Null).unwrap();
        assert_eq!(outer.infra, None);
    }

    #[test]
    fn test_state_id() {
        assert_eq!(state_id(&Some("2".into())).unwrap(), Id::new(1));
        assert!(state_id(&None).is_err());
        assert!(state_id(&Some(String::new())).is_err());
    }
}
