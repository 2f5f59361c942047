//! Variable value map
//!
//! Keys are raw variable names (not canonicalized). Peers on the sync
//! channel may run other app versions, so values arriving over the wire go
//! through [`lenient`]: numbers and booleans are stringified, `null` entries
//! are dropped, nested values are discarded.

use std::collections::BTreeMap;

use serde_json::Value;

/// Raw variable name -> value
pub type VariableMap = BTreeMap<String, String>;

/// Stringify a JSON scalar the way a loosely typed peer would
fn stringify_scalar(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Build a [`VariableMap`] from an arbitrary JSON object
pub fn from_json_object(raw: BTreeMap<String, Value>) -> VariableMap {
    raw.into_iter()
        .filter_map(|(key, value)| stringify_scalar(value).map(|v| (key, v)))
        .collect()
}

/// Serde adapter: `#[serde(with = "varkit::lenient")]`
pub mod lenient {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use super::{VariableMap, from_json_object};

    pub fn serialize<S: Serializer>(map: &VariableMap, serializer: S) -> Result<S::Ok, S::Error> {
        map.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<VariableMap, D::Error> {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
        Ok(raw.map(from_json_object).unwrap_or_default())
    }

    /// Same adapter for optional snapshots
    pub mod option {
        use std::collections::BTreeMap;

        use serde::{Deserialize, Deserializer, Serialize, Serializer};
        use serde_json::Value;

        use super::super::{VariableMap, from_json_object};

        pub fn serialize<S: Serializer>(map: &Option<VariableMap>, serializer: S) -> Result<S::Ok, S::Error> {
            map.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<VariableMap>, D::Error> {
            let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
            Ok(raw.map(from_json_object))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Snapshot {
        #[serde(default, with = "lenient")]
        variables: VariableMap,
        #[serde(default, with = "lenient::option")]
        previous: Option<VariableMap>,
    }

    #[test]
    fn test_lenient_stringifies_scalars_and_drops_nulls() {
        let json = r#"{"variables":{"a":"x","b":3,"c":true,"d":null,"e":[1],"f":{"g":1}}}"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.variables.get("a").unwrap(), "x");
        assert_eq!(snap.variables.get("b").unwrap(), "3");
        assert_eq!(snap.variables.get("c").unwrap(), "true");
        assert!(!snap.variables.contains_key("d"));
        assert!(!snap.variables.contains_key("e"));
        assert!(!snap.variables.contains_key("f"));
        assert!(snap.previous.is_none());
    }

    #[test]
    fn test_lenient_null_map_is_empty() {
        let snap: Snapshot = serde_json::from_str(r#"{"variables":null,"previous":{"a":1.5}}"#).unwrap();
        assert!(snap.variables.is_empty());
        assert_eq!(snap.previous.unwrap().get("a").unwrap(), "1.5");
    }
}
