//! variable value representation
//!
//! The normalized inventory model carries the following data types
//! - null (a variable explicitly set to nothing)
//! - boolean (true/false)
//! - integer (signed, currently: i64 - may change)
//! - decimal (currently: f64 - may change)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Values enter the system from two directions: YAML documents (inventory
//! files and side-car vars files) via [From]<[serde_yaml::Value]>, and the
//! strict key/value grammar, where every scalar is either an integer literal
//! or a string.
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// A free-form variable mapping, insertion order preserved.
pub type VarsMap = indexmap::IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(VarsMap),
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<serde_yaml::Number> for Value {
    fn from(value: serde_yaml::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        Value::Decimal(
            value
                .as_f64()
                .expect("a numeric value that is not an integer must be a float"),
        )
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(bool) => bool.into(),
            Yaml::Number(num) => num.into(),
            Yaml::String(s) => s.into(),
            Yaml::Sequence(seq) => Value::Array(seq.into_iter().map(Into::into).collect()),
            Yaml::Mapping(mapping) => {
                let mut object = VarsMap::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let Some(key) = scalar_key(&key) else {
                        tracing::debug!("dropping mapping entry with a non-scalar key");
                        continue;
                    };
                    object.insert(key, value.into());
                }
                Value::Object(object)
            }
            Yaml::Tagged(tagged) => tagged.value.into(),
        }
    }
}

/// Render a YAML mapping key as a string key. Collection keys have no
/// string form and yield [None].
pub(crate) fn scalar_key(key: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Bool(bool) => Some(bool.to_string()),
        Yaml::Number(num) => Some(num.to_string()),
        Yaml::Null => Some("null".to_string()),
        _ => None,
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

/// Utility macro to create a [VarsMap]
///
/// ```
/// use ainv::vars;
///
/// let map = vars! {
///     "port" => 22,
///     "role" => "edge",
/// };
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! vars {
    {} => {
        $crate::value::VarsMap::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {{
        let mut map = $crate::value::VarsMap::new();
        $(
            map.insert(String::from($key), $crate::value::Value::from($value));
        )+
        map
    }};
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn yaml_scalars_convert() {
        let doc: serde_yaml::Value = serde_yaml::from_str("[~, true, 42, 4.5, text]").unwrap();
        assert_eq!(
            Value::from(doc),
            Value::Array(vec![
                Value::Null,
                Value::Boolean(true),
                Value::Integer(42),
                Value::Decimal(4.5),
                Value::String("text".to_string()),
            ])
        );
    }

    #[test]
    fn yaml_mappings_preserve_order() {
        let doc: serde_yaml::Value = serde_yaml::from_str("{z: 1, a: 2, m: 3}").unwrap();
        let Value::Object(object) = Value::from(doc) else {
            panic!("expected an object");
        };
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn non_string_scalar_keys_are_stringified() {
        let doc: serde_yaml::Value = serde_yaml::from_str("{10: ten, true: yes}").unwrap();
        let Value::Object(object) = Value::from(doc) else {
            panic!("expected an object");
        };
        assert!(object.contains_key("10"));
        assert!(object.contains_key("true"));
    }

    #[test]
    fn null_serializes_as_unit() {
        assert_eq!(serde_yaml::to_string(&Value::Null).unwrap().trim(), "null");
    }
}
