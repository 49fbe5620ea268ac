//! normalized host/group records and the variable merge engine
//!
//! [normalize] folds variable layers into a [NormalizedRecord]:
//!
//! | precedence (low → high) | source                        |
//! |-------------------------|-------------------------------|
//! | structural defaults     | null / empty / inventory name |
//! | inline `vars`           | the inventory file itself     |
//! | side-car vars           | host_vars / group_vars        |
//!
//! Reserved variable names get a dedicated typed slot on the record;
//! everything else lands in the free-form `data` bag.
use crate::value::{Value, VarsMap};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Variable names with a dedicated slot on [NormalizedRecord].
pub const RESERVED_FIELDS: &[&str] = &[
    "hostname",
    "port",
    "username",
    "password",
    "platform",
    "connection_options",
];

/// Source-specific variable names renamed to their reserved counterpart.
pub const ALIAS_FIELDS: &[(&str, &str)] = &[
    ("ansible_host", "hostname"),
    ("ansible_port", "port"),
    ("ansible_user", "username"),
    ("ansible_password", "password"),
];

/// One host, group or defaults record after the merge.
///
/// `connection_options` stays a raw mapping here; it becomes typed during
/// assembly (see [crate::inventory]).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    pub connection_options: VarsMap,
    pub data: VarsMap,
    /// Parent group names. Unused on the defaults record.
    pub groups: Vec<String>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("invalid value for reserved field {field:?}: expected {expected}")]
    InvalidFieldValue {
        field: &'static str,
        expected: &'static str,
    },
}

/// Rename alias keys to their reserved counterpart, in place. The rename is
/// destructive: an already-present reserved key is overwritten.
pub fn map_reserved_aliases(vars: &mut VarsMap) {
    for (alias, reserved) in ALIAS_FIELDS {
        if let Some(value) = vars.shift_remove(*alias) {
            tracing::trace!(alias, reserved, "mapping reserved alias");
            vars.insert((*reserved).to_string(), value);
        }
    }
}

/// Merge a variable layer pair into `record`. `file_vars` is merged after
/// `inline_vars` and therefore wins on key collision.
///
/// `implicit_hostname` (host records only) keeps an un-aliased host
/// reachable by its inventory name.
pub fn normalize(
    record: &mut NormalizedRecord,
    mut inline_vars: VarsMap,
    mut file_vars: VarsMap,
    implicit_hostname: Option<&str>,
) -> Result<(), RecordError> {
    map_reserved_aliases(&mut inline_vars);
    map_reserved_aliases(&mut file_vars);

    merge_vars(record, inline_vars)?;
    merge_vars(record, file_vars)?;

    if record.hostname.is_none() {
        if let Some(hostname) = implicit_hostname {
            record.hostname = Some(hostname.to_string());
        }
    }

    Ok(())
}

fn merge_vars(record: &mut NormalizedRecord, vars: VarsMap) -> Result<(), RecordError> {
    for (key, value) in vars {
        match key.as_str() {
            "hostname" => record.hostname = string_field("hostname", value)?,
            "port" => record.port = port_field(value)?,
            "username" => record.username = string_field("username", value)?,
            "password" => record.password = string_field("password", value)?,
            "platform" => record.platform = string_field("platform", value)?,
            "connection_options" => {
                record.connection_options = mapping_field("connection_options", value)?;
            }
            _ => {
                record.data.insert(key, value);
            }
        }
    }
    Ok(())
}

pub(crate) fn string_field(
    field: &'static str,
    value: Value,
) -> Result<Option<String>, RecordError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(RecordError::InvalidFieldValue {
            field,
            expected: "a string",
        }),
    }
}

pub(crate) fn port_field(value: Value) -> Result<Option<u16>, RecordError> {
    let invalid = || RecordError::InvalidFieldValue {
        field: "port",
        expected: "an integer in 0..=65535",
    };

    match value {
        Value::Null => Ok(None),
        Value::Integer(int) => u16::try_from(int).map(Some).map_err(|_| invalid()),
        Value::String(s) => s.parse::<u16>().map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn mapping_field(field: &'static str, value: Value) -> Result<VarsMap, RecordError> {
    match value {
        Value::Null => Ok(VarsMap::new()),
        Value::Object(map) => Ok(map),
        _ => Err(RecordError::InvalidFieldValue {
            field,
            expected: "a mapping",
        }),
    }
}

impl NormalizedRecord {
    fn serialize_fields<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        map.serialize_entry("hostname", &self.hostname)?;
        map.serialize_entry("port", &self.port)?;
        map.serialize_entry("username", &self.username)?;
        map.serialize_entry("password", &self.password)?;
        map.serialize_entry("platform", &self.platform)?;
        map.serialize_entry("connection_options", &VarsView(&self.connection_options))?;
        map.serialize_entry("data", &VarsView(&self.data))?;
        Ok(())
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(8))?;
        self.serialize_fields(&mut map)?;
        map.serialize_entry("groups", &self.groups)?;
        map.end()
    }
}

/// [NormalizedRecord] serialization without the groups list, for the
/// defaults record which has no parents.
pub struct DefaultsView<'a>(pub &'a NormalizedRecord);

impl Serialize for DefaultsView<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(7))?;
        self.0.serialize_fields(&mut map)?;
        map.end()
    }
}

/// Serialize adapter for a bare [VarsMap].
pub(crate) struct VarsView<'a>(pub(crate) &'a VarsMap);

impl Serialize for VarsView<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vars;
    use pretty_assertions::assert_eq;

    #[test]
    fn aliases_rename_destructively() {
        let mut mapped = vars! {
            "hostname" => "stale",
            "ansible_host" => "10.0.0.1",
            "ansible_port" => 22,
            "ansible_user" => "admin",
            "ansible_password" => "hunter2",
            "other" => "kept",
        };
        map_reserved_aliases(&mut mapped);

        assert_eq!(
            mapped,
            vars! {
                "other" => "kept",
                "hostname" => "10.0.0.1",
                "port" => 22,
                "username" => "admin",
                "password" => "hunter2",
            }
        );
    }

    #[test]
    fn reserved_fields_split_from_data() {
        let mut record = NormalizedRecord::default();
        normalize(
            &mut record,
            vars! { "ansible_host" => "10.0.0.1", "custom" => "spam" },
            vars! {},
            Some("host1"),
        )
        .expect("must normalize");

        assert_eq!(record.hostname.as_deref(), Some("10.0.0.1"));
        assert_eq!(record.data, vars! { "custom" => "spam" });
        assert!(!record.data.contains_key("hostname"));
    }

    #[test]
    fn file_vars_override_inline_vars() {
        let mut record = NormalizedRecord::default();
        normalize(
            &mut record,
            vars! { "port" => 22, "role" => "frontend" },
            vars! { "port" => 2222 },
            None,
        )
        .expect("must normalize");

        assert_eq!(record.port, Some(2222));
        assert_eq!(record.data, vars! { "role" => "frontend" });
    }

    #[test]
    fn unset_hostname_falls_back_to_inventory_name() {
        let mut record = NormalizedRecord::default();
        normalize(&mut record, vars! {}, vars! {}, Some("host2")).expect("must normalize");

        assert_eq!(record.hostname.as_deref(), Some("host2"));
        assert_eq!(record.port, None);
        assert_eq!(record.username, None);
        assert_eq!(record.password, None);
        assert_eq!(record.platform, None);
        assert!(record.connection_options.is_empty());
    }

    #[test]
    fn groups_have_no_implicit_hostname() {
        let mut record = NormalizedRecord::default();
        normalize(&mut record, vars! {}, vars! {}, None).expect("must normalize");
        assert_eq!(record.hostname, None);
    }

    #[test]
    fn port_accepts_integer_literal_strings() {
        let mut record = NormalizedRecord::default();
        normalize(&mut record, vars! { "port" => "8080" }, vars! {}, None)
            .expect("must normalize");
        assert_eq!(record.port, Some(8080));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let mut record = NormalizedRecord::default();
        let err = normalize(&mut record, vars! { "port" => 99999 }, vars! {}, None)
            .expect_err("must fail");
        assert_eq!(
            err,
            RecordError::InvalidFieldValue {
                field: "port",
                expected: "an integer in 0..=65535"
            }
        );
    }

    #[test]
    fn connection_options_replace_wholesale() {
        let mut record = NormalizedRecord::default();
        normalize(
            &mut record,
            vars! { "connection_options" => Value::Object(vars! { "old" => Value::Object(vars! {}) }) },
            vars! { "connection_options" => Value::Object(vars! { "netconf" => Value::Object(vars! { "port" => 830 }) }) },
            None,
        )
        .expect("must normalize");

        assert!(!record.connection_options.contains_key("old"));
        assert!(record.connection_options.contains_key("netconf"));
    }
}
