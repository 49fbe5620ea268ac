//! typed inventory graph and the two-pass assembler
//!
//! [assemble] converts normalized records into the typed object graph the
//! automation framework consumes. Group membership is resolved in a second
//! pass, after every group object exists, because a group can be referenced
//! before its own node has been visited. A membership entry naming an
//! unregistered group is fatal.
//!
//! [AnsibleInventory] is the front door: it runs detection, walk and merge
//! and keeps the normalized records; [AnsibleInventory::load] assembles the
//! typed [Inventory] from them.
use crate::record::{self, DefaultsView, NormalizedRecord, RecordError};
use crate::source::{self, SourceError};
use crate::value::{Value, VarsMap};
use crate::walker::{ParseOptions, WalkError, Walker};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Reserved-field overrides for one named connection profile.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionOptions {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    pub extras: Option<VarsMap>,
}

/// Global fallback values, produced from the root node's vars.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Defaults {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    pub data: VarsMap,
    pub connection_options: IndexMap<String, ConnectionOptions>,
}

/// Resolved reference to a [Group] owned by the [Inventory].
///
/// Only [assemble] constructs these, so an existing reference always points
/// at a live group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRef(usize);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Host {
    pub name: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    pub data: VarsMap,
    pub groups: Vec<GroupRef>,
    pub connection_options: IndexMap<String, ConnectionOptions>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    pub data: VarsMap,
    pub groups: Vec<GroupRef>,
    pub connection_options: IndexMap<String, ConnectionOptions>,
}

/// The assembled object graph. Owns every host and group; hosts and groups
/// point back at their parents through [GroupRef]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    pub hosts: IndexMap<String, Host>,
    pub groups: IndexMap<String, Group>,
    pub defaults: Defaults,
}

impl Inventory {
    pub fn group(&self, group: GroupRef) -> &Group {
        &self.groups[group.0]
    }

    pub fn parent_groups<'a>(
        &'a self,
        groups: &'a [GroupRef],
    ) -> impl Iterator<Item = &'a Group> {
        groups.iter().map(|group| self.group(*group))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AssembleError {
    #[error("{referent:?} references unknown group {group:?}")]
    UnknownGroup { referent: String, group: String },
    #[error("connection options {name:?} must be a mapping")]
    InvalidConnectionOptions { name: String },
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Build the typed graph from normalized records.
pub fn assemble(
    hosts: &IndexMap<String, NormalizedRecord>,
    groups: &IndexMap<String, NormalizedRecord>,
    defaults: &NormalizedRecord,
) -> Result<Inventory, AssembleError> {
    let defaults = Defaults {
        hostname: defaults.hostname.clone(),
        port: defaults.port,
        username: defaults.username.clone(),
        password: defaults.password.clone(),
        platform: defaults.platform.clone(),
        data: defaults.data.clone(),
        connection_options: connection_options(&defaults.connection_options)?,
    };

    // first pass: construct every group so references can be resolved
    let mut typed_groups: IndexMap<String, Group> = IndexMap::with_capacity(groups.len());
    for (name, record) in groups {
        typed_groups.insert(
            name.clone(),
            Group {
                name: name.clone(),
                hostname: record.hostname.clone(),
                port: record.port,
                username: record.username.clone(),
                password: record.password.clone(),
                platform: record.platform.clone(),
                data: record.data.clone(),
                groups: Vec::new(),
                connection_options: connection_options(&record.connection_options)?,
            },
        );
    }

    let resolve = |referent: &str, names: &[String]| -> Result<Vec<GroupRef>, AssembleError> {
        names
            .iter()
            .map(|name| {
                groups.get_index_of(name).map(GroupRef).ok_or_else(|| {
                    AssembleError::UnknownGroup {
                        referent: referent.to_string(),
                        group: name.clone(),
                    }
                })
            })
            .collect()
    };

    // second pass: resolve membership names into references
    for ((name, record), group) in groups.iter().zip(typed_groups.values_mut()) {
        group.groups = resolve(name, &record.groups)?;
    }

    let mut typed_hosts: IndexMap<String, Host> = IndexMap::with_capacity(hosts.len());
    for (name, record) in hosts {
        typed_hosts.insert(
            name.clone(),
            Host {
                name: name.clone(),
                hostname: record.hostname.clone(),
                port: record.port,
                username: record.username.clone(),
                password: record.password.clone(),
                platform: record.platform.clone(),
                data: record.data.clone(),
                groups: resolve(name, &record.groups)?,
                connection_options: connection_options(&record.connection_options)?,
            },
        );
    }

    Ok(Inventory {
        hosts: typed_hosts,
        groups: typed_groups,
        defaults,
    })
}

fn connection_options(
    raw: &VarsMap,
) -> Result<IndexMap<String, ConnectionOptions>, AssembleError> {
    let mut out = IndexMap::with_capacity(raw.len());
    for (name, value) in raw {
        let Value::Object(fields) = value else {
            return Err(AssembleError::InvalidConnectionOptions { name: name.clone() });
        };

        let mut options = ConnectionOptions::default();
        for (key, value) in fields {
            match key.as_str() {
                "hostname" => options.hostname = record::string_field("hostname", value.clone())?,
                "port" => options.port = record::port_field(value.clone())?,
                "username" => options.username = record::string_field("username", value.clone())?,
                "password" => options.password = record::string_field("password", value.clone())?,
                "platform" => options.platform = record::string_field("platform", value.clone())?,
                "extras" => {
                    options.extras = match value {
                        Value::Null => None,
                        Value::Object(extras) => Some(extras.clone()),
                        _ => {
                            return Err(AssembleError::InvalidConnectionOptions {
                                name: name.clone(),
                            });
                        }
                    };
                }
                other => {
                    tracing::debug!(connection = name, key = other, "ignoring connection key");
                }
            }
        }
        out.insert(name.clone(), options);
    }
    Ok(out)
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// A parsed inventory: normalized hosts, groups and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AnsibleInventory {
    pub hosts: IndexMap<String, NormalizedRecord>,
    pub groups: IndexMap<String, NormalizedRecord>,
    pub defaults: NormalizedRecord,
}

impl AnsibleInventory {
    /// Parse `hostsfile` with default limits.
    pub fn new(hostsfile: impl AsRef<Path>) -> Result<Self, ParseError> {
        Self::with_options(hostsfile, &ParseOptions::default())
    }

    pub fn with_options(
        hostsfile: impl AsRef<Path>,
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let hostsfile = hostsfile.as_ref();
        let absolute = hostsfile.canonicalize().map_err(SourceError::Io)?;
        // vars files live next to the inventory file
        let search_root = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let root = source::detect_and_parse(&absolute)?;
        let (hosts, groups, defaults) = Walker::new(&search_root, options).walk(&root)?;

        Ok(Self {
            hosts,
            groups,
            defaults,
        })
    }

    /// Assemble the typed object graph.
    pub fn load(&self) -> Result<Inventory, AssembleError> {
        assemble(&self.hosts, &self.groups, &self.defaults)
    }
}

impl Serialize for AnsibleInventory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("hosts", &RecordsView(&self.hosts))?;
        map.serialize_entry("groups", &RecordsView(&self.groups))?;
        map.serialize_entry("defaults", &DefaultsView(&self.defaults))?;
        map.end()
    }
}

struct RecordsView<'a>(&'a IndexMap<String, NormalizedRecord>);

impl Serialize for RecordsView<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, record) in self.0 {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}
