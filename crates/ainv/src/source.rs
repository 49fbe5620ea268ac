//! inventory source loading and format detection
//!
//! [detect_and_parse] reads a hosts file and builds the raw group tree.
//! The strict key/value section grammar is attempted first; when it fails
//! structurally the same text is re-parsed as a YAML document. A file that
//! satisfies neither grammar is rejected with
//! [SourceError::NoValidInventory] naming the attempted path.
//!
//! An unknown meta tag (a section like `[web:unknown]`) is an input error,
//! not a format mismatch, and never triggers the YAML fallback.
use crate::value::{scalar_key, Value, VarsMap};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One node of the raw inventory tree.
///
/// The implicit top-level node is named `all`. Strict-section sources
/// reference child groups through empty stub nodes; the referenced group's
/// own definition stays a direct child of the root.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawGroupNode {
    pub vars: VarsMap,
    pub hosts: IndexMap<String, VarsMap>,
    pub children: IndexMap<String, RawGroupNode>,
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("no valid inventory source to parse. Tried: {}", path.display())]
    NoValidInventory { path: PathBuf },
    #[error("unknown tag {tag:?} in section [{section}]")]
    UnknownTag { section: String, tag: String },
    #[error("inventory {} has no top-level \"all\" group", path.display())]
    MissingRootGroup { path: PathBuf },
    #[error("invalid inventory node: {reason}")]
    InvalidNode { reason: String },
    #[error("unable to read inventory file")]
    Io(#[from] std::io::Error),
}

/// Structural errors of the strict grammar. Any of these (except
/// [IniError::UnknownTag]) means "this is not a sections file" and makes
/// the detector fall back to YAML.
#[derive(thiserror::Error, Debug, PartialEq)]
enum IniError {
    #[error("line {line}: content before the first section header")]
    MissingSectionHeader { line: usize },
    #[error("line {line}: malformed section header")]
    BadSectionHeader { line: usize },
    #[error("line {line}: duplicate section [{section}]")]
    DuplicateSection { line: usize, section: String },
    #[error("line {line}: duplicate entry {key:?}")]
    DuplicateEntry { line: usize, key: String },
    #[error("line {line}: host variable {token:?} is not a key=value pair")]
    BadHostVar { line: usize, token: String },
    #[error("unknown tag {tag:?} in section [{section}]")]
    UnknownTag { section: String, tag: String },
}

/// Read an inventory file and parse it with whichever grammar accepts it.
pub fn detect_and_parse(path: &Path) -> Result<RawGroupNode, SourceError> {
    tracing::info!(path = %path.display(), "loading inventory file");
    let contents = std::fs::read_to_string(path)?;

    match parse_ini(&contents) {
        Ok(root) => {
            tracing::debug!(path = %path.display(), "parsed as strict key/value sections");
            return Ok(root);
        }
        Err(IniError::UnknownTag { section, tag }) => {
            return Err(SourceError::UnknownTag { section, tag });
        }
        Err(err) => tracing::debug!(%err, "not a strict key/value inventory"),
    }

    parse_yaml(&contents, path)
}

enum Section {
    Hosts(String),
    Vars(String),
    Children(String),
}

fn parse_ini(contents: &str) -> Result<RawGroupNode, IniError> {
    let mut root = RawGroupNode::default();
    let mut seen_sections = HashSet::new();
    let mut current = None;

    for (index, raw_line) in contents.lines().enumerate() {
        let line = index + 1;
        let text = raw_line.trim();
        if text.is_empty() || text.starts_with('#') || text.starts_with(';') {
            continue;
        }

        if text.starts_with('[') {
            let Some(name) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) else {
                return Err(IniError::BadSectionHeader { line });
            };
            if !seen_sections.insert(name.to_string()) {
                return Err(IniError::DuplicateSection {
                    line,
                    section: name.to_string(),
                });
            }

            current = Some(match name.split_once(':') {
                None => Section::Hosts(name.to_string()),
                Some((group, "vars")) => Section::Vars(group.to_string()),
                Some((group, "children")) => Section::Children(group.to_string()),
                Some((_, tag)) => {
                    return Err(IniError::UnknownTag {
                        section: name.to_string(),
                        tag: tag.to_string(),
                    });
                }
            });
            continue;
        }

        let Some(section) = &current else {
            return Err(IniError::MissingSectionHeader { line });
        };

        match section {
            Section::Hosts(group) => {
                let mut tokens = text.split_whitespace();
                let Some(host) = tokens.next() else {
                    continue;
                };

                let mut host_vars = VarsMap::new();
                for token in tokens {
                    let Some((key, value)) = token.split_once('=') else {
                        return Err(IniError::BadHostVar {
                            line,
                            token: token.to_string(),
                        });
                    };
                    host_vars.insert(key.to_string(), coerce_scalar(value));
                }

                let hosts = &mut group_node(&mut root, group).hosts;
                if hosts.contains_key(host) {
                    return Err(IniError::DuplicateEntry {
                        line,
                        key: host.to_string(),
                    });
                }
                hosts.insert(host.to_string(), host_vars);
            }
            Section::Vars(group) => {
                let (key, value) = split_assignment(text);
                let vars = if group == "all" {
                    &mut root.vars
                } else {
                    &mut group_node(&mut root, group).vars
                };
                if vars.contains_key(&key) {
                    return Err(IniError::DuplicateEntry { line, key });
                }
                vars.insert(key, value.map_or(Value::Null, |v| coerce_scalar(&v)));
            }
            Section::Children(group) => {
                // the child name is the key; any `=value` part is ignored
                let (child, _) = split_assignment(text);
                let children = if group == "all" {
                    &mut root.children
                } else {
                    &mut group_node(&mut root, group).children
                };
                children.entry(child).or_default();
            }
        }
    }

    Ok(root)
}

/// Direct child of the root, created on first mention.
fn group_node<'a>(root: &'a mut RawGroupNode, group: &str) -> &'a mut RawGroupNode {
    root.children.entry(group.to_string()).or_default()
}

/// Split a `key=value` / `key = value` / `key value` line. A line holding
/// only a key yields no value.
fn split_assignment(text: &str) -> (String, Option<String>) {
    let Some(position) = text.find(|c: char| c == '=' || c.is_whitespace()) else {
        return (text.to_string(), None);
    };

    let key = text[..position].to_string();
    let mut rest = text[position..].trim_start();
    if let Some(stripped) = rest.strip_prefix('=') {
        rest = stripped.trim_start();
    }
    (key, Some(rest.to_string()))
}

/// Integer literals become integers, everything else stays a string.
fn coerce_scalar(value: &str) -> Value {
    match value.parse::<i64>() {
        Ok(int) => Value::Integer(int),
        Err(_) => Value::String(value.to_string()),
    }
}

fn parse_yaml(contents: &str, path: &Path) -> Result<RawGroupNode, SourceError> {
    let document: serde_yaml::Value = match serde_yaml::from_str(contents) {
        Ok(document) => document,
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "inventory is neither a sections file nor YAML");
            return Err(SourceError::NoValidInventory {
                path: path.to_path_buf(),
            });
        }
    };

    let serde_yaml::Value::Mapping(mut document) = document else {
        tracing::error!(path = %path.display(), "YAML inventory is not a mapping");
        return Err(SourceError::NoValidInventory {
            path: path.to_path_buf(),
        });
    };

    let Some(root) = document.remove("all") else {
        return Err(SourceError::MissingRootGroup {
            path: path.to_path_buf(),
        });
    };

    tracing::debug!(path = %path.display(), "parsed as YAML");
    node_from_yaml(root, "all")
}

fn node_from_yaml(value: serde_yaml::Value, group: &str) -> Result<RawGroupNode, SourceError> {
    let mut node = RawGroupNode::default();

    let mapping = match value {
        serde_yaml::Value::Null => return Ok(node),
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => {
            return Err(SourceError::InvalidNode {
                reason: format!("group {group:?} must be a mapping or null"),
            });
        }
    };

    for (key, value) in mapping {
        let Some(key) = scalar_key(&key) else {
            return Err(SourceError::InvalidNode {
                reason: format!("group {group:?} has a non-scalar key"),
            });
        };

        match key.as_str() {
            "vars" => node.vars = vars_from_yaml(value, group, "vars")?,
            "hosts" => {
                let hosts = match value {
                    serde_yaml::Value::Null => continue,
                    serde_yaml::Value::Mapping(hosts) => hosts,
                    _ => {
                        return Err(SourceError::InvalidNode {
                            reason: format!("hosts of group {group:?} must be a mapping or null"),
                        });
                    }
                };
                for (host, host_vars) in hosts {
                    let Some(host) = scalar_key(&host) else {
                        return Err(SourceError::InvalidNode {
                            reason: format!("group {group:?} has a non-scalar host name"),
                        });
                    };
                    let host_vars = vars_from_yaml(host_vars, group, "host vars")?;
                    node.hosts.insert(host, host_vars);
                }
            }
            "children" => {
                let children = match value {
                    serde_yaml::Value::Null => continue,
                    serde_yaml::Value::Mapping(children) => children,
                    _ => {
                        return Err(SourceError::InvalidNode {
                            reason: format!(
                                "children of group {group:?} must be a mapping or null"
                            ),
                        });
                    }
                };
                for (child, child_node) in children {
                    let Some(child) = scalar_key(&child) else {
                        return Err(SourceError::InvalidNode {
                            reason: format!("group {group:?} has a non-scalar child name"),
                        });
                    };
                    let child_node = node_from_yaml(child_node, &child)?;
                    node.children.insert(child, child_node);
                }
            }
            other => {
                tracing::debug!(group, key = other, "ignoring unknown key in group node");
            }
        }
    }

    Ok(node)
}

fn vars_from_yaml(
    value: serde_yaml::Value,
    group: &str,
    what: &str,
) -> Result<VarsMap, SourceError> {
    match Value::from(value) {
        Value::Null => Ok(VarsMap::new()),
        Value::Object(vars) => Ok(vars),
        _ => Err(SourceError::InvalidNode {
            reason: format!("{what} of group {group:?} must be a mapping or null"),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vars;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_sections_become_child_groups() {
        let root = parse_ini("[web]\nhost1 ansible_host=10.0.0.1 ansible_port=22\nhost2\n")
            .expect("must parse");

        let web = &root.children["web"];
        assert_eq!(
            web.hosts["host1"],
            vars! { "ansible_host" => "10.0.0.1", "ansible_port" => 22 }
        );
        assert_eq!(web.hosts["host2"], vars! {});
    }

    #[test]
    fn meta_sections_attach_to_their_group() {
        let root = parse_ini(
            "[web:vars]\nansible_port=80\nrole=frontend\n[dc1:children]\nweb\n[all:vars]\ndomain=acme.example\n",
        )
        .expect("must parse");

        assert_eq!(root.vars, vars! { "domain" => "acme.example" });
        assert_eq!(
            root.children["web"].vars,
            vars! { "ansible_port" => 80, "role" => "frontend" }
        );
        // the child reference is an empty stub; the full definition of web
        // stays a direct child of the root
        assert_eq!(root.children["dc1"].children["web"], RawGroupNode::default());
    }

    #[test]
    fn all_children_creates_root_stubs_without_clobbering() {
        let root = parse_ini("[web]\nhost1\n[all:children]\nweb\nspare\n").expect("must parse");

        assert!(root.children["web"].hosts.contains_key("host1"));
        assert_eq!(root.children["spare"], RawGroupNode::default());
    }

    #[test]
    fn vars_lines_accept_spaced_assignments_and_bare_keys() {
        let root = parse_ini("[web:vars]\na = 1\nb b-value\nc\n").expect("must parse");

        let web_vars = &root.children["web"].vars;
        assert_eq!(web_vars["a"], Value::Integer(1));
        assert_eq!(web_vars["b"], Value::String("b-value".to_string()));
        assert_eq!(web_vars["c"], Value::Null);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let root = parse_ini("# comment\n; also a comment\n\n[web]\nhost1\n").expect("must parse");
        assert!(root.children["web"].hosts.contains_key("host1"));
    }

    #[test]
    fn unknown_tag_is_not_a_structural_error() {
        let err = parse_ini("[web:nonsense]\n").expect_err("must fail");
        assert_eq!(
            err,
            IniError::UnknownTag {
                section: "web:nonsense".to_string(),
                tag: "nonsense".to_string()
            }
        );
    }

    #[test]
    fn content_before_a_section_is_structural() {
        let err = parse_ini("all:\n  hosts:\n").expect_err("must fail");
        assert_eq!(err, IniError::MissingSectionHeader { line: 1 });
    }

    #[test]
    fn duplicate_sections_are_structural() {
        let err = parse_ini("[web]\n[web]\n").expect_err("must fail");
        assert_eq!(
            err,
            IniError::DuplicateSection {
                line: 2,
                section: "web".to_string()
            }
        );
    }

    #[test]
    fn yaml_tree_parses_nested_children() {
        let text = r#"
all:
  vars:
    domain: acme.example
  children:
    dc1:
      children:
        rack1:
          hosts:
            sw1:
              ansible_host: 10.0.0.5
"#;
        let root = parse_yaml(text, Path::new("hosts")).expect("must parse");

        assert_eq!(root.vars, vars! { "domain" => "acme.example" });
        let rack1 = &root.children["dc1"].children["rack1"];
        assert_eq!(rack1.hosts["sw1"], vars! { "ansible_host" => "10.0.0.5" });
    }

    #[test]
    fn yaml_without_all_is_rejected() {
        let err = parse_yaml("web:\n  hosts:\n", Path::new("hosts")).expect_err("must fail");
        assert!(matches!(err, SourceError::MissingRootGroup { .. }));
    }

    #[test]
    fn yaml_scalar_document_is_no_valid_inventory() {
        let err = parse_yaml("just some text", Path::new("hosts")).expect_err("must fail");
        assert!(matches!(err, SourceError::NoValidInventory { .. }));
    }

    #[test]
    fn null_group_bodies_are_empty_nodes() {
        let root = parse_yaml("all:\n  children:\n    web:\n", Path::new("hosts"))
            .expect("must parse");
        assert_eq!(root.children["web"], RawGroupNode::default());
    }
}
