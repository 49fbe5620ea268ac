//! End-to-end inventory tests
//!
//! Parses each fixture inventory under /tests/fixtures/ and compares the
//! normalized records against fixtures/expected.yaml. The comparison goes
//! through [serde_yaml::Value] so mapping key order does not matter.

use ainv::inventory::{AnsibleInventory, ParseError};
use ainv::source::SourceError;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

fn parse(relative: &str) -> AnsibleInventory {
    AnsibleInventory::new(fixture(relative)).expect("fixture must parse")
}

fn as_yaml(inventory: &AnsibleInventory) -> serde_yaml::Value {
    serde_yaml::to_value(inventory).expect("must serialize")
}

fn expected() -> serde_yaml::Value {
    let contents = std::fs::read_to_string(fixture("expected.yaml")).expect("must read");
    serde_yaml::from_str(&contents).expect("must deserialize")
}

#[test]
fn ini_inventory_matches_expected() {
    assert_eq!(as_yaml(&parse("ini/hosts")), expected());
}

#[test]
fn yaml_inventory_matches_expected() {
    assert_eq!(as_yaml(&parse("yaml/hosts")), expected());
}

#[test]
fn formats_agree() {
    assert_eq!(as_yaml(&parse("ini/hosts")), as_yaml(&parse("yaml/hosts")));
}

#[test]
fn reparse_is_stable() {
    let first = serde_yaml::to_string(&parse("ini/hosts")).expect("must serialize");
    let second = serde_yaml::to_string(&parse("ini/hosts")).expect("must serialize");
    assert_eq!(first, second);
}

#[test]
fn invalid_source_is_rejected() {
    let err = AnsibleInventory::new(fixture("parse_error/hosts")).expect_err("must not parse");
    assert!(matches!(
        err,
        ParseError::Source(SourceError::NoValidInventory { .. })
    ));
    assert!(err.to_string().contains("parse_error"));
}

#[test]
fn typed_graph_resolves_parent_groups() {
    use ainv::value::Value;

    let inventory = parse("ini/hosts").load().expect("must assemble");

    let parents: Vec<&str> = inventory
        .parent_groups(&inventory.hosts["host1"].groups)
        .map(|group| group.name.as_str())
        .collect();
    assert_eq!(parents, vec!["dc1", "web"]);

    let netconf = &inventory.groups["db"].connection_options["netconf"];
    assert_eq!(netconf.port, Some(830));
    let extras = netconf.extras.as_ref().expect("must have extras");
    assert_eq!(extras["hostkey_verify"], Value::Boolean(false));

    assert_eq!(inventory.defaults.platform.as_deref(), Some("junos"));
}
