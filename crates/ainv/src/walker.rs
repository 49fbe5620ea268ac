//! recursive group tree walk
//!
//! [Walker] turns a [RawGroupNode] tree into normalized host, group and
//! defaults records. The root node itself is processed as the synthetic
//! `defaults` pseudo-group (its vars are merged against the vars file for
//! the literal name `all`), then the walk descends depth-first through
//! `children`.
//!
//! Registration is idempotent: a group or host seen twice (a group can be a
//! child of two parents) merges into the same record. Groups collect their
//! immediate parent names; hosts additionally collect every transitive
//! ancestor once all parent links are known, so a host inside `rack1` under
//! `dc1` is a member of both. All membership lists are sorted lexically at
//! the end for deterministic output.
use crate::record::{self, NormalizedRecord, RecordError};
use crate::source::RawGroupNode;
use crate::value::VarsMap;
use crate::vars::{resolve_vars, VarsError};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;

/// Limits converting pathological input into a reported error instead of
/// unbounded recursion.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum nesting depth of the group tree.
    pub max_group_depth: usize,
    /// Maximum nesting depth of a vars directory.
    pub max_vars_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_group_depth: 64,
            max_vars_depth: 32,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    #[error("group tree nests deeper than {max} levels at group {group:?}")]
    DepthExceeded { group: String, max: usize },
    #[error(transparent)]
    Vars(#[from] VarsError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Accumulator for one walk over a raw inventory tree.
#[derive(derive_new::new, Debug)]
pub struct Walker<'a> {
    search_root: &'a Path,
    options: &'a ParseOptions,
    #[new(default)]
    hosts: IndexMap<String, NormalizedRecord>,
    #[new(default)]
    groups: IndexMap<String, NormalizedRecord>,
    #[new(default)]
    defaults: NormalizedRecord,
}

/// The records produced by a walk: hosts, groups, defaults.
pub type WalkOutput = (
    IndexMap<String, NormalizedRecord>,
    IndexMap<String, NormalizedRecord>,
    NormalizedRecord,
);

impl Walker<'_> {
    pub fn walk(mut self, root: &RawGroupNode) -> Result<WalkOutput, WalkError> {
        self.parse_group("defaults", root, None, 0)?;
        self.expand_host_groups();
        self.sort_groups();
        Ok((self.hosts, self.groups, self.defaults))
    }

    fn parse_group(
        &mut self,
        group: &str,
        node: &RawGroupNode,
        parent: Option<&str>,
        depth: usize,
    ) -> Result<(), WalkError> {
        if depth > self.options.max_group_depth {
            return Err(WalkError::DepthExceeded {
                group: group.to_string(),
                max: self.options.max_group_depth,
            });
        }
        tracing::trace!(group, ?parent, depth, "parsing group");

        // the defaults pseudo-group reads the vars file of the literal
        // name "all"
        let vars_file_element = if group == "defaults" { "all" } else { group };
        let file_vars = resolve_vars(
            vars_file_element,
            self.search_root,
            false,
            self.options.max_vars_depth,
        )?;

        let dest = if group == "defaults" {
            &mut self.defaults
        } else {
            self.groups.entry(group.to_string()).or_default()
        };
        if let Some(parent) = parent.filter(|parent| *parent != "defaults") {
            if !dest.groups.iter().any(|existing| existing == parent) {
                dest.groups.push(parent.to_string());
            }
        }
        record::normalize(dest, node.vars.clone(), file_vars, None)?;

        self.parse_hosts(&node.hosts, group)?;

        for (child, child_node) in &node.children {
            self.parse_group(child, child_node, Some(group), depth + 1)?;
        }

        Ok(())
    }

    fn parse_hosts(
        &mut self,
        hosts: &IndexMap<String, VarsMap>,
        parent: &str,
    ) -> Result<(), WalkError> {
        for (host, inline_vars) in hosts {
            let file_vars =
                resolve_vars(host, self.search_root, true, self.options.max_vars_depth)?;

            let dest = self.hosts.entry(host.clone()).or_default();
            if parent != "defaults" && !dest.groups.iter().any(|existing| existing == parent) {
                dest.groups.push(parent.to_string());
            }
            record::normalize(dest, inline_vars.clone(), file_vars, Some(host))?;
        }
        Ok(())
    }

    /// Extend every host's membership with the transitive ancestors of its
    /// direct groups. A host inside a nested group belongs to the whole
    /// chain, not just the innermost group.
    fn expand_host_groups(&mut self) {
        for host in self.hosts.values_mut() {
            let mut known: HashSet<String> = host.groups.iter().cloned().collect();
            let mut queue: Vec<String> = host.groups.clone();

            while let Some(group) = queue.pop() {
                let Some(group_record) = self.groups.get(&group) else {
                    continue;
                };
                for parent in &group_record.groups {
                    if known.insert(parent.clone()) {
                        host.groups.push(parent.clone());
                        queue.push(parent.clone());
                    }
                }
            }
        }
    }

    /// Lexical tie-break for presentation and comparison.
    fn sort_groups(&mut self) {
        for host in self.hosts.values_mut() {
            host.groups.sort();
        }
        for group in self.groups.values_mut() {
            group.groups.sort();
        }
    }
}
