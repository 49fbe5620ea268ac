//! # ainv - ansible inventory normalization
//!
//! Translates an Ansible-dialect inventory (strict key/value sections or
//! YAML) into normalized host/group/defaults records and, on demand, a typed
//! inventory graph for a host-automation framework to consume.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `ainv` works internally.
//!
//! ### Inventory terms
//!
//! Quick introduction to terms used to describe elements of an inventory.
//!
//! - a `host` is a leaf element, optionally carrying inline variables
//! - a `group` is a named collection of hosts; groups nest through a
//!   `children` mapping and a host or group can sit in several groups
//! - the implicit top-level group is named `all`; its own vars become the
//!   global `defaults` record
//! - `vars` are free-form key/value data attached to a host or group
//! - side-car vars live next to the inventory file, under
//!   `host_vars/<name>` or `group_vars/<name>` (a file with an optional
//!   extension, or a directory of such files)
//! - reserved fields are `hostname`, `port`, `username`, `password`,
//!   `platform` and `connection_options`: they get dedicated typed slots
//!   instead of the free-form `data` bag
//!
//! This is a valid sections inventory:
//!
//! ```text
//! [web]
//! host1 ansible_host=10.0.0.1
//!
//! [web:vars]
//! ansible_user=admin
//!
//! [dc1:children]
//! web
//! ```
//!
//! ### Loading
//!
//! [source::detect_and_parse] reads the hosts file once and tries the
//! strict section grammar first; on a structural mismatch it re-parses the
//! text as YAML. Both produce the same [source::RawGroupNode] tree rooted at
//! `all`. A file neither grammar accepts raises
//! [source::SourceError::NoValidInventory] with the attempted path.
//!
//! ### Walking
//!
//! [walker::Walker] descends the tree depth-first, starting with the
//! synthetic `defaults` pseudo-group (the root's own vars). Hosts and groups
//! register idempotently, so an element reached through two parents merges
//! into one record. Membership lists are expanded to transitive ancestors
//! for hosts and sorted lexically at the end. Recursion depth is bounded by
//! [walker::ParseOptions].
//!
//! ### Merging
//!
//! [record::normalize] applies the alias mapping (`ansible_host` →
//! `hostname`, ...), splits reserved fields from free-form data and layers
//! the variable sources. Precedence, low to high: structural defaults <
//! inline `vars` < side-car vars file/directory (resolved by
//! [vars::resolve_vars]).
//!
//! ### Assembly
//!
//! [inventory::assemble] builds the typed [inventory::Inventory] in two
//! passes: construct every [inventory::Group], then resolve membership
//! names into [inventory::GroupRef]s. Resolution is deliberately not done
//! during the walk; a group may be referenced before its node is visited.
//!
//! ### Output
//!
//! Records serialize through hand-written [serde] impls; the `ainv` binary
//! prints the `{hosts, groups, defaults}` mapping as YAML or JSON.
pub mod inventory;
pub mod record;
pub mod source;
pub mod value;
pub mod vars;
pub mod walker;
