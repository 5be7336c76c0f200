//! Resource abstraction layer
//!
//! This module provides a data-driven approach to mapping cloud entities.
//! Resource types are declared in JSON files compiled into the binary, so a
//! new resource type needs no new code.
//!
//! # Architecture
//!
//! - [`schema`] - Declarative resource types: attributes, capabilities, wire paths
//! - [`registry`] - Loads and caches the schemas from embedded JSON
//! - [`base`] - The [`Resource`] value: dirty tracking, request building, CRUD
//! - [`pagination`] - Lazy listing with marker or offset cursors
//! - [`wait`] - Status and deletion polling
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`, one per
//! service (`compute.json`, `network.json`, ...).
//!
//! # Example
//!
//! ```ignore
//! use futures::TryStreamExt;
//! use osdk::resource::{attrs, schema, Resource};
//!
//! async fn list_servers(session: &osdk::Session) -> osdk::Result<Vec<Resource>> {
//!     let servers = schema("compute.server")?;
//!     Resource::list(session, servers, true, attrs(serde_json::json!({"limit": 50})))?
//!         .try_collect()
//!         .await
//! }
//! ```

pub mod attribute;
pub mod base;
pub mod format;
pub mod pagination;
pub mod query;
mod registry;
pub mod schema;
pub mod store;
pub mod wait;

pub use attribute::{AttrType, Attribute, Location};
pub use base::{attrs, get_one_match, Attrs, PreparedRequest, Resource};
pub use pagination::{find_value_by_accessor, get_list_uri, get_next_marker, ResourceStream};
pub use query::QueryParameters;
pub use registry::{all_schema_keys, get_registry, get_schema, schema, Registry};
pub use schema::{Capabilities, NextMarker, Operation, PatchFormat, Schema};
pub use store::AttributeStore;
pub use wait::{wait_for_delete, wait_for_status};
