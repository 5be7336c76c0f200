//! Declarative resource types
//!
//! A [`Schema`] describes one server-side entity type: its attributes, the
//! operations it allows, and how it appears on the wire. Every [`Resource`]
//! value points at the schema of its type.
//!
//! [`Resource`]: super::Resource

use super::attribute::{Attribute, Location};
use super::query::QueryParameters;
use crate::error::{Error, Result};
use crate::utils::fill_template;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Get,
    Update,
    Delete,
    List,
    Head,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Head => "head",
        }
    }
}

/// Operations a resource type allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub create: bool,
    pub get: bool,
    pub update: bool,
    pub delete: bool,
    pub list: bool,
    pub head: bool,
}

impl Capabilities {
    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::Create => self.create,
            Operation::Get => self.get,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
            Operation::List => self.list,
            Operation::Head => self.head,
        }
    }

    pub fn set(&mut self, op: Operation, allowed: bool) {
        match op {
            Operation::Create => self.create = allowed,
            Operation::Get => self.get = allowed,
            Operation::Update => self.update = allowed,
            Operation::Delete => self.delete = allowed,
            Operation::List => self.list = allowed,
            Operation::Head => self.head = allowed,
        }
    }
}

/// Body shape of a PATCH update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchFormat {
    /// Flat partial document
    #[default]
    Dict,
    /// The partial document wrapped in a one-element list
    AttrsList,
    /// RFC 6902 operations
    JsonPatch,
}

/// Where the next-page cursor of a list response comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextMarker {
    /// Dotted accessor to the cursor in the response body
    Path(String),
    /// Offset-counting cursor: the next start is the current start plus the
    /// items seen, until the total found at this accessor is reached
    StartNumber(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Registry key, e.g. `compute.server`
    pub key: String,
    /// Type name used in error messages
    pub type_name: String,
    /// Service type the resource lives in
    pub service: String,
    pub resource_key: Option<String>,
    pub resources_key: Option<String>,
    /// Entity path template with `{placeholders}` filled from uri attributes
    pub base_path: String,
    /// Collection path template, when it differs from `base_path`
    pub list_path: Option<String>,
    pub next_marker: Option<NextMarker>,
    pub query_marker_key: String,
    pub query_limit_key: String,
    pub query: QueryParameters,
    pub allow: Capabilities,
    pub patch_update: bool,
    pub patch_format: PatchFormat,
    pub patch_content_type: Option<String>,
    pub put_create: bool,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    /// New schema carrying the implicit `id`, `name` and `location` attributes
    pub fn new(key: &str, type_name: &str, service: &str) -> Self {
        Self {
            key: key.to_string(),
            type_name: type_name.to_string(),
            service: service.to_string(),
            resource_key: None,
            resources_key: None,
            base_path: String::new(),
            list_path: None,
            next_marker: None,
            query_marker_key: "marker".to_string(),
            query_limit_key: "limit".to_string(),
            query: QueryParameters::default(),
            allow: Capabilities::default(),
            patch_update: false,
            patch_format: PatchFormat::Dict,
            patch_content_type: None,
            put_create: false,
            attributes: implicit_attributes(),
        }
    }

    pub fn resource_key(mut self, key: &str) -> Self {
        self.resource_key = Some(key.to_string());
        self
    }

    pub fn resources_key(mut self, key: &str) -> Self {
        self.resources_key = Some(key.to_string());
        self
    }

    pub fn base_path(mut self, path: &str) -> Self {
        self.base_path = path.to_string();
        self
    }

    pub fn list_path(mut self, path: &str) -> Self {
        self.list_path = Some(path.to_string());
        self
    }

    pub fn next_marker(mut self, marker: NextMarker) -> Self {
        self.next_marker = Some(marker);
        self
    }

    pub fn allow(mut self, ops: &[Operation]) -> Self {
        for op in ops {
            self.allow.set(*op, true);
        }
        self
    }

    pub fn patch(mut self, format: PatchFormat, content_type: Option<&str>) -> Self {
        self.patch_update = true;
        self.patch_format = format;
        self.patch_content_type = content_type.map(str::to_string);
        self
    }

    pub fn put_create(mut self) -> Self {
        self.put_create = true;
        self
    }

    pub fn query(mut self, query: QueryParameters) -> Self {
        self.query = query;
        self.query
            .set_pagination_keys(&self.query_limit_key, &self.query_marker_key);
        self
    }

    /// Change the server-side pagination keys
    pub fn pagination_keys(mut self, limit_key: &str, marker_key: &str) -> Self {
        self.query_limit_key = limit_key.to_string();
        self.query_marker_key = marker_key.to_string();
        self.query.set_pagination_keys(limit_key, marker_key);
        self
    }

    /// Add an attribute, replacing any existing one with the same client name
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.upsert_attribute(attribute);
        self
    }

    pub fn upsert_attribute(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.attr == attribute.attr) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    pub fn attributes_in(&self, location: Location) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(move |a| a.location == location)
    }

    /// Attribute by client name
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr == name)
    }

    /// Attribute matching `key` as either a client or a wire name.
    ///
    /// Body attributes are searched before header and uri ones.
    pub fn lookup(&self, key: &str) -> Option<&Attribute> {
        [Location::Body, Location::Header, Location::Uri]
            .into_iter()
            .find_map(|location| {
                self.attributes_in(location)
                    .find(|a| a.attr == key || a.wire_name() == key)
            })
    }

    /// Attribute stored under `wire` in the given location
    pub fn by_wire(&self, location: Location, wire: &str) -> Option<&Attribute> {
        self.attributes_in(location).find(|a| a.wire_name() == wire)
    }

    pub fn id_wire_name(&self) -> &str {
        self.attr("id").map(Attribute::wire_name).unwrap_or("id")
    }

    pub fn alternate_id(&self) -> Option<&Attribute> {
        self.attributes_in(Location::Body).find(|a| a.alternate_id)
    }

    /// Fail with `MethodNotSupported` unless `op` is allowed
    pub fn require(&self, op: Operation) -> Result<()> {
        if self.allow.allows(op) {
            Ok(())
        } else {
            Err(Error::method_not_supported(&self.type_name, op.as_str()))
        }
    }

    /// Check the schema invariants: at most one alternate id, no duplicate wire
    /// names in one location
    pub fn validate(&self) -> Result<()> {
        let alternates = self.attributes.iter().filter(|a| a.alternate_id).count();
        if alternates > 1 {
            return Err(Error::InvalidRequest(format!(
                "{} declares {} alternate ids",
                self.type_name, alternates
            )));
        }
        if let Some(alt) = self.attributes.iter().find(|a| a.alternate_id) {
            if alt.location != Location::Body {
                return Err(Error::InvalidRequest(format!(
                    "{}: alternate id `{}` must be a body attribute",
                    self.type_name, alt.attr
                )));
            }
        }
        for (i, a) in self.attributes.iter().enumerate() {
            let clash = self.attributes[i + 1..]
                .iter()
                .any(|b| b.location == a.location && b.wire_name() == a.wire_name());
            if clash {
                return Err(Error::InvalidRequest(format!(
                    "{}: wire name `{}` declared twice",
                    self.type_name,
                    a.wire_name()
                )));
            }
        }
        Ok(())
    }

    /// Entity path with uri placeholders filled
    pub fn entity_uri(&self, values: &Map<String, Value>) -> Result<String> {
        fill_template(&self.base_path, values)
    }

    /// Collection path for a list call
    pub fn list_uri(&self, values: &Map<String, Value>) -> Result<String> {
        fill_template(self.list_path.as_deref().unwrap_or(&self.base_path), values)
    }
}

fn implicit_attributes() -> Vec<Attribute> {
    vec![
        Attribute::body("id"),
        Attribute::body("name"),
        Attribute::header("location").wire("Location"),
    ]
}
