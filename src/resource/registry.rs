//! Resource Registry - Load resource schemas from JSON
//!
//! This module loads every resource type definition from embedded JSON files
//! and provides lookup functions for the proxies and the CLI.

use super::attribute::{AttrType, Attribute};
use super::query::QueryParameters;
use super::schema::{NextMarker, Operation, PatchFormat, Schema};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[(&str, &str)] = &[
    ("compute.json", include_str!("../resources/compute.json")),
    ("network.json", include_str!("../resources/network.json")),
    ("block_store.json", include_str!("../resources/block_store.json")),
    ("image.json", include_str!("../resources/image.json")),
    ("identity.json", include_str!("../resources/identity.json")),
    ("object_store.json", include_str!("../resources/object_store.json")),
    ("orchestration.json", include_str!("../resources/orchestration.json")),
    ("auto_scaling.json", include_str!("../resources/auto_scaling.json")),
    ("message.json", include_str!("../resources/message.json")),
];

/// Attribute definition: either a bare type name (a body attribute) or a
/// full descriptor
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AttributeDef {
    Type(AttrType),
    Full(Attribute),
}

impl AttributeDef {
    fn into_attribute(self, attr: &str) -> Attribute {
        let mut attribute = match self {
            AttributeDef::Type(kind) => Attribute::body(attr).kind(kind),
            AttributeDef::Full(attribute) => attribute,
        };
        attribute.attr = attr.to_string();
        attribute
    }
}

/// Accepted query parameter: a name sent unchanged, or `{client: wire}` pairs
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum QueryDef {
    Name(String),
    Mapping(BTreeMap<String, String>),
}

/// Resource definition from JSON
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceDef {
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    resource_key: Option<String>,
    #[serde(default)]
    resources_key: Option<String>,
    #[serde(default)]
    base_path: Option<String>,
    #[serde(default)]
    list_path: Option<String>,
    #[serde(default)]
    next_marker: Option<NextMarker>,
    #[serde(default)]
    query_marker_key: Option<String>,
    #[serde(default)]
    query_limit_key: Option<String>,
    #[serde(default)]
    query: Vec<QueryDef>,
    #[serde(default)]
    allow: Option<Vec<Operation>>,
    #[serde(default)]
    patch_update: Option<bool>,
    #[serde(default)]
    patch_format: Option<PatchFormat>,
    #[serde(default)]
    patch_content_type: Option<String>,
    #[serde(default)]
    put_create: Option<bool>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeDef>,
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
struct ResourceFile {
    service: String,
    #[serde(default)]
    resources: BTreeMap<String, ResourceDef>,
}

/// Loaded resource types keyed by registry key
#[derive(Debug, Default)]
pub struct Registry {
    schemas: HashMap<String, Arc<Schema>>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<std::result::Result<Registry, String>> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> Result<&'static Registry> {
    REGISTRY
        .get_or_init(|| load(RESOURCE_FILES))
        .as_ref()
        .map_err(|e| Error::Registry(e.clone()))
}

/// Get a resource schema by key
pub fn get_schema(key: &str) -> Option<Arc<Schema>> {
    get_registry().ok()?.schemas.get(key).cloned()
}

/// Get a resource schema by key, failing when it is unknown
pub fn schema(key: &str) -> Result<Arc<Schema>> {
    let registry = get_registry()?;
    registry
        .schemas
        .get(key)
        .cloned()
        .ok_or_else(|| Error::Registry(format!("unknown resource type `{}`", key)))
}

/// Get all resource keys, sorted
pub fn all_schema_keys() -> Vec<&'static str> {
    let Ok(registry) = get_registry() else {
        return Vec::new();
    };
    let mut keys: Vec<&str> = registry.schemas.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

fn load(files: &[(&str, &str)]) -> std::result::Result<Registry, String> {
    let mut defs: BTreeMap<String, (String, ResourceDef)> = BTreeMap::new();
    for (file, content) in files {
        let partial: ResourceFile = serde_json::from_str(content)
            .map_err(|e| format!("failed to parse {}: {}", file, e))?;
        for (key, def) in partial.resources {
            if defs.contains_key(&key) {
                return Err(format!("{}: resource `{}` defined twice", file, key));
            }
            defs.insert(key, (partial.service.clone(), def));
        }
    }

    let mut registry = Registry::default();
    for key in defs.keys() {
        let schema = resolve(key, &defs, &mut Vec::new())?;
        schema.validate().map_err(|e| e.to_string())?;
        registry.schemas.insert(key.clone(), Arc::new(schema));
    }

    tracing::debug!("Loaded {} resource schemas", registry.schemas.len());
    Ok(registry)
}

/// Build the schema for `key`, applying its `extends` chain first
fn resolve(
    key: &str,
    defs: &BTreeMap<String, (String, ResourceDef)>,
    chain: &mut Vec<String>,
) -> std::result::Result<Schema, String> {
    if chain.iter().any(|k| k == key) {
        return Err(format!("cyclic extends: {} -> {}", chain.join(" -> "), key));
    }
    let (service, def) = defs
        .get(key)
        .ok_or_else(|| format!("`{}` extends unknown resource `{}`", chain.join(" -> "), key))?;
    chain.push(key.to_string());

    let mut schema = match &def.extends {
        Some(parent) => {
            let mut base = resolve(parent, defs, chain)?;
            base.key = key.to_string();
            base.type_name = default_type_name(key);
            base.service = service.clone();
            base
        },
        None => Schema::new(key, &default_type_name(key), service),
    };
    chain.pop();

    apply(&mut schema, def);
    Ok(schema)
}

fn apply(schema: &mut Schema, def: &ResourceDef) {
    if let Some(v) = &def.type_name {
        schema.type_name = v.clone();
    }
    if let Some(v) = &def.service {
        schema.service = v.clone();
    }
    if let Some(v) = &def.resource_key {
        schema.resource_key = Some(v.clone());
    }
    if let Some(v) = &def.resources_key {
        schema.resources_key = Some(v.clone());
    }
    if let Some(v) = &def.base_path {
        schema.base_path = v.clone();
    }
    if let Some(v) = &def.list_path {
        schema.list_path = Some(v.clone());
    }
    if let Some(v) = &def.next_marker {
        schema.next_marker = Some(v.clone());
    }
    if let Some(v) = &def.query_marker_key {
        schema.query_marker_key = v.clone();
    }
    if let Some(v) = &def.query_limit_key {
        schema.query_limit_key = v.clone();
    }
    if let Some(ops) = &def.allow {
        schema.allow = Default::default();
        for op in ops {
            schema.allow.set(*op, true);
        }
    }
    if let Some(v) = def.patch_update {
        schema.patch_update = v;
    }
    if let Some(v) = def.patch_format {
        schema.patch_format = v;
    }
    if let Some(v) = &def.patch_content_type {
        schema.patch_content_type = Some(v.clone());
    }
    if let Some(v) = def.put_create {
        schema.put_create = v;
    }

    let mut query: QueryParameters = schema.query.clone();
    for entry in &def.query {
        match entry {
            QueryDef::Name(name) => query.insert(name, name),
            QueryDef::Mapping(pairs) => {
                for (client, wire) in pairs {
                    query.insert(client, wire);
                }
            },
        }
    }
    query.set_pagination_keys(&schema.query_limit_key, &schema.query_marker_key);
    schema.query = query;

    for (attr, attr_def) in &def.attributes {
        schema.upsert_attribute(attr_def.clone().into_attribute(attr));
    }
}

/// `compute.server_detail` -> `ServerDetail`
fn default_type_name(key: &str) -> String {
    let last = key.rsplit('.').next().unwrap_or(key);
    last.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}
