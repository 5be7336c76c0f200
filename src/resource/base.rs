//! The generic resource value
//!
//! A [`Resource`] mirrors one server-side entity. Its attributes live in three
//! dirty-tracking stores (body, header, uri) keyed by wire name; the
//! [`Schema`] it points at tells it how to map caller names, build requests
//! and read responses.

use super::attribute::{AttrType, Attribute, Location};
use super::registry;
use super::schema::{Operation, PatchFormat, Schema};
use super::store::AttributeStore;
use crate::error::{Error, Result};
use crate::session::{RequestOptions, Response, Session};
use crate::utils::{query_pairs, urljoin, value_to_param};
use futures::TryStreamExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Attribute values keyed by client or wire name
pub type Attrs = Map<String, Value>;

/// Turn a `json!({...})` literal into [`Attrs`]; anything but an object is empty
pub fn attrs(value: Value) -> Attrs {
    match value {
        Value::Object(map) => map,
        _ => Attrs::new(),
    }
}

/// Everything needed to send one request for a resource
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub uri: String,
    pub body: Value,
    pub headers: Attrs,
}

impl PreparedRequest {
    fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), value_to_param(v)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    schema: Arc<Schema>,
    body: AttributeStore,
    header: AttributeStore,
    uri: AttributeStore,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.schema.key == other.schema.key
            && self.body == other.body
            && self.header == other.header
            && self.uri == other.uri
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema.type_name)?;
        let mut first = true;
        for (k, v) in self
            .body
            .attributes()
            .iter()
            .chain(self.header.attributes())
            .chain(self.uri.attributes())
        {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", k, v)?;
        }
        write!(f, ")")
    }
}

impl Resource {
    /// A resource not yet known to the server: every supplied attribute is dirty.
    ///
    /// Attributes matching no descriptor are dropped with a warning.
    pub fn new(schema: Arc<Schema>, attrs: Attrs) -> Self {
        Self::build(schema, attrs, false, |resource, key| {
            tracing::warn!("Dropping unknown attribute `{}` for {}", key, resource);
        })
    }

    /// A resource mirroring known server state: nothing is dirty
    pub fn existing(schema: Arc<Schema>, attrs: Attrs) -> Self {
        Self::build(schema, attrs, true, |resource, key| {
            tracing::trace!("Ignoring field `{}` of {}", key, resource);
        })
    }

    /// Like [`Resource::new`], but unknown attributes and values that do not
    /// match their declared type are errors
    pub fn try_new(schema: Arc<Schema>, attrs: Attrs) -> Result<Self> {
        let mut resource = Self::build(schema, Attrs::new(), false, |_, _| {});
        for (key, value) in attrs {
            resource.set_attr(&key, value)?;
        }
        Ok(resource)
    }

    /// Look up the schema by registry key and build a new resource
    pub fn from_key(key: &str, attrs: Attrs) -> Result<Self> {
        Ok(Self::new(registry::schema(key)?, attrs))
    }

    fn build(schema: Arc<Schema>, attrs: Attrs, synchronized: bool, on_unknown: fn(&str, &str)) -> Self {
        let (body, header, uri) = split_attrs(&schema, attrs, |key| on_unknown(&schema.type_name, key));
        Self {
            body: AttributeStore::new(body, synchronized),
            header: AttributeStore::new(header, synchronized),
            uri: AttributeStore::new(uri, synchronized),
            schema,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn body(&self) -> &AttributeStore {
        &self.body
    }

    pub fn headers(&self) -> &AttributeStore {
        &self.header
    }

    pub fn uri(&self) -> &AttributeStore {
        &self.uri
    }

    fn store(&self, location: Location) -> &AttributeStore {
        match location {
            Location::Body => &self.body,
            Location::Header => &self.header,
            Location::Uri => &self.uri,
        }
    }

    fn store_mut(&mut self, location: Location) -> &mut AttributeStore {
        match location {
            Location::Body => &mut self.body,
            Location::Header => &mut self.header,
            Location::Uri => &mut self.uri,
        }
    }

    fn attribute(&self, name: &str) -> Result<&Attribute> {
        self.schema
            .lookup(name)
            .ok_or_else(|| Error::UnknownAttribute {
                resource: self.schema.type_name.clone(),
                attribute: name.to_string(),
            })
    }

    /// Read an attribute by client or wire name, coerced to its declared type
    pub fn attr(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return self.raw_id().cloned();
        }
        let attribute = self.schema.lookup(name)?;
        let raw = self
            .store(attribute.location)
            .get(attribute.wire_name())
            .or(attribute.default.as_ref())?;
        match attribute.deserialize_value(raw) {
            Value::Null => None,
            value => Some(value),
        }
    }

    /// Read an attribute and deserialize it into `T`
    pub fn attr_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.attr(name).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Read a `resource:<key>` attribute as a nested [`Resource`]
    pub fn nested(&self, name: &str) -> Result<Option<Resource>> {
        let attribute = self.attribute(name)?;
        let AttrType::Resource(key) = &attribute.kind else {
            return Err(Error::InvalidAttribute {
                attribute: name.to_string(),
                reason: format!("declared as {}, not a resource", attribute.kind),
            });
        };
        match self.attr(name) {
            Some(value) => Ok(Some(Resource::existing(registry::schema(key)?, attrs(value)))),
            None => Ok(None),
        }
    }

    /// Write an attribute by client or wire name, validating it against its
    /// declared type
    pub fn set_attr(&mut self, name: &str, value: Value) -> Result<()> {
        let attribute = self.attribute(name)?;
        let location = attribute.location;
        let wire = attribute.wire_name().to_string();
        let value = attribute.serialize_value(value)?;
        self.store_mut(location).set(&wire, value);
        Ok(())
    }

    /// Remove an attribute; it is sent as `null` by the next update
    pub fn unset_attr(&mut self, name: &str) -> Result<()> {
        let attribute = self.attribute(name)?;
        let location = attribute.location;
        let wire = attribute.wire_name().to_string();
        self.store_mut(location).remove(&wire);
        Ok(())
    }

    /// Merge caller attributes into the stores, dirtying changed values
    pub fn update_attrs(&mut self, attrs: Attrs) {
        let type_name = self.schema.type_name.clone();
        let (body, header, uri) = split_attrs(&self.schema, attrs, |key| {
            tracing::warn!("Dropping unknown attribute `{}` for {}", key, type_name);
        });
        self.body.update(body);
        self.header.update(header);
        self.uri.update(uri);
    }

    fn raw_id(&self) -> Option<&Value> {
        let value = self
            .body
            .get("id")
            .or_else(|| self.body.get(self.schema.id_wire_name()))
            .or_else(|| {
                self.schema
                    .alternate_id()
                    .and_then(|alt| self.body.get(alt.wire_name()))
            })?;
        (!value.is_null()).then_some(value)
    }

    /// Canonical id: `id`, its wire alias, then the alternate id
    pub fn id(&self) -> Option<String> {
        self.raw_id().map(value_to_param)
    }

    pub fn name(&self) -> Option<String> {
        self.attr("name").map(|v| value_to_param(&v))
    }

    pub fn status(&self) -> Option<String> {
        self.attr("status").map(|v| value_to_param(&v))
    }

    /// Dirty body values, keyed by wire name
    pub fn dirty_body(&self) -> Attrs {
        self.body.dirty()
    }

    /// Dirty header values, keyed by wire name
    pub fn dirty_headers(&self) -> Attrs {
        self.header.dirty()
    }

    pub fn is_dirty(&self) -> bool {
        self.body.is_dirty() || self.header.is_dirty()
    }

    /// Mark the body and header stores as in sync with the server
    pub fn clean(&mut self) {
        self.body.clean();
        self.header.clean();
    }

    /// Client-name keyed view of the body and/or header attributes
    pub fn to_dict(&self, body: bool, headers: bool, ignore_none: bool) -> Result<Attrs> {
        if !body && !headers {
            return Err(Error::InvalidRequest(
                "At least one of `body` or `headers` must be true".to_string(),
            ));
        }
        let mut out = Attrs::new();
        for attribute in &self.schema.attributes {
            let wanted = match attribute.location {
                Location::Body => body,
                Location::Header => headers,
                Location::Uri => false,
            };
            if !wanted {
                continue;
            }
            match self.attr(&attribute.attr) {
                Some(value) => {
                    out.insert(attribute.attr.clone(), value);
                },
                None if !ignore_none => {
                    out.insert(attribute.attr.clone(), Value::Null);
                },
                None => {},
            }
        }
        Ok(out)
    }

    /// Build the uri, dirty body and dirty headers of a request
    pub fn prepare_request(&self, requires_id: bool, prepend_key: bool) -> Result<PreparedRequest> {
        let mut body = Value::Object(self.body.dirty());
        if prepend_key {
            if let Some(key) = &self.schema.resource_key {
                let mut wrapped = Map::new();
                wrapped.insert(key.clone(), body);
                body = Value::Object(wrapped);
            }
        }

        let mut uri = self.schema.entity_uri(self.uri.attributes())?;
        if requires_id {
            let id = self.id().ok_or_else(|| {
                Error::InvalidRequest("Request requires an ID but none was found".to_string())
            })?;
            uri = urljoin(&[uri.as_str(), &urlencoding::encode(&id)]);
        }

        Ok(PreparedRequest {
            uri,
            body,
            headers: self.header.dirty(),
        })
    }

    /// Merge a server response into the stores and mark them clean.
    ///
    /// Only fields the schema knows are kept. The body is read only when
    /// `has_body` is set.
    pub fn translate_response(&mut self, response: &Response, has_body: bool) -> Result<()> {
        if has_body {
            let mut body = response.json()?;
            if let Some(key) = &self.schema.resource_key {
                if let Some(inner) = body.get_mut(key.as_str()).map(Value::take) {
                    body = inner;
                }
            }
            if let Value::Object(fields) = body {
                let known: Vec<(String, Value)> = fields
                    .into_iter()
                    .filter(|(k, _)| self.schema.by_wire(Location::Body, k).is_some())
                    .collect();
                self.body.update(known);
            }
            self.body.clean();
        }

        let headers: Vec<(String, Value)> = self
            .schema
            .attributes_in(Location::Header)
            .filter_map(|a| {
                response
                    .header(a.wire_name())
                    .map(|v| (a.wire_name().to_string(), Value::String(v.to_string())))
            })
            .collect();
        self.header.update(headers);
        self.header.clean();
        Ok(())
    }

    async fn send(&self, session: &Session, method: Method, uri: &str, opts: RequestOptions) -> Result<Response> {
        session.request(method, &self.schema.service, uri, opts).await
    }

    /// Create the remote resource. `put_create` types PUT to their id path;
    /// everything else POSTs to the collection.
    pub async fn create(mut self, session: &Session, prepend_key: bool) -> Result<Self> {
        self.schema.require(Operation::Create)?;

        let (method, request) = if self.schema.put_create {
            (Method::PUT, self.prepare_request(true, prepend_key)?)
        } else {
            (Method::POST, self.prepare_request(false, prepend_key)?)
        };
        let opts = RequestOptions::new()
            .json(request.body.clone())
            .headers(request.header_pairs());

        let response = self.send(session, method, &request.uri, opts).await?;
        self.translate_response(&response, true)?;
        Ok(self)
    }

    pub async fn get(self, session: &Session, requires_id: bool) -> Result<Self> {
        self.get_with(session, requires_id, RequestOptions::new()).await
    }

    /// [`Resource::get`] with extra request headers
    pub async fn get_with(mut self, session: &Session, requires_id: bool, opts: RequestOptions) -> Result<Self> {
        self.schema.require(Operation::Get)?;

        let request = self.prepare_request(requires_id, false)?;
        let response = self.send(session, Method::GET, &request.uri, opts).await?;
        self.translate_response(&response, true)?;
        Ok(self)
    }

    /// Refresh header attributes only
    pub async fn head(mut self, session: &Session, requires_id: bool) -> Result<Self> {
        self.schema.require(Operation::Head)?;

        let request = self.prepare_request(requires_id, false)?;
        let opts = RequestOptions::new().header("Accept", "");
        let response = self.send(session, Method::HEAD, &request.uri, opts).await?;
        self.translate_response(&response, false)?;
        Ok(self)
    }

    /// Send the dirty attributes to the server.
    ///
    /// Returns without a request when nothing but the id is dirty.
    pub async fn update(mut self, session: &Session, prepend_key: bool, has_body: bool) -> Result<Self> {
        self.schema.require(Operation::Update)?;

        self.body.discard_dirty("id");
        let id_wire = self.schema.id_wire_name().to_string();
        self.body.discard_dirty(&id_wire);

        if !self.is_dirty() {
            tracing::debug!("Nothing to update for {}", self.schema.type_name);
            return Ok(self);
        }

        let request = self.prepare_request(true, prepend_key)?;
        let mut opts = RequestOptions::new().headers(request.header_pairs());

        let method = if self.schema.patch_update {
            let body = match self.schema.patch_format {
                PatchFormat::Dict => request.body.clone(),
                PatchFormat::AttrsList => Value::Array(vec![Value::Object(self.body.dirty())]),
                PatchFormat::JsonPatch => json_patch(&self.body.dirty()),
            };
            opts = opts.json(body);
            if let Some(content_type) = &self.schema.patch_content_type {
                opts = opts.header("Content-Type", content_type.as_str());
            }
            Method::PATCH
        } else {
            opts = opts.json(request.body.clone());
            Method::PUT
        };

        let response = self.send(session, method, &request.uri, opts).await?;
        self.translate_response(&response, has_body)?;
        Ok(self)
    }

    /// Delete the remote resource. `params` are sent as the query string.
    pub async fn delete(self, session: &Session, params: Option<&Attrs>, has_body: bool) -> Result<Self> {
        self.delete_with(session, params, has_body, RequestOptions::new())
            .await
    }

    /// [`Resource::delete`] with extra request headers
    pub async fn delete_with(
        mut self,
        session: &Session,
        params: Option<&Attrs>,
        has_body: bool,
        opts: RequestOptions,
    ) -> Result<Self> {
        self.schema.require(Operation::Delete)?;

        let request = self.prepare_request(true, false)?;
        let mut opts = opts.default_header("Accept", "");
        if let Some(params) = params {
            opts = opts.params(query_pairs(params));
        }

        let response = self.send(session, Method::DELETE, &request.uri, opts).await?;
        self.translate_response(&response, has_body)?;
        Ok(self)
    }

    /// Find a resource by id, falling back to a name match in a listing.
    ///
    /// `params` carries uri attributes (parent ids) and list filters.
    pub async fn find(
        session: &Session,
        schema: Arc<Schema>,
        name_or_id: &str,
        ignore_missing: bool,
        params: Attrs,
    ) -> Result<Option<Resource>> {
        if schema.allow.get {
            let mut attrs = params.clone();
            attrs.insert("id".to_string(), Value::String(name_or_id.to_string()));
            match Resource::existing(schema.clone(), attrs).get(session, true).await {
                Ok(found) => return Ok(Some(found)),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("No {} with id {}, trying by name", schema.type_name, name_or_id);
                },
                Err(e) => return Err(e),
            }
        }

        if schema.allow.list {
            let results: Vec<Resource> = Resource::list(session, schema.clone(), false, params)?
                .try_collect()
                .await?;
            if let Some(found) = get_one_match(&schema.type_name, name_or_id, results)? {
                return Ok(Some(found));
            }
        }

        if ignore_missing {
            return Ok(None);
        }
        Err(Error::ResourceNotFound(format!(
            "No {} found for {}",
            schema.type_name, name_or_id
        )))
    }
}

/// The single result whose id or name equals `name_or_id`
pub fn get_one_match<I>(type_name: &str, name_or_id: &str, results: I) -> Result<Option<Resource>>
where
    I: IntoIterator<Item = Resource>,
{
    let mut the_result = None;
    for candidate in results {
        let matches = candidate.id().as_deref() == Some(name_or_id)
            || candidate.name().as_deref() == Some(name_or_id);
        if !matches {
            continue;
        }
        if the_result.is_some() {
            return Err(Error::DuplicateResource(format!(
                "More than one {} exists with the name '{}'.",
                type_name, name_or_id
            )));
        }
        the_result = Some(candidate);
    }
    Ok(the_result)
}

/// Split caller attributes across the three stores, renaming client names to
/// wire names
fn split_attrs(schema: &Schema, attrs: Attrs, mut on_unknown: impl FnMut(&str)) -> (Attrs, Attrs, Attrs) {
    let mut body = Attrs::new();
    let mut header = Attrs::new();
    let mut uri = Attrs::new();
    for (key, value) in attrs {
        let Some(attribute) = schema.lookup(&key) else {
            on_unknown(&key);
            continue;
        };
        let target = match attribute.location {
            Location::Body => &mut body,
            Location::Header => &mut header,
            Location::Uri => &mut uri,
        };
        target.insert(attribute.wire_name().to_string(), value);
    }
    (body, header, uri)
}

fn json_patch(dirty: &Attrs) -> Value {
    let ops = dirty
        .iter()
        .map(|(key, value)| {
            let path = format!("/{}", key.replace('~', "~0").replace('/', "~1"));
            if value.is_null() {
                json!({"op": "remove", "path": path})
            } else {
                json!({"op": "replace", "path": path, "value": value})
            }
        })
        .collect();
    Value::Array(ops)
}
