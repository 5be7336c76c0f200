//! Generic proxy operations
//!
//! [`BaseProxy`] is the shared plumbing behind every service proxy: it turns
//! an id or a resource value into a [`Resource`] of the right type, runs the
//! CRUD call and maps not-found responses the way callers expect.

use crate::error::{Error, Result};
use crate::resource::{self, wait, Attrs, Resource, ResourceStream, Schema};
use crate::session::{RequestOptions, Response, Session};
use crate::utils::urljoin;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default polling interval of the wait helpers
pub const WAIT_INTERVAL: Duration = Duration::from_secs(2);
/// Default deadline of the wait helpers
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(120);

/// A resource given either by id or by value
#[derive(Debug, Clone)]
pub enum ResourceRef {
    Id(String),
    Resource(Resource),
}

impl ResourceRef {
    pub fn id(&self) -> Option<String> {
        match self {
            ResourceRef::Id(id) => Some(id.clone()),
            ResourceRef::Resource(resource) => resource.id(),
        }
    }
}

impl From<&str> for ResourceRef {
    fn from(id: &str) -> Self {
        ResourceRef::Id(id.to_string())
    }
}

impl From<String> for ResourceRef {
    fn from(id: String) -> Self {
        ResourceRef::Id(id)
    }
}

impl From<&String> for ResourceRef {
    fn from(id: &String) -> Self {
        ResourceRef::Id(id.clone())
    }
}

impl From<Resource> for ResourceRef {
    fn from(resource: Resource) -> Self {
        ResourceRef::Resource(resource)
    }
}

impl From<&Resource> for ResourceRef {
    fn from(resource: &Resource) -> Self {
        ResourceRef::Resource(resource.clone())
    }
}

#[derive(Clone, Debug)]
pub struct BaseProxy {
    session: Session,
}

impl BaseProxy {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolve `value` into a resource of type `key`.
    ///
    /// An id becomes a new resource carrying that id plus `attrs`; a resource
    /// value has `attrs` merged into it.
    pub fn get_resource(&self, key: &str, value: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        match value.into() {
            ResourceRef::Id(id) => {
                let mut attrs = attrs;
                attrs.insert("id".to_string(), Value::String(id));
                Resource::from_key(key, attrs)
            },
            ResourceRef::Resource(mut resource) => {
                if resource.schema().key != key {
                    // same entity seen through another type (e.g. a *_detail listing)
                    let mut data = resource.to_dict(true, false, true)?;
                    data.remove("location");
                    resource = Resource::existing(resource::schema(key)?, data);
                }
                resource.update_attrs(attrs);
                Ok(resource)
            },
        }
    }

    pub async fn create(&self, key: &str, attrs: Attrs) -> Result<Resource> {
        self.create_with(key, attrs, true).await
    }

    /// [`BaseProxy::create`] choosing whether the body is wrapped in the
    /// resource key
    pub async fn create_with(&self, key: &str, attrs: Attrs, prepend_key: bool) -> Result<Resource> {
        Resource::from_key(key, attrs)?
            .create(&self.session, prepend_key)
            .await
    }

    pub async fn get(&self, key: &str, value: impl Into<ResourceRef>) -> Result<Resource> {
        self.get_with(key, value, Attrs::new(), true).await
    }

    /// [`BaseProxy::get`] with extra attributes (usually parent ids)
    pub async fn get_with(
        &self,
        key: &str,
        value: impl Into<ResourceRef>,
        attrs: Attrs,
        requires_id: bool,
    ) -> Result<Resource> {
        let value = value.into();
        let shown = value.id().unwrap_or_default();
        let res = self.get_resource(key, value, attrs)?;
        let type_name = res.schema().type_name.clone();
        res.get(&self.session, requires_id)
            .await
            .map_err(|e| not_found(e, &type_name, &shown))
    }

    pub async fn head(&self, key: &str, value: impl Into<ResourceRef>) -> Result<Resource> {
        let value = value.into();
        let shown = value.id().unwrap_or_default();
        let res = self.get_resource(key, value, Attrs::new())?;
        let type_name = res.schema().type_name.clone();
        let requires_id = res.id().is_some();
        res.head(&self.session, requires_id)
            .await
            .map_err(|e| not_found(e, &type_name, &shown))
    }

    pub async fn update(&self, key: &str, value: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.update_with(key, value, attrs, true).await
    }

    /// [`BaseProxy::update`] choosing whether the body is wrapped in the
    /// resource key
    pub async fn update_with(
        &self,
        key: &str,
        value: impl Into<ResourceRef>,
        attrs: Attrs,
        prepend_key: bool,
    ) -> Result<Resource> {
        self.get_resource(key, value, attrs)?
            .update(&self.session, prepend_key, true)
            .await
    }

    /// Delete a resource. A missing resource yields `Ok(None)` when
    /// `ignore_missing` is set and `ResourceNotFound` otherwise.
    pub async fn delete(&self, key: &str, value: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        let res = self.get_resource(key, value, Attrs::new())?;
        self.delete_resource(res, None, ignore_missing).await
    }

    /// Delete an already resolved resource, sending `params` as the query
    pub async fn delete_resource(
        &self,
        res: Resource,
        params: Option<&Attrs>,
        ignore_missing: bool,
    ) -> Result<Option<Resource>> {
        let type_name = res.schema().type_name.clone();
        let shown = res.id().unwrap_or_default();
        match res.delete(&self.session, params, false).await {
            Ok(deleted) => Ok(Some(deleted)),
            Err(e) if e.is_not_found() && ignore_missing => {
                tracing::debug!("{} {} already gone", type_name, shown);
                Ok(None)
            },
            Err(e) => Err(not_found(e, &type_name, &shown)),
        }
    }

    pub async fn find(&self, key: &str, name_or_id: &str, ignore_missing: bool, params: Attrs) -> Result<Option<Resource>> {
        Resource::find(&self.session, resource::schema(key)?, name_or_id, ignore_missing, params).await
    }

    pub fn list(&self, key: &str, paginated: bool, params: Attrs) -> Result<ResourceStream<'_>> {
        Resource::list(&self.session, resource::schema(key)?, paginated, params)
    }

    pub fn schema(&self, key: &str) -> Result<Arc<Schema>> {
        resource::schema(key)
    }

    /// Send a request to a path below the resource's entity url
    /// (`<base>/<id>/<segments...>`)
    pub async fn resource_request(
        &self,
        method: Method,
        res: &Resource,
        segments: &[&str],
        opts: RequestOptions,
    ) -> Result<Response> {
        let id = res.id().ok_or_else(|| {
            Error::InvalidRequest(format!("{} has no id", res.schema().type_name))
        })?;
        let base = res.schema().entity_uri(res.uri().attributes())?;
        let mut parts = vec![base, urlencoding::encode(&id).into_owned()];
        parts.extend(segments.iter().map(|s| urlencoding::encode(s).into_owned()));
        let uri = urljoin(&parts);
        self.session
            .request(method, &res.schema().service, &uri, opts)
            .await
    }

    /// Poll until `res` reaches `status`
    pub async fn wait_for_status(
        &self,
        res: Resource,
        status: &str,
        failures: &[&str],
        interval: Duration,
        wait: Duration,
    ) -> Result<Resource> {
        wait::wait_for_status(&self.session, res, status, failures, interval, wait).await
    }

    /// Poll until `res` is gone
    pub async fn wait_for_delete(&self, res: Resource, interval: Duration, wait: Duration) -> Result<Resource> {
        wait::wait_for_delete(&self.session, res, interval, wait).await
    }
}

fn not_found(err: Error, type_name: &str, id: &str) -> Error {
    if err.is_not_found() {
        Error::ResourceNotFound(format!("No {} found for {}", type_name, id))
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::attrs;
    use crate::session::Profile;
    use serde_json::json;

    fn proxy() -> BaseProxy {
        BaseProxy::new(Session::new(Profile::default()).unwrap())
    }

    #[test]
    fn test_get_resource_from_id() {
        let res = proxy()
            .get_resource("compute.server", "s1", attrs(json!({"name": "web"})))
            .unwrap();
        assert_eq!(res.id().as_deref(), Some("s1"));
        assert_eq!(res.name().as_deref(), Some("web"));
        assert_eq!(res.schema().type_name, "Server");
    }

    #[test]
    fn test_get_resource_from_value_merges() {
        let server = Resource::existing(
            resource::schema("compute.server").unwrap(),
            attrs(json!({"id": "s1", "name": "web"})),
        );
        let res = proxy()
            .get_resource("compute.server", &server, attrs(json!({"name": "db"})))
            .unwrap();
        assert_eq!(res.name().as_deref(), Some("db"));
        assert_eq!(res.dirty_body(), attrs(json!({"name": "db"})));
    }

    #[test]
    fn test_get_resource_converts_type() {
        let detail = Resource::existing(
            resource::schema("compute.server_detail").unwrap(),
            attrs(json!({"id": "s1", "status": "ACTIVE"})),
        );
        let res = proxy().get_resource("compute.server", detail, Attrs::new()).unwrap();
        assert_eq!(res.schema().key, "compute.server");
        assert_eq!(res.status().as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_not_found_mapping() {
        let err = Error::NotFound(crate::error::HttpError {
            status: 404,
            method: "GET".into(),
            url: "http://x/servers/s1".into(),
            request_id: None,
            code: None,
            message: "Not Found".into(),
            details: None,
        });
        let mapped = not_found(err, "Server", "s1");
        assert_eq!(mapped.to_string(), "No Server found for s1");
    }
}
