//! Messaging service proxy
//!
//! The messaging API wants `Client-ID` and `X-PROJECT-ID` on every request.
//! A missing client id is generated per call; a missing project id falls back
//! to the session's project.

use crate::error::Result;
use crate::proxy::BaseProxy;
use crate::resource::{Attrs, Resource, ResourceStream};
use crate::session::{RequestOptions, Session};
use serde_json::Value;

pub const SUBSCRIPTION: &str = "message.subscription";

#[derive(Clone, Debug)]
pub struct MessageProxy {
    base: BaseProxy,
}

/// `Client-ID` / `X-PROJECT-ID` for one request
fn scope_headers(session: &Session, client_id: Option<String>, project_id: Option<String>) -> RequestOptions {
    let client_id = client_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut opts = RequestOptions::new().header("Client-ID", client_id);
    if let Some(project) = project_id.or_else(|| session.project_id().map(str::to_string)) {
        opts = opts.header("X-PROJECT-ID", project);
    }
    opts
}

fn string_attr(res: &Resource, name: &str) -> Option<String> {
    res.attr_as::<String>(name).filter(|s| !s.is_empty())
}

fn take_string(params: &mut Attrs, name: &str) -> Option<String> {
    match params.remove(name)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

impl MessageProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    fn headers_for(&self, res: &Resource) -> RequestOptions {
        scope_headers(
            self.base.session(),
            string_attr(res, "client_id"),
            string_attr(res, "project_id"),
        )
    }

    /// Subscribe to `queue_name`
    pub async fn create_subscription(&self, queue_name: &str, mut attrs: Attrs) -> Result<Resource> {
        attrs.insert("queue_name".to_string(), Value::String(queue_name.to_string()));
        let mut res = Resource::from_key(SUBSCRIPTION, attrs)?;
        let request = res.prepare_request(false, true)?;
        let opts = self.headers_for(&res).json(request.body);
        let response = self
            .base
            .session()
            .post(&res.schema().service, &request.uri, opts)
            .await?;
        res.translate_response(&response, true)?;
        Ok(res)
    }

    pub async fn get_subscription(&self, queue_name: &str, subscription: &str) -> Result<Resource> {
        let res = self.subscription(queue_name, subscription)?;
        let opts = self.headers_for(&res);
        res.get_with(self.base.session(), true, opts).await
    }

    pub async fn delete_subscription(&self, queue_name: &str, subscription: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        let res = self.subscription(queue_name, subscription)?;
        let opts = self.headers_for(&res);
        match res.delete_with(self.base.session(), None, false, opts).await {
            Ok(deleted) => Ok(Some(deleted)),
            Err(e) if e.is_not_found() && ignore_missing => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List subscriptions of `queue_name`; `client_id` and `project_id`
    /// among the params are sent as headers
    pub fn subscriptions(&self, queue_name: &str, mut params: Attrs) -> Result<ResourceStream<'_>> {
        let opts = scope_headers(
            self.base.session(),
            take_string(&mut params, "client_id"),
            take_string(&mut params, "project_id"),
        );
        params.insert("queue_name".to_string(), Value::String(queue_name.to_string()));
        Resource::list_with(self.base.session(), self.base.schema(SUBSCRIPTION)?, true, params, opts)
    }

    fn subscription(&self, queue_name: &str, subscription: &str) -> Result<Resource> {
        let mut attrs = Attrs::new();
        attrs.insert("queue_name".to_string(), Value::String(queue_name.to_string()));
        self.base.get_resource(SUBSCRIPTION, subscription, attrs)
    }
}
