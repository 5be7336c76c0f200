//! Orchestration service proxy

use crate::error::Result;
use crate::proxy::{BaseProxy, ResourceRef};
use crate::resource::{Attrs, Resource, ResourceStream};
use crate::session::RequestOptions;
use serde_json::{Map, Value};

pub const STACK: &str = "orchestration.stack";
pub const TEMPLATE: &str = "orchestration.template";

/// Optional inputs of a template validation
#[derive(Debug, Clone, Default)]
pub struct Validate {
    pub environment: Option<Value>,
    pub template_url: Option<String>,
    pub ignore_errors: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OrchestrationProxy {
    base: BaseProxy,
}

impl OrchestrationProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    pub async fn create_stack(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create_with(STACK, attrs, false).await
    }

    pub async fn get_stack(&self, stack: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(STACK, stack).await
    }

    pub async fn update_stack(&self, stack: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update_with(STACK, stack, attrs, false).await
    }

    pub async fn delete_stack(&self, stack: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(STACK, stack, ignore_missing).await
    }

    pub async fn find_stack(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(STACK, name_or_id, ignore_missing, Attrs::new()).await
    }

    pub fn stacks(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(STACK, true, query)
    }

    /// Validate a template; the returned resource holds the parameters the
    /// server parsed out of it
    pub async fn validate_template(&self, template: Value, options: Validate) -> Result<Resource> {
        let mut body = Map::new();
        body.insert("template".into(), template);
        if let Some(environment) = options.environment {
            body.insert("environment".into(), environment);
        }
        if let Some(url) = options.template_url {
            body.insert("template_url".into(), Value::String(url));
        }

        let mut opts = RequestOptions::new().json(Value::Object(body));
        if let Some(ignore) = options.ignore_errors.filter(|s| !s.is_empty()) {
            opts = opts.params(vec![("ignore_errors".to_string(), ignore)]);
        }

        let mut template = Resource::from_key(TEMPLATE, Attrs::new())?;
        let response = self
            .base
            .session()
            .post(&template.schema().service, "/validate", opts)
            .await?;
        template.translate_response(&response, true)?;
        Ok(template)
    }

    /// Wait for a stack to reach `status`; any `*_FAILED` status is a failure
    pub async fn wait_for_stack(&self, stack: Resource, status: &str) -> Result<Resource> {
        self.base
            .wait_for_status(
                stack,
                status,
                &["CREATE_FAILED", "UPDATE_FAILED", "DELETE_FAILED"],
                crate::proxy::WAIT_INTERVAL,
                crate::proxy::WAIT_TIMEOUT,
            )
            .await
    }
}
