//! Auto-scaling service proxy
//!
//! Every collection of this service pages by `start_number` and reports a
//! `total_number` count. Policies, instances and activity logs live below a
//! scaling group, so their listings take the group id.

use crate::error::{Error, Result};
use crate::proxy::{BaseProxy, ResourceRef};
use crate::resource::{attrs, Attrs, Resource, ResourceStream};
use crate::session::RequestOptions;
use reqwest::Method;
use serde_json::{json, Value};

pub const CONFIG: &str = "auto_scaling.config";
pub const GROUP: &str = "auto_scaling.group";
pub const POLICY: &str = "auto_scaling.policy";
pub const INSTANCE: &str = "auto_scaling.instance";
pub const ACTIVITY: &str = "auto_scaling.activity";
pub const QUOTA: &str = "auto_scaling.quota";
pub const GROUP_QUOTA: &str = "auto_scaling.group_quota";

#[derive(Clone, Debug)]
pub struct AutoScalingProxy {
    base: BaseProxy,
}

impl AutoScalingProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    fn group_id(&self, group: impl Into<ResourceRef>) -> Result<String> {
        self.base
            .get_resource(GROUP, group, Attrs::new())?
            .id()
            .ok_or_else(|| Error::InvalidRequest("scaling group has no id".to_string()))
    }

    fn scoped(&self, group: impl Into<ResourceRef>, mut query: Attrs) -> Result<Attrs> {
        query.insert("scaling_group_id".to_string(), Value::String(self.group_id(group)?));
        Ok(query)
    }

    // =========================================================================
    // Configs
    // =========================================================================

    pub fn configs(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(CONFIG, true, query)
    }

    /// Create a scaling configuration named `name` from instance settings
    pub async fn create_config(&self, name: &str, instance_config: Value) -> Result<Resource> {
        let config = attrs(json!({"name": name, "instance_config": instance_config}));
        self.base.create_with(CONFIG, config, false).await
    }

    pub async fn get_config(&self, config: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(CONFIG, config).await
    }

    pub async fn delete_config(&self, config: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(CONFIG, config, ignore_missing).await
    }

    /// Delete several configurations in one call
    pub async fn batch_delete_configs<I, R>(&self, configs: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceRef>,
    {
        let ids: Vec<String> = configs
            .into_iter()
            .filter_map(|c| c.into().id())
            .collect();
        tracing::info!("Deleting {} scaling configurations", ids.len());
        let schema = self.base.schema(CONFIG)?;
        let opts = RequestOptions::new().json(json!({"scaling_configuration_id": ids}));
        self.base
            .session()
            .post(&schema.service, "/scaling_configurations", opts)
            .await?;
        Ok(())
    }

    pub async fn find_config(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        let query = attrs(json!({"name": name_or_id}));
        self.base.find(CONFIG, name_or_id, ignore_missing, query).await
    }

    // =========================================================================
    // Groups
    // =========================================================================

    pub fn groups(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(GROUP, true, query)
    }

    pub async fn create_group(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create_with(GROUP, attrs, false).await
    }

    pub async fn update_group(&self, group: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update_with(GROUP, group, attrs, false).await
    }

    pub async fn get_group(&self, group: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(GROUP, group).await
    }

    pub async fn delete_group(&self, group: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(GROUP, group, ignore_missing).await
    }

    pub async fn find_group(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        let query = attrs(json!({"name": name_or_id}));
        self.base.find(GROUP, name_or_id, ignore_missing, query).await
    }

    pub async fn resume_group(&self, group: impl Into<ResourceRef>) -> Result<()> {
        self.action(GROUP, group, json!({"action": "resume"})).await
    }

    pub async fn pause_group(&self, group: impl Into<ResourceRef>) -> Result<()> {
        self.action(GROUP, group, json!({"action": "pause"})).await
    }

    // =========================================================================
    // Policies
    // =========================================================================

    pub fn policies(&self, group: impl Into<ResourceRef>, query: Attrs) -> Result<ResourceStream<'_>> {
        let query = self.scoped(group, query)?;
        self.base.list(POLICY, true, query)
    }

    pub async fn create_policy(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create_with(POLICY, attrs, false).await
    }

    pub async fn update_policy(&self, policy: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update_with(POLICY, policy, attrs, false).await
    }

    pub async fn get_policy(&self, policy: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(POLICY, policy).await
    }

    pub async fn delete_policy(&self, policy: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(POLICY, policy, ignore_missing).await
    }

    /// Find a policy of `group` by name or id
    pub async fn find_policy(
        &self,
        name_or_id: &str,
        group: impl Into<ResourceRef>,
        ignore_missing: bool,
    ) -> Result<Option<Resource>> {
        let query = self.scoped(group, attrs(json!({"name": name_or_id})))?;
        self.base.find(POLICY, name_or_id, ignore_missing, query).await
    }

    pub async fn execute_policy(&self, policy: impl Into<ResourceRef>) -> Result<()> {
        self.action(POLICY, policy, json!({"action": "execute"})).await
    }

    pub async fn resume_policy(&self, policy: impl Into<ResourceRef>) -> Result<()> {
        self.action(POLICY, policy, json!({"action": "resume"})).await
    }

    pub async fn pause_policy(&self, policy: impl Into<ResourceRef>) -> Result<()> {
        self.action(POLICY, policy, json!({"action": "pause"})).await
    }

    // =========================================================================
    // Instances
    // =========================================================================

    pub fn instances(&self, group: impl Into<ResourceRef>, query: Attrs) -> Result<ResourceStream<'_>> {
        let query = self.scoped(group, query)?;
        self.base.list(INSTANCE, true, query)
    }

    /// Remove one instance from its group, optionally deleting the server
    pub async fn remove_instance(
        &self,
        instance: impl Into<ResourceRef>,
        delete_instance: bool,
        ignore_missing: bool,
    ) -> Result<Option<Resource>> {
        let instance = self.base.get_resource(INSTANCE, instance, Attrs::new())?;
        let params = attrs(json!({"instance_delete": yes_no(delete_instance)}));
        self.base
            .delete_resource(instance, Some(&params), ignore_missing)
            .await
    }

    /// Remove several instances from `group`
    pub async fn batch_remove_instances<I, R>(
        &self,
        group: impl Into<ResourceRef>,
        instances: I,
        delete_instance: bool,
    ) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceRef>,
    {
        let body = json!({
            "action": "REMOVE",
            "instances_id": instance_ids(instances),
            "instance_delete": yes_no(delete_instance),
        });
        self.batch_action(group, body).await
    }

    /// Add existing servers to `group`
    pub async fn batch_add_instances<I, R>(&self, group: impl Into<ResourceRef>, instances: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceRef>,
    {
        let body = json!({"action": "ADD", "instances_id": instance_ids(instances)});
        self.batch_action(group, body).await
    }

    async fn batch_action(&self, group: impl Into<ResourceRef>, body: Value) -> Result<()> {
        let group_id = self.group_id(group)?;
        tracing::info!("Scaling group {} instance batch {}", group_id, body["action"]);
        let schema = self.base.schema(INSTANCE)?;
        let uri = format!("{}/{}/action", schema.base_path, urlencoding::encode(&group_id));
        self.base
            .session()
            .post(&schema.service, &uri, RequestOptions::new().json(body))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Activities and quotas
    // =========================================================================

    pub fn activities(&self, group: impl Into<ResourceRef>, query: Attrs) -> Result<ResourceStream<'_>> {
        let query = self.scoped(group, query)?;
        self.base.list(ACTIVITY, true, query)
    }

    /// Quotas of the tenant, or of one group when `group` is given
    pub fn quotas(&self, group: Option<ResourceRef>) -> Result<ResourceStream<'_>> {
        match group {
            Some(group) => {
                let query = self.scoped(group, Attrs::new())?;
                self.base.list(GROUP_QUOTA, false, query)
            },
            None => self.base.list(QUOTA, false, Attrs::new()),
        }
    }

    async fn action(&self, key: &str, value: impl Into<ResourceRef>, body: Value) -> Result<()> {
        let res = self.base.get_resource(key, value, Attrs::new())?;
        tracing::info!(
            "{} {} action {}",
            res.schema().type_name,
            res.id().unwrap_or_default(),
            body["action"]
        );
        self.base
            .resource_request(Method::POST, &res, &["action"], RequestOptions::new().json(body))
            .await?;
        Ok(())
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn instance_ids<I, R>(instances: I) -> Vec<String>
where
    I: IntoIterator<Item = R>,
    R: Into<ResourceRef>,
{
    instances.into_iter().filter_map(|i| i.into().id()).collect()
}
