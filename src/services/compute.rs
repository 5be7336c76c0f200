//! Compute service proxy
//!
//! Servers with their `action` calls, flavors, keypairs and availability
//! zones.

use crate::error::Result;
use crate::proxy::{BaseProxy, ResourceRef};
use crate::resource::{Attrs, Resource, ResourceStream};
use crate::session::RequestOptions;
use reqwest::Method;
use serde_json::{json, Map, Value};

pub const SERVER: &str = "compute.server";
pub const SERVER_DETAIL: &str = "compute.server_detail";
pub const FLAVOR: &str = "compute.flavor";
pub const FLAVOR_DETAIL: &str = "compute.flavor_detail";
pub const KEYPAIR: &str = "compute.keypair";
pub const AVAILABILITY_ZONE: &str = "compute.availability_zone";
pub const AVAILABILITY_ZONE_DETAIL: &str = "compute.availability_zone_detail";

/// Optional fields of a rebuild
#[derive(Debug, Clone, Default)]
pub struct Rebuild {
    pub access_ipv4: Option<String>,
    pub access_ipv6: Option<String>,
    pub metadata: Option<Value>,
    pub personality: Option<Value>,
    pub preserve_ephemeral: bool,
}

#[derive(Clone, Debug)]
pub struct ComputeProxy {
    base: BaseProxy,
}

impl ComputeProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    // =========================================================================
    // Servers
    // =========================================================================

    /// Create a server. `scheduler_hints` given among the attributes are
    /// sent next to the server document, not inside it.
    pub async fn create_server(&self, mut attrs: Attrs) -> Result<Resource> {
        let hints = attrs
            .remove("scheduler_hints")
            .or_else(|| attrs.remove("os:scheduler_hints"));
        let Some(hints) = hints else {
            return self.base.create(SERVER, attrs).await;
        };

        let server = Resource::from_key(SERVER, attrs)?;
        let mut request = server.prepare_request(false, true)?;
        if let Value::Object(body) = &mut request.body {
            body.insert("os:scheduler_hints".to_string(), hints);
        }
        let response = self
            .base
            .session()
            .post(
                &server.schema().service,
                &request.uri,
                RequestOptions::new().json(request.body),
            )
            .await?;
        let mut server = server;
        server.translate_response(&response, true)?;
        Ok(server)
    }

    pub async fn get_server(&self, server: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(SERVER, server).await
    }

    pub async fn update_server(&self, server: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update(SERVER, server, attrs).await
    }

    pub async fn delete_server(&self, server: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(SERVER, server, ignore_missing).await
    }

    pub async fn find_server(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(SERVER, name_or_id, ignore_missing, Attrs::new()).await
    }

    /// List servers; `details` lists through `/servers/detail`
    pub fn servers(&self, details: bool, query: Attrs) -> Result<ResourceStream<'_>> {
        let key = if details { SERVER_DETAIL } else { SERVER };
        self.base.list(key, true, query)
    }

    /// POST an action document to `servers/<id>/action`
    pub async fn server_action(&self, server: impl Into<ResourceRef>, body: Value) -> Result<()> {
        let server = self.base.get_resource(SERVER, server, Attrs::new())?;
        if let Some(name) = body.as_object().and_then(|b| b.keys().next()) {
            tracing::info!("Server {} action {}", server.id().unwrap_or_default(), name);
        }
        let opts = RequestOptions::new().json(body).header("Accept", "");
        self.base
            .resource_request(Method::POST, &server, &["action"], opts)
            .await?;
        Ok(())
    }

    pub async fn change_server_password(&self, server: impl Into<ResourceRef>, new_password: &str) -> Result<()> {
        self.server_action(server, json!({"changePassword": {"adminPass": new_password}}))
            .await
    }

    /// Reboot with `reboot_type` `SOFT` or `HARD`
    pub async fn reboot_server(&self, server: impl Into<ResourceRef>, reboot_type: &str) -> Result<()> {
        self.server_action(server, json!({"reboot": {"type": reboot_type}}))
            .await
    }

    pub async fn force_delete_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"forceDelete": null})).await
    }

    /// Rebuild from `image` and return the refreshed server
    pub async fn rebuild_server(
        &self,
        server: impl Into<ResourceRef>,
        name: &str,
        admin_password: &str,
        image: &str,
        options: Rebuild,
    ) -> Result<Resource> {
        let mut action = Map::new();
        action.insert("name".into(), json!(name));
        action.insert("imageRef".into(), json!(image));
        action.insert("adminPass".into(), json!(admin_password));
        if let Some(v) = options.access_ipv4 {
            action.insert("accessIPv4".into(), json!(v));
        }
        if let Some(v) = options.access_ipv6 {
            action.insert("accessIPv6".into(), json!(v));
        }
        if let Some(v) = options.metadata {
            action.insert("metadata".into(), v);
        }
        if let Some(v) = options.personality {
            action.insert("personality".into(), v);
        }
        action.insert("preserve_ephemeral".into(), json!(options.preserve_ephemeral));

        let mut server = self.base.get_resource(SERVER, server, Attrs::new())?;
        let opts = RequestOptions::new()
            .json(json!({"rebuild": action}))
            .header("Accept", "");
        let response = self
            .base
            .resource_request(Method::POST, &server, &["action"], opts)
            .await?;
        server.translate_response(&response, true)?;
        Ok(server)
    }

    pub async fn resize_server(&self, server: impl Into<ResourceRef>, flavor: impl Into<ResourceRef>) -> Result<()> {
        let flavor = flavor.into().id().unwrap_or_default();
        self.server_action(server, json!({"resize": {"flavorRef": flavor}}))
            .await
    }

    pub async fn confirm_server_resize(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"confirmResize": null})).await
    }

    pub async fn revert_server_resize(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"revertResize": null})).await
    }

    /// Snapshot a server into a new image
    pub async fn create_server_image(
        &self,
        server: impl Into<ResourceRef>,
        name: &str,
        metadata: Option<Value>,
    ) -> Result<()> {
        let mut action = Map::new();
        action.insert("name".into(), json!(name));
        if let Some(metadata) = metadata {
            action.insert("metadata".into(), metadata);
        }
        self.server_action(server, json!({"createImage": action})).await
    }

    pub async fn add_security_group_to_server(&self, server: impl Into<ResourceRef>, group: &str) -> Result<()> {
        self.server_action(server, json!({"addSecurityGroup": {"name": group}}))
            .await
    }

    pub async fn remove_security_group_from_server(&self, server: impl Into<ResourceRef>, group: &str) -> Result<()> {
        self.server_action(server, json!({"removeSecurityGroup": {"name": group}}))
            .await
    }

    pub async fn reset_server_state(&self, server: impl Into<ResourceRef>, state: &str) -> Result<()> {
        self.server_action(server, json!({"os-resetState": {"state": state}}))
            .await
    }

    pub async fn add_fixed_ip_to_server(&self, server: impl Into<ResourceRef>, network_id: &str) -> Result<()> {
        self.server_action(server, json!({"addFixedIp": {"networkId": network_id}}))
            .await
    }

    pub async fn remove_fixed_ip_from_server(&self, server: impl Into<ResourceRef>, address: &str) -> Result<()> {
        self.server_action(server, json!({"removeFixedIp": {"address": address}}))
            .await
    }

    pub async fn add_floating_ip_to_server(
        &self,
        server: impl Into<ResourceRef>,
        address: &str,
        fixed_address: Option<&str>,
    ) -> Result<()> {
        let mut action = Map::new();
        action.insert("address".into(), json!(address));
        if let Some(fixed) = fixed_address {
            action.insert("fixed_address".into(), json!(fixed));
        }
        self.server_action(server, json!({"addFloatingIp": action})).await
    }

    pub async fn remove_floating_ip_from_server(&self, server: impl Into<ResourceRef>, address: &str) -> Result<()> {
        self.server_action(server, json!({"removeFloatingIp": {"address": address}}))
            .await
    }

    pub async fn start_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"os-start": null})).await
    }

    pub async fn stop_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"os-stop": null})).await
    }

    pub async fn pause_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"pause": null})).await
    }

    pub async fn unpause_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"unpause": null})).await
    }

    pub async fn suspend_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"suspend": null})).await
    }

    pub async fn resume_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"resume": null})).await
    }

    pub async fn lock_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"lock": null})).await
    }

    pub async fn unlock_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"unlock": null})).await
    }

    pub async fn shelve_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"shelve": null})).await
    }

    pub async fn unshelve_server(&self, server: impl Into<ResourceRef>) -> Result<()> {
        self.server_action(server, json!({"unshelve": null})).await
    }

    // =========================================================================
    // Flavors
    // =========================================================================

    pub async fn create_flavor(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(FLAVOR, attrs).await
    }

    pub async fn get_flavor(&self, flavor: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(FLAVOR, flavor).await
    }

    pub async fn delete_flavor(&self, flavor: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(FLAVOR, flavor, ignore_missing).await
    }

    pub async fn find_flavor(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(FLAVOR, name_or_id, ignore_missing, Attrs::new()).await
    }

    pub fn flavors(&self, details: bool, query: Attrs) -> Result<ResourceStream<'_>> {
        let key = if details { FLAVOR_DETAIL } else { FLAVOR };
        self.base.list(key, true, query)
    }

    // =========================================================================
    // Keypairs
    // =========================================================================

    pub async fn create_keypair(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(KEYPAIR, attrs).await
    }

    pub async fn get_keypair(&self, keypair: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(KEYPAIR, keypair).await
    }

    pub async fn delete_keypair(&self, keypair: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(KEYPAIR, keypair, ignore_missing).await
    }

    pub async fn find_keypair(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(KEYPAIR, name_or_id, ignore_missing, Attrs::new()).await
    }

    /// Keypair listings are not paginated; each item is wrapped in `keypair`
    pub fn keypairs(&self) -> Result<ResourceStream<'_>> {
        self.base.list(KEYPAIR, false, Attrs::new())
    }

    // =========================================================================
    // Availability zones
    // =========================================================================

    pub fn availability_zones(&self, details: bool) -> Result<ResourceStream<'_>> {
        let key = if details {
            AVAILABILITY_ZONE_DETAIL
        } else {
            AVAILABILITY_ZONE
        };
        self.base.list(key, false, Attrs::new())
    }

    // =========================================================================
    // Waits
    // =========================================================================

    /// Wait for a server to reach `status` (`ERROR` counts as failure)
    pub async fn wait_for_server(&self, server: Resource, status: &str) -> Result<Resource> {
        self.base
            .wait_for_status(
                server,
                status,
                &["ERROR"],
                crate::proxy::WAIT_INTERVAL,
                crate::proxy::WAIT_TIMEOUT,
            )
            .await
    }
}
