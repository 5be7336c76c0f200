//! Network service proxy

use crate::error::Result;
use crate::proxy::{BaseProxy, ResourceRef};
use crate::resource::{Attrs, Resource, ResourceStream};
use crate::session::RequestOptions;
use reqwest::Method;
use serde_json::{json, Value};

pub const NETWORK: &str = "network.network";
pub const SUBNET: &str = "network.subnet";
pub const PORT: &str = "network.port";
pub const ROUTER: &str = "network.router";
pub const FLOATING_IP: &str = "network.floating_ip";
pub const SECURITY_GROUP: &str = "network.security_group";
pub const QOS_POLICY: &str = "network.qos_policy";
pub const QUOTA: &str = "network.quota";
pub const QUOTA_DEFAULT: &str = "network.quota_default";

/// What to attach to or detach from a router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterInterface {
    Subnet(String),
    Port(String),
}

impl RouterInterface {
    fn body(&self) -> Value {
        match self {
            RouterInterface::Subnet(id) => json!({"subnet_id": id}),
            RouterInterface::Port(id) => json!({"port_id": id}),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NetworkProxy {
    base: BaseProxy,
}

macro_rules! crud {
    ($key:ident, $create:ident, $get:ident, $update:ident, $delete:ident, $find:ident, $list:ident) => {
        pub async fn $create(&self, attrs: Attrs) -> Result<Resource> {
            self.base.create($key, attrs).await
        }

        pub async fn $get(&self, value: impl Into<ResourceRef>) -> Result<Resource> {
            self.base.get($key, value).await
        }

        pub async fn $update(&self, value: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
            self.base.update($key, value, attrs).await
        }

        pub async fn $delete(&self, value: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
            self.base.delete($key, value, ignore_missing).await
        }

        pub async fn $find(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
            self.base.find($key, name_or_id, ignore_missing, Attrs::new()).await
        }

        pub fn $list(&self, query: Attrs) -> Result<ResourceStream<'_>> {
            self.base.list($key, true, query)
        }
    };
}

impl NetworkProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    crud!(NETWORK, create_network, get_network, update_network, delete_network, find_network, networks);
    crud!(SUBNET, create_subnet, get_subnet, update_subnet, delete_subnet, find_subnet, subnets);
    crud!(PORT, create_port, get_port, update_port, delete_port, find_port, ports);
    crud!(ROUTER, create_router, get_router, update_router, delete_router, find_router, routers);
    crud!(FLOATING_IP, create_ip, get_ip, update_ip, delete_ip, find_ip, ips);
    crud!(
        SECURITY_GROUP,
        create_security_group,
        get_security_group,
        update_security_group,
        delete_security_group,
        find_security_group,
        security_groups
    );
    crud!(
        QOS_POLICY,
        create_qos_policy,
        get_qos_policy,
        update_qos_policy,
        delete_qos_policy,
        find_qos_policy,
        qos_policies
    );

    /// Attach a subnet or port; returns the interface document
    pub async fn add_interface_to_router(&self, router: impl Into<ResourceRef>, interface: RouterInterface) -> Result<Value> {
        self.router_interface(router, "add_router_interface", interface)
            .await
    }

    pub async fn remove_interface_from_router(&self, router: impl Into<ResourceRef>, interface: RouterInterface) -> Result<Value> {
        self.router_interface(router, "remove_router_interface", interface)
            .await
    }

    async fn router_interface(&self, router: impl Into<ResourceRef>, action: &str, interface: RouterInterface) -> Result<Value> {
        let router = self.base.get_resource(ROUTER, router, Attrs::new())?;
        tracing::info!("Router {} {} {:?}", router.id().unwrap_or_default(), action, interface);
        let opts = RequestOptions::new().json(interface.body());
        let response = self
            .base
            .resource_request(Method::PUT, &router, &[action], opts)
            .await?;
        response.json()
    }

    // =========================================================================
    // Quotas
    // =========================================================================

    /// Quota of a project, keyed by project id
    pub async fn get_quota(&self, project: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(QUOTA, project).await
    }

    /// Default quota applied to new projects
    pub async fn get_quota_default(&self, project: &str) -> Result<Resource> {
        let attrs = crate::resource::attrs(json!({"project": project}));
        let res = self.base.get_resource(QUOTA_DEFAULT, project, attrs)?;
        res.get(self.base.session(), false).await
    }

    pub async fn update_quota(&self, project: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update(QUOTA, project, attrs).await
    }

    /// Reset a project's quota to the defaults
    pub async fn delete_quota(&self, project: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(QUOTA, project, ignore_missing).await
    }

    pub fn quotas(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(QUOTA, false, query)
    }
}
