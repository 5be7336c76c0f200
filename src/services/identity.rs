//! Identity service proxy
//!
//! Projects, policies and roles, plus project role assignments for users and
//! groups (`/projects/<id>/{users,groups}/<actor>/roles/<role>`).

use crate::error::Result;
use crate::proxy::{BaseProxy, ResourceRef};
use crate::resource::{Attrs, Resource, ResourceStream};
use crate::session::RequestOptions;
use reqwest::{Method, StatusCode};

pub const PROJECT: &str = "identity.project";
pub const POLICY: &str = "identity.policy";
pub const ROLE: &str = "identity.role";
pub const USER: &str = "identity.user";
pub const GROUP: &str = "identity.group";

/// Who a project role is assigned to
#[derive(Debug, Clone)]
pub enum Actor {
    User(ResourceRef),
    Group(ResourceRef),
}

impl Actor {
    fn segment(&self) -> &'static str {
        match self {
            Actor::User(_) => "users",
            Actor::Group(_) => "groups",
        }
    }

    fn id(&self) -> Option<String> {
        match self {
            Actor::User(r) | Actor::Group(r) => r.id(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IdentityProxy {
    base: BaseProxy,
}

impl IdentityProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub async fn create_project(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(PROJECT, attrs).await
    }

    pub async fn get_project(&self, project: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(PROJECT, project).await
    }

    pub async fn update_project(&self, project: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update(PROJECT, project, attrs).await
    }

    pub async fn delete_project(&self, project: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(PROJECT, project, ignore_missing).await
    }

    pub async fn find_project(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(PROJECT, name_or_id, ignore_missing, Attrs::new()).await
    }

    pub fn projects(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(PROJECT, true, query)
    }

    /// Assign `role` to a user or group on `project`; true when the server
    /// answers 204
    pub async fn assign_project_role(&self, project: impl Into<ResourceRef>, actor: Actor, role: impl Into<ResourceRef>) -> Result<bool> {
        let response = self
            .role_request(Method::PUT, project, &actor, role.into())
            .await?;
        Ok(response.status == StatusCode::NO_CONTENT)
    }

    /// Remove a role assignment; true when the server answers 204
    pub async fn unassign_project_role(&self, project: impl Into<ResourceRef>, actor: Actor, role: impl Into<ResourceRef>) -> Result<bool> {
        let response = self
            .role_request(Method::DELETE, project, &actor, role.into())
            .await?;
        Ok(response.status == StatusCode::NO_CONTENT)
    }

    /// Whether the user or group holds `role` on `project`.
    ///
    /// Any success status means yes; a 404 means no.
    pub async fn validate_project_role(&self, project: impl Into<ResourceRef>, actor: Actor, role: impl Into<ResourceRef>) -> Result<bool> {
        match self
            .role_request(Method::HEAD, project, &actor, role.into())
            .await
        {
            Ok(response) => Ok(response.status.is_success()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn role_request(
        &self,
        method: Method,
        project: impl Into<ResourceRef>,
        actor: &Actor,
        role: ResourceRef,
    ) -> Result<crate::session::Response> {
        let project = self.base.get_resource(PROJECT, project, Attrs::new())?;
        let actor_id = actor.id().unwrap_or_default();
        let role_id = role.id().unwrap_or_default();
        tracing::debug!(
            "{} role {} for {} {} on project {}",
            method,
            role_id,
            actor.segment(),
            actor_id,
            project.id().unwrap_or_default()
        );
        self.base
            .resource_request(
                method,
                &project,
                &[actor.segment(), actor_id.as_str(), "roles", role_id.as_str()],
                RequestOptions::new(),
            )
            .await
    }

    // =========================================================================
    // Policies
    // =========================================================================

    pub async fn create_policy(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(POLICY, attrs).await
    }

    pub async fn get_policy(&self, policy: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(POLICY, policy).await
    }

    pub async fn update_policy(&self, policy: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update(POLICY, policy, attrs).await
    }

    pub async fn delete_policy(&self, policy: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(POLICY, policy, ignore_missing).await
    }

    pub fn policies(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(POLICY, true, query)
    }

    // =========================================================================
    // Roles
    // =========================================================================

    pub async fn create_role(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(ROLE, attrs).await
    }

    pub async fn get_role(&self, role: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(ROLE, role).await
    }

    pub async fn update_role(&self, role: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update(ROLE, role, attrs).await
    }

    pub async fn delete_role(&self, role: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(ROLE, role, ignore_missing).await
    }

    pub async fn find_role(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(ROLE, name_or_id, ignore_missing, Attrs::new()).await
    }

    pub fn roles(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(ROLE, true, query)
    }

    // =========================================================================
    // Users and groups (read only)
    // =========================================================================

    pub async fn find_user(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(USER, name_or_id, ignore_missing, Attrs::new()).await
    }

    pub async fn find_group(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(GROUP, name_or_id, ignore_missing, Attrs::new()).await
    }
}
