//! Block storage service proxy

use crate::error::Result;
use crate::proxy::{BaseProxy, ResourceRef};
use crate::resource::{Attrs, Resource, ResourceStream};
use crate::session::RequestOptions;
use reqwest::Method;
use serde_json::json;

pub const VOLUME: &str = "block_store.volume";
pub const VOLUME_DETAIL: &str = "block_store.volume_detail";
pub const SNAPSHOT: &str = "block_store.snapshot";
pub const SNAPSHOT_DETAIL: &str = "block_store.snapshot_detail";
pub const TYPE: &str = "block_store.type";
pub const AVAILABILITY_ZONE: &str = "block_store.availability_zone";

#[derive(Clone, Debug)]
pub struct BlockStoreProxy {
    base: BaseProxy,
}

impl BlockStoreProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    pub async fn create_volume(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(VOLUME, attrs).await
    }

    pub async fn get_volume(&self, volume: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(VOLUME, volume).await
    }

    pub async fn delete_volume(&self, volume: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(VOLUME, volume, ignore_missing).await
    }

    pub fn volumes(&self, details: bool, query: Attrs) -> Result<ResourceStream<'_>> {
        let key = if details { VOLUME_DETAIL } else { VOLUME };
        self.base.list(key, true, query)
    }

    /// Grow a volume to `size` GiB
    pub async fn extend_volume(&self, volume: impl Into<ResourceRef>, size: u64) -> Result<()> {
        let volume = self.base.get_resource(VOLUME, volume, Attrs::new())?;
        tracing::info!("Extending volume {} to {} GiB", volume.id().unwrap_or_default(), size);
        let opts = RequestOptions::new()
            .json(json!({"os-extend": {"new_size": size}}))
            .header("Accept", "");
        self.base
            .resource_request(Method::POST, &volume, &["action"], opts)
            .await?;
        Ok(())
    }

    pub async fn create_snapshot(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(SNAPSHOT, attrs).await
    }

    pub async fn get_snapshot(&self, snapshot: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(SNAPSHOT, snapshot).await
    }

    pub async fn update_snapshot(&self, snapshot: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update(SNAPSHOT, snapshot, attrs).await
    }

    pub async fn delete_snapshot(&self, snapshot: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(SNAPSHOT, snapshot, ignore_missing).await
    }

    /// Snapshots are paged by `offset` rather than by marker
    pub fn snapshots(&self, details: bool, query: Attrs) -> Result<ResourceStream<'_>> {
        let key = if details { SNAPSHOT_DETAIL } else { SNAPSHOT };
        Resource::list_by_offset(self.base.session(), self.base.schema(key)?, true, query)
    }

    pub async fn create_type(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create(TYPE, attrs).await
    }

    pub async fn get_type(&self, volume_type: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(TYPE, volume_type).await
    }

    pub async fn delete_type(&self, volume_type: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(TYPE, volume_type, ignore_missing).await
    }

    pub fn types(&self) -> Result<ResourceStream<'_>> {
        self.base.list(TYPE, false, Attrs::new())
    }

    pub fn availability_zones(&self) -> Result<ResourceStream<'_>> {
        self.base.list(AVAILABILITY_ZONE, false, Attrs::new())
    }

    /// Wait for a volume to reach `status` (`error` counts as failure)
    pub async fn wait_for_volume(&self, volume: Resource, status: &str) -> Result<Resource> {
        self.base
            .wait_for_status(
                volume,
                status,
                &["error"],
                crate::proxy::WAIT_INTERVAL,
                crate::proxy::WAIT_TIMEOUT,
            )
            .await
    }
}
