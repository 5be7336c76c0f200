//! osdk - client SDK for OpenStack-compatible clouds
//!
//! Resource types are declared as data (see [`resource`]); the generic
//! [`Resource`] value does the CRUD, listing and waiting for all of them.
//! Per-service proxies in [`services`] add typed entry points and custom
//! actions on top.
//!
//! ```ignore
//! use futures::TryStreamExt;
//!
//! let conn = osdk::Connection::new(session);
//! let servers: Vec<_> = conn.compute.servers(true, Default::default())?.try_collect().await?;
//! ```

pub mod config;
pub mod error;
pub mod proxy;
pub mod resource;
pub mod services;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
pub use proxy::{BaseProxy, ResourceRef};
pub use resource::Resource;
pub use session::{Profile, Session};

use services::*;

/// One proxy per service, sharing a session
#[derive(Clone, Debug)]
pub struct Connection {
    pub session: Session,
    pub compute: ComputeProxy,
    pub network: NetworkProxy,
    pub block_store: BlockStoreProxy,
    pub image: ImageProxy,
    pub identity: IdentityProxy,
    pub object_store: ObjectStoreProxy,
    pub orchestration: OrchestrationProxy,
    pub auto_scaling: AutoScalingProxy,
    pub message: MessageProxy,
}

impl Connection {
    pub fn new(session: Session) -> Self {
        let base = BaseProxy::new(session.clone());
        Self {
            compute: ComputeProxy::new(base.clone()),
            network: NetworkProxy::new(base.clone()),
            block_store: BlockStoreProxy::new(base.clone()),
            image: ImageProxy::new(base.clone()),
            identity: IdentityProxy::new(base.clone()),
            object_store: ObjectStoreProxy::new(base.clone()),
            orchestration: OrchestrationProxy::new(base.clone()),
            auto_scaling: AutoScalingProxy::new(base.clone()),
            message: MessageProxy::new(base),
            session,
        }
    }

    /// Generic operations on any registered resource type
    pub fn proxy(&self) -> BaseProxy {
        BaseProxy::new(self.session.clone())
    }
}
