//! Per-service proxies
//!
//! Each proxy wraps a [`BaseProxy`](crate::proxy::BaseProxy) and adds the
//! typed entry points and custom actions of one service.

pub mod auto_scaling;
pub mod block_store;
pub mod compute;
pub mod identity;
pub mod image;
pub mod message;
pub mod network;
pub mod object_store;
pub mod orchestration;

pub use auto_scaling::AutoScalingProxy;
pub use block_store::BlockStoreProxy;
pub use compute::ComputeProxy;
pub use identity::IdentityProxy;
pub use image::ImageProxy;
pub use message::MessageProxy;
pub use network::NetworkProxy;
pub use object_store::ObjectStoreProxy;
pub use orchestration::OrchestrationProxy;
