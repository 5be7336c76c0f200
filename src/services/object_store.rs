//! Object storage service proxy
//!
//! Only the account level is covered: its usage headers and its custom
//! `X-Account-Meta-*` metadata.

use crate::error::Result;
use crate::proxy::BaseProxy;
use crate::resource::{Attrs, Resource};
use crate::session::profile::OBJECT_STORE;
use crate::session::RequestOptions;
use std::collections::BTreeMap;

pub const ACCOUNT: &str = "object_store.account";

const ACCOUNT_META_PREFIX: &str = "x-account-meta-";

#[derive(Clone, Debug)]
pub struct ObjectStoreProxy {
    base: BaseProxy,
}

impl ObjectStoreProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    /// HEAD the account and read its usage headers
    pub async fn get_account_metadata(&self) -> Result<Resource> {
        let account = Resource::from_key(ACCOUNT, Attrs::new())?;
        account.head(self.base.session(), false).await
    }

    /// Custom account metadata, keys without the `X-Account-Meta-` prefix
    pub async fn account_metadata(&self) -> Result<BTreeMap<String, String>> {
        let response = self
            .base
            .session()
            .head(
                OBJECT_STORE,
                "/",
                RequestOptions::new().header("Accept", ""),
            )
            .await?;
        Ok(response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                let key = name.as_str().strip_prefix(ACCOUNT_META_PREFIX)?;
                Some((key.to_string(), value.to_str().ok()?.to_string()))
            })
            .collect())
    }

    /// Set custom account metadata; existing keys not named are kept
    pub async fn set_account_metadata(&self, metadata: &BTreeMap<String, String>) -> Result<()> {
        let headers = metadata
            .iter()
            .map(|(k, v)| (format!("X-Account-Meta-{}", k), v.clone()));
        tracing::info!("Setting {} account metadata keys", metadata.len());
        self.base
            .session()
            .post(OBJECT_STORE, "/", RequestOptions::new().headers(headers))
            .await?;
        Ok(())
    }

    /// Remove custom account metadata keys
    pub async fn delete_account_metadata(&self, keys: &[&str]) -> Result<()> {
        let headers = keys
            .iter()
            .map(|k| (format!("X-Remove-Account-Meta-{}", k), "x".to_string()));
        self.base
            .session()
            .post(OBJECT_STORE, "/", RequestOptions::new().headers(headers))
            .await?;
        Ok(())
    }
}
