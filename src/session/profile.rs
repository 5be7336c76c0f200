//! Per-service preferences
//!
//! A [`Profile`] holds one [`ServiceFilter`] per service type. The session
//! consults it to find the endpoint, interface and microversion for a call.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Wildcard accepted by the profile setters to address every service
pub const ALL: &str = "*";

pub const COMPUTE: &str = "compute";
pub const NETWORK: &str = "network";
pub const BLOCK_STORE: &str = "volumev2";
pub const IMAGE: &str = "image";
pub const IDENTITY: &str = "identity";
pub const OBJECT_STORE: &str = "object-store";
pub const ORCHESTRATION: &str = "orchestration";
pub const AUTO_SCALING: &str = "auto-scaling";
pub const MESSAGING: &str = "messaging";

/// Endpoint preferences for one service type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFilter {
    pub service_type: String,
    pub version: String,
    pub region: Option<String>,
    pub interface: String,
    pub service_name: Option<String>,
    /// Base URL used for every call; `{project_id}` is substituted
    pub endpoint_override: Option<String>,
    /// Microversion sent with each request
    pub api_version: Option<String>,
}

impl ServiceFilter {
    pub fn new(service_type: &str, version: &str) -> Self {
        Self {
            service_type: service_type.to_string(),
            version: version.to_string(),
            region: None,
            interface: "public".to_string(),
            service_name: None,
            endpoint_override: None,
            api_version: None,
        }
    }

    /// Microversion headers for this service, if an api version is pinned
    pub fn microversion_headers(&self) -> Vec<(String, String)> {
        let Some(version) = self.api_version.as_deref() else {
            return Vec::new();
        };
        let mut headers = vec![(
            "OpenStack-API-Version".to_string(),
            format!("{} {}", self.service_type, version),
        )];
        if self.service_type == COMPUTE {
            headers.push(("X-OpenStack-Nova-API-Version".to_string(), version.to_string()));
        }
        headers
    }
}

/// Service preferences for a whole connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    services: BTreeMap<String, ServiceFilter>,
}

impl Default for Profile {
    fn default() -> Self {
        let services = [
            (COMPUTE, "v2"),
            (NETWORK, "v2.0"),
            (BLOCK_STORE, "v2"),
            (IMAGE, "v2"),
            (IDENTITY, "v3"),
            (OBJECT_STORE, "v1"),
            (ORCHESTRATION, "v1"),
            (AUTO_SCALING, "v1"),
            (MESSAGING, "v2"),
        ]
        .into_iter()
        .map(|(ty, version)| (ty.to_string(), ServiceFilter::new(ty, version)))
        .collect();

        Self { services }
    }
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_types(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn filter(&self, service_type: &str) -> Result<&ServiceFilter> {
        self.services
            .get(service_type)
            .ok_or_else(|| Error::EndpointNotFound(format!("unknown service `{}`", service_type)))
    }

    /// Register a service that is not part of the default set
    pub fn add_service(&mut self, filter: ServiceFilter) {
        self.services.insert(filter.service_type.clone(), filter);
    }

    pub fn set_region(&mut self, service: &str, region: &str) -> Result<()> {
        self.each_mut(service, |f| f.region = Some(region.to_string()))
    }

    pub fn set_interface(&mut self, service: &str, interface: &str) -> Result<()> {
        self.each_mut(service, |f| f.interface = interface.to_string())
    }

    pub fn set_version(&mut self, service: &str, version: &str) -> Result<()> {
        self.each_mut(service, |f| f.version = version.to_string())
    }

    pub fn set_api_version(&mut self, service: &str, api_version: &str) -> Result<()> {
        self.each_mut(service, |f| f.api_version = Some(api_version.to_string()))
    }

    pub fn set_name(&mut self, service: &str, name: &str) -> Result<()> {
        self.each_mut(service, |f| f.service_name = Some(name.to_string()))
    }

    /// Pin the base URL for one service. The wildcard is not accepted here.
    pub fn set_endpoint_override(&mut self, service: &str, endpoint: &str) -> Result<()> {
        let probe = endpoint.replace("{project_id}", "project");
        url::Url::parse(&probe).map_err(|e| {
            Error::InvalidRequest(format!("invalid endpoint `{}`: {}", endpoint, e))
        })?;

        let filter = self
            .services
            .get_mut(service)
            .ok_or_else(|| Error::EndpointNotFound(format!("unknown service `{}`", service)))?;
        filter.endpoint_override = Some(endpoint.trim_end_matches('/').to_string());
        Ok(())
    }

    fn each_mut(&mut self, service: &str, mut apply: impl FnMut(&mut ServiceFilter)) -> Result<()> {
        if service == ALL {
            self.services.values_mut().for_each(apply);
            return Ok(());
        }
        let filter = self
            .services
            .get_mut(service)
            .ok_or_else(|| Error::EndpointNotFound(format!("unknown service `{}`", service)))?;
        apply(filter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_services() {
        let profile = Profile::default();
        assert_eq!(profile.filter(NETWORK).unwrap().version, "v2.0");
        assert_eq!(profile.filter(IDENTITY).unwrap().version, "v3");
        assert_eq!(profile.service_types().count(), 9);
    }

    #[test]
    fn test_wildcard_region() {
        let mut profile = Profile::default();
        profile.set_region(ALL, "eu-west-0").unwrap();
        assert!(profile
            .service_types()
            .all(|ty| profile.filter(ty).unwrap().region.as_deref() == Some("eu-west-0")));
    }

    #[test]
    fn test_unknown_service() {
        let mut profile = Profile::default();
        let err = profile.set_interface("database", "admin").unwrap_err();
        assert!(matches!(err, Error::EndpointNotFound(_)));
    }

    #[test]
    fn test_endpoint_override_validated() {
        let mut profile = Profile::default();
        assert!(profile.set_endpoint_override(COMPUTE, "not a url").is_err());
        profile
            .set_endpoint_override(COMPUTE, "https://ecs.example.com/v2/{project_id}/")
            .unwrap();
        assert_eq!(
            profile.filter(COMPUTE).unwrap().endpoint_override.as_deref(),
            Some("https://ecs.example.com/v2/{project_id}")
        );
    }

    #[test]
    fn test_compute_microversion_headers() {
        let mut filter = ServiceFilter::new(COMPUTE, "v2");
        assert!(filter.microversion_headers().is_empty());
        filter.api_version = Some("2.26".into());
        let headers = filter.microversion_headers();
        assert_eq!(headers[0].1, "compute 2.26");
        assert_eq!(headers[1].0, "X-OpenStack-Nova-API-Version");
    }
}
