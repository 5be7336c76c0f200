//! Configuration Management
//!
//! Persistent settings for osdk, stored as YAML under the user's config
//! directory. A few `OS_*` environment variables override the file.

use crate::session::{Profile, ServiceFilter, Session};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-service settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Microversion sent in `OpenStack-API-Version`
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Polling defaults for the wait helpers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_interval() -> u64 {
    2
}

fn default_timeout() -> u64 {
    120
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Pre-issued token sent as `X-Auth-Token`
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Region applied to every service
    #[serde(default)]
    pub region: Option<String>,
    /// Interface applied to every service
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    #[serde(default)]
    pub wait: WaitConfig,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("osdk").join("config.yaml"))
    }

    /// Load configuration from disk, falling back to defaults when the file
    /// is missing or unreadable. Environment overrides are applied.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring config file: {:#}", e);
                Self::default()
            }),
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Load configuration from `path`, without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply `OS_AUTH_TOKEN`, `OS_PROJECT_ID`, `OS_REGION_NAME`, `OS_INTERFACE`
    /// and `OSDK_<SERVICE>_ENDPOINT` from `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("OS_AUTH_TOKEN") {
            self.auth_token = Some(token);
        }
        if let Some(project) = lookup("OS_PROJECT_ID") {
            self.project_id = Some(project);
        }
        if let Some(region) = lookup("OS_REGION_NAME") {
            self.region = Some(region);
        }
        if let Some(interface) = lookup("OS_INTERFACE") {
            self.interface = Some(interface);
        }

        let services: Vec<String> = Profile::default()
            .service_types()
            .map(str::to_string)
            .chain(self.services.keys().cloned())
            .collect();
        for service in services {
            if let Some(endpoint) = lookup(&endpoint_var(&service)) {
                self.services.entry(service).or_default().endpoint = Some(endpoint);
            }
        }
    }

    /// Build the service profile described by this configuration
    pub fn profile(&self) -> Result<Profile> {
        let mut profile = Profile::default();
        if let Some(region) = &self.region {
            profile.set_region(crate::session::profile::ALL, region)?;
        }
        if let Some(interface) = &self.interface {
            profile.set_interface(crate::session::profile::ALL, interface)?;
        }

        for (service, settings) in &self.services {
            if profile.filter(service).is_err() {
                let version = settings.version.as_deref().unwrap_or("v1");
                profile.add_service(ServiceFilter::new(service, version));
            }
            if let Some(version) = &settings.version {
                profile.set_version(service, version)?;
            }
            if let Some(api_version) = &settings.api_version {
                profile.set_api_version(service, api_version)?;
            }
            if let Some(interface) = &settings.interface {
                profile.set_interface(service, interface)?;
            }
            if let Some(region) = &settings.region {
                profile.set_region(service, region)?;
            }
            if let Some(endpoint) = &settings.endpoint {
                profile
                    .set_endpoint_override(service, endpoint)
                    .with_context(|| format!("Invalid endpoint for {}", service))?;
            }
        }
        Ok(profile)
    }

    /// Build a session carrying the configured token and project
    pub fn session(&self) -> Result<Session> {
        let mut session = Session::new(self.profile()?).context("Failed to create HTTP client")?;
        if let Some(token) = &self.auth_token {
            session = session.with_token(token);
        }
        if let Some(project) = &self.project_id {
            session = session.with_project(project);
        }
        Ok(session)
    }
}

/// `object-store` -> `OSDK_OBJECT_STORE_ENDPOINT`
fn endpoint_var(service: &str) -> String {
    format!("OSDK_{}_ENDPOINT", service.to_uppercase().replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let config: Config = serde_yaml::from_str(
            r#"
auth_token: tok
project_id: p1
services:
  compute:
    endpoint: https://ecs.example.com/v2/{project_id}
    api_version: "2.26"
wait:
  interval_secs: 5
"#,
        )
        .unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.wait.interval_secs, 5);
        assert_eq!(config.wait.timeout_secs, 120);
        assert_eq!(
            config.services["compute"].api_version.as_deref(),
            Some("2.26")
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            "OS_AUTH_TOKEN" => Some("env-token".to_string()),
            "OSDK_OBJECT_STORE_ENDPOINT" => Some("https://obs.example.com".to_string()),
            _ => None,
        });
        assert_eq!(config.auth_token.as_deref(), Some("env-token"));
        assert_eq!(
            config.services["object-store"].endpoint.as_deref(),
            Some("https://obs.example.com")
        );
    }

    #[test]
    fn test_session_from_config() {
        let mut config = Config {
            project_id: Some("p1".to_string()),
            ..Config::default()
        };
        config.services.insert(
            "compute".to_string(),
            ServiceConfig {
                endpoint: Some("https://ecs.example.com/v2/{project_id}".to_string()),
                ..ServiceConfig::default()
            },
        );
        let session = config.session().unwrap();
        assert_eq!(
            session.endpoint("compute").unwrap(),
            "https://ecs.example.com/v2/p1"
        );
    }

    #[test]
    fn test_endpoint_var() {
        assert_eq!(endpoint_var("volumev2"), "OSDK_VOLUMEV2_ENDPOINT");
        assert_eq!(endpoint_var("auto-scaling"), "OSDK_AUTO_SCALING_ENDPOINT");
    }
}
