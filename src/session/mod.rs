//! Transport session
//!
//! A [`Session`] combines the HTTP client with the service [`Profile`] and the
//! pre-issued auth token. Resources only ever talk to the cloud through it.

pub mod http;
pub mod profile;

pub use http::{HttpClient, RequestOptions, Response};
pub use profile::{Profile, ServiceFilter};

use crate::error::{Error, Result};
use crate::utils::urljoin;
use reqwest::Method;

#[derive(Clone, Debug)]
pub struct Session {
    pub http: HttpClient,
    pub profile: Profile,
    auth_token: Option<String>,
    project_id: Option<String>,
}

impl Session {
    pub fn new(profile: Profile) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            profile,
            auth_token: None,
            project_id: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Base URL for a service, with `{project_id}` substituted
    pub fn endpoint(&self, service_type: &str) -> Result<String> {
        let filter = self.profile.filter(service_type)?;
        let endpoint = filter.endpoint_override.as_deref().ok_or_else(|| {
            Error::EndpointNotFound(format!("no endpoint configured for `{}`", service_type))
        })?;

        if endpoint.contains("{project_id}") {
            let project = self.project_id.as_deref().ok_or_else(|| {
                Error::EndpointNotFound(format!(
                    "endpoint for `{}` needs a project id",
                    service_type
                ))
            })?;
            return Ok(endpoint.replace("{project_id}", project));
        }
        Ok(endpoint.to_string())
    }

    /// Resolve `uri` against the service endpoint. Absolute URLs pass through.
    pub fn url_for(&self, service_type: &str, uri: &str) -> Result<String> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(uri.to_string());
        }
        let endpoint = self.endpoint(service_type)?;
        if uri.trim_matches('/').is_empty() {
            return Ok(endpoint);
        }
        Ok(urljoin(&[endpoint.as_str(), uri]))
    }

    pub async fn request(
        &self,
        method: Method,
        service_type: &str,
        uri: &str,
        opts: RequestOptions,
    ) -> Result<Response> {
        let url = self.url_for(service_type, uri)?;
        let filter = self.profile.filter(service_type)?;

        let mut opts = opts.headers(filter.microversion_headers());
        if let Some(token) = &self.auth_token {
            opts = opts.default_header("X-Auth-Token", token);
        }
        if opts.json.is_some() && opts.data.is_none() {
            opts = opts.default_header("Content-Type", "application/json");
        }

        self.http.send(method, &url, opts).await
    }

    pub async fn get(&self, service_type: &str, uri: &str, opts: RequestOptions) -> Result<Response> {
        self.request(Method::GET, service_type, uri, opts).await
    }

    pub async fn post(&self, service_type: &str, uri: &str, opts: RequestOptions) -> Result<Response> {
        self.request(Method::POST, service_type, uri, opts).await
    }

    pub async fn put(&self, service_type: &str, uri: &str, opts: RequestOptions) -> Result<Response> {
        self.request(Method::PUT, service_type, uri, opts).await
    }

    pub async fn patch(&self, service_type: &str, uri: &str, opts: RequestOptions) -> Result<Response> {
        self.request(Method::PATCH, service_type, uri, opts).await
    }

    pub async fn delete(&self, service_type: &str, uri: &str, opts: RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, service_type, uri, opts).await
    }

    pub async fn head(&self, service_type: &str, uri: &str, opts: RequestOptions) -> Result<Response> {
        self.request(Method::HEAD, service_type, uri, opts).await
    }
}
