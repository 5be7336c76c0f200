//! Polling helpers
//!
//! Both helpers re-fetch the resource at a fixed interval until the condition
//! holds or `wait` has elapsed. There is no backoff.

use super::base::Resource;
use crate::error::{Error, Result};
use crate::session::Session;
use std::time::Duration;

/// Poll until the resource reports `status`.
///
/// Returns at once, without a request, when the status already matches.
/// Fails with `ResourceFailure` as soon as a poll observes one of `failures`,
/// and with `ResourceTimeout` after `wait`.
pub async fn wait_for_status(
    session: &Session,
    mut resource: Resource,
    status: &str,
    failures: &[&str],
    interval: Duration,
    wait: Duration,
) -> Result<Resource> {
    if resource.schema().attr("status").is_none() {
        return Err(Error::InvalidRequest(format!(
            "{} has no status attribute",
            resource.schema().type_name
        )));
    }
    if resource.status().as_deref() == Some(status) {
        return Ok(resource);
    }
    check_interval(interval)?;

    let mut total_sleep = Duration::ZERO;
    while total_sleep < wait {
        resource = resource.get(session, true).await?;
        let current = resource.status();
        if current.as_deref() == Some(status) {
            return Ok(resource);
        }
        if let Some(failed) = current.as_deref().filter(|s| failures.contains(s)) {
            return Err(Error::ResourceFailure(format!(
                "Resource {} transitioned to failure state {}",
                display_id(&resource),
                failed
            )));
        }
        tracing::debug!(
            "Waiting for {} to reach {} (currently {:?})",
            display_id(&resource),
            status,
            current
        );
        tokio::time::sleep(interval).await;
        total_sleep += interval;
    }

    Err(Error::ResourceTimeout(format!(
        "Timeout waiting for {} to transition to {}",
        display_id(&resource),
        status
    )))
}

/// Poll until fetching the resource reports not-found
pub async fn wait_for_delete(
    session: &Session,
    mut resource: Resource,
    interval: Duration,
    wait: Duration,
) -> Result<Resource> {
    check_interval(interval)?;

    let mut total_sleep = Duration::ZERO;
    while total_sleep < wait {
        match resource.clone().get(session, true).await {
            Ok(refreshed) => resource = refreshed,
            Err(e) if e.is_not_found() => return Ok(resource),
            Err(e) => return Err(e),
        }
        tokio::time::sleep(interval).await;
        total_sleep += interval;
    }

    Err(Error::ResourceTimeout(format!(
        "Timeout waiting for {} delete",
        display_id(&resource)
    )))
}

fn check_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(Error::InvalidRequest(
            "wait interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn display_id(resource: &Resource) -> String {
    resource.id().unwrap_or_else(|| "<unknown>".to_string())
}
