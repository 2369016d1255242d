//! Endpoints and timeouts shared by every ARM client.

use std::time::Duration;

use azmon_core::config::CloudConfig;

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// api-version of the resource inventory.
pub const RESOURCES_API_VERSION: &str = "2021-04-01";
/// api-version of metric definitions and metrics.
pub const MONITOR_API_VERSION: &str = "2018-01-01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub resource_manager_endpoint: String,
    pub authority_host: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            resource_manager_endpoint: DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientOptions {
    /// Defaults overridden by whatever `cloud` sets.
    pub fn from_cloud(cloud: Option<&CloudConfig>) -> Self {
        let mut options = Self::default();
        let Some(cloud) = cloud else {
            return options;
        };
        if let Some(endpoint) = &cloud.resource_manager_endpoint {
            options.resource_manager_endpoint = endpoint.clone();
        }
        if let Some(host) = &cloud.authority_host {
            options.authority_host = host.clone();
        }
        if let Some(secs) = cloud.timeout_secs {
            options.timeout = Duration::from_secs(secs);
        }
        options
    }

    /// Point both endpoints at one local server.
    pub fn local(base_url: &str) -> Self {
        Self {
            resource_manager_endpoint: base_url.to_string(),
            authority_host: base_url.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    /// OAuth2 scope for the resource manager.
    pub fn scope(&self) -> String {
        format!("{}/.default", self.resource_manager_endpoint.trim_end_matches('/'))
    }
}
