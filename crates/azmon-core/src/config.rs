//! azmon.toml configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReceiverError, ReceiverResult};
use crate::targets::{ResourceGroupTarget, ResourceSpec, ResourceTarget, Targets};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub tenant_id: String,
    pub cloud: Option<CloudConfig>,
    #[serde(default, rename = "resource_target")]
    pub resource_targets: Vec<ResourceTargetConfig>,
    #[serde(default, rename = "resource_group_target")]
    pub resource_group_targets: Vec<ResourceGroupTargetConfig>,
    #[serde(default, rename = "subscription_target")]
    pub subscription_targets: Vec<ResourceConfig>,
}

/// Endpoints for sovereign clouds or local test servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub resource_manager_endpoint: Option<String>,
    pub authority_host: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTargetConfig {
    pub resource_id: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroupTargetConfig {
    pub resource_group: String,
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub resource_type: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<String>,
}

impl From<&ResourceConfig> for ResourceSpec {
    fn from(config: &ResourceConfig) -> Self {
        ResourceSpec::new(
            config.resource_type.clone(),
            config.metrics.clone(),
            config.aggregations.clone(),
        )
    }
}

impl ReceiverConfig {
    pub fn from_file(path: &Path) -> ReceiverResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReceiverError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
            .map_err(|e| ReceiverError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> ReceiverResult<Self> {
        toml::from_str(content).map_err(|e| ReceiverError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> ReceiverResult<String> {
        toml::to_string_pretty(self).map_err(|e| ReceiverError::Config(e.to_string()))
    }

    /// Client credentials are needed only by network-backed clients, so
    /// they are checked separately from the targets.
    pub fn check_credentials(&self) -> ReceiverResult<()> {
        let missing = [
            ("client ID", &self.client_id),
            ("client secret", &self.client_secret),
            ("tenant ID", &self.tenant_id),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty());

        match missing {
            Some((what, _)) => Err(ReceiverError::Validation(format!("{what} is empty or missing"))),
            None => Ok(()),
        }
    }

    pub fn targets(&self) -> Targets {
        Targets::new(
            self.resource_targets
                .iter()
                .map(|t| ResourceTarget::new(t.resource_id.clone(), t.metrics.clone(), t.aggregations.clone()))
                .collect(),
            self.resource_group_targets
                .iter()
                .map(|g| {
                    ResourceGroupTarget::new(
                        g.resource_group.clone(),
                        g.resources.iter().map(ResourceSpec::from).collect(),
                    )
                })
                .collect(),
            self.subscription_targets.iter().map(ResourceSpec::from).collect(),
        )
    }
}
