//! Target model shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// A request to collect metrics for exactly one resource.
///
/// `resource_id` becomes fully qualified (`/subscriptions/{id}/...`) when the
/// receiver is constructed. The normalizer fills and splits `metrics` and
/// `aggregations` in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTarget {
    pub resource_id: String,
    pub metrics: Vec<String>,
    pub aggregations: Vec<String>,
}

impl ResourceTarget {
    pub fn new(
        resource_id: impl Into<String>,
        metrics: Vec<String>,
        aggregations: Vec<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            metrics,
            aggregations,
        }
    }
}

/// Metrics and aggregations to collect for every resource of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub resource_type: String,
    pub metrics: Vec<String>,
    pub aggregations: Vec<String>,
}

impl ResourceSpec {
    pub fn new(
        resource_type: impl Into<String>,
        metrics: Vec<String>,
        aggregations: Vec<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            metrics,
            aggregations,
        }
    }
}

/// Resources of the given types inside one resource group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupTarget {
    pub resource_group: String,
    pub resources: Vec<ResourceSpec>,
}

impl ResourceGroupTarget {
    pub fn new(resource_group: impl Into<String>, resources: Vec<ResourceSpec>) -> Self {
        Self {
            resource_group: resource_group.into(),
            resources,
        }
    }
}

/// All targets of one collection cycle.
///
/// Resource targets grow during expansion and splitting and are never
/// removed. Resource group and subscription targets are read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    pub resource_targets: Vec<ResourceTarget>,
    resource_group_targets: Vec<ResourceGroupTarget>,
    subscription_targets: Vec<ResourceSpec>,
}

impl Targets {
    pub fn new(
        resource_targets: Vec<ResourceTarget>,
        resource_group_targets: Vec<ResourceGroupTarget>,
        subscription_targets: Vec<ResourceSpec>,
    ) -> Self {
        Self {
            resource_targets,
            resource_group_targets,
            subscription_targets,
        }
    }

    pub fn resource_group_targets(&self) -> &[ResourceGroupTarget] {
        &self.resource_group_targets
    }

    pub fn subscription_targets(&self) -> &[ResourceSpec] {
        &self.subscription_targets
    }

    pub fn is_empty(&self) -> bool {
        self.resource_targets.is_empty()
            && self.resource_group_targets.is_empty()
            && self.subscription_targets.is_empty()
    }
}

/// Identifiers parsed out of a fully-qualified resource ID.
///
/// `/subscriptions/{sub}/resourceGroups/{group}/providers/{ns}/{type}/{name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdParts {
    pub subscription_id: String,
    pub resource_group: String,
    pub resource_name: String,
}

impl ResourceIdParts {
    pub fn parse(resource_id: &str) -> Option<Self> {
        let segments: Vec<&str> = resource_id
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let value_after = |key: &str| {
            segments
                .iter()
                .position(|s| s.eq_ignore_ascii_case(key))
                .and_then(|i| segments.get(i + 1))
                .map(|s| s.to_string())
        };

        let subscription_id = value_after("subscriptions")?;
        let resource_group = value_after("resourceGroups")?;
        let providers = segments
            .iter()
            .position(|s| s.eq_ignore_ascii_case("providers"))?;
        // providers / namespace / type / name [/ child type / child name ...]
        if segments.len() < providers + 4 {
            return None;
        }
        let resource_name = segments.last()?.to_string();

        Some(Self {
            subscription_id,
            resource_group,
            resource_name,
        })
    }
}
