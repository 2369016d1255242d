//! Collaborator interfaces and the wire types they exchange.
//!
//! The receiver never talks to the network directly. It calls three
//! services through the traits below: the resource inventory, the metric
//! definition catalog and the metric values endpoint. `azmon-arm` provides
//! the network-backed implementations and [`crate::memory`] the in-memory
//! ones used by tests.
//!
//! Every field of the wire types is optional so that a missing value is
//! reported by the receiver as a decode error instead of failing inside
//! deserialization with a less specific message.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

/// Path segment between a resource ID and a metric name.
pub const METRICS_PATH: &str = "/providers/Microsoft.Insights/metrics/";

/// Boxed future returned by every collaborator call.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = ClientResult<T>> + Send + 'a>>;

/// Resource inventory. Pagination is drained before the future resolves.
pub trait ResourcesClient: Send + Sync {
    /// List the resources of the whole subscription matching `filter`.
    fn list<'a>(&'a self, filter: &'a str) -> ClientFuture<'a, Vec<GenericResource>>;

    /// List the resources of one resource group matching `filter`.
    fn list_by_resource_group<'a>(
        &'a self,
        resource_group: &'a str,
        filter: &'a str,
    ) -> ClientFuture<'a, Vec<GenericResource>>;
}

/// Per-resource metric definition catalog.
pub trait MetricDefinitionsClient: Send + Sync {
    fn list<'a>(&'a self, resource_id: &'a str) -> ClientFuture<'a, Vec<MetricDefinition>>;
}

/// Metric values for one resource.
pub trait MetricsClient: Send + Sync {
    fn list<'a>(
        &'a self,
        resource_id: &'a str,
        query: &'a MetricsQuery,
    ) -> ClientFuture<'a, MetricsResponse>;
}

/// The three collaborators a receiver needs.
#[derive(Clone)]
pub struct AzureClients {
    pub resources: Arc<dyn ResourcesClient>,
    pub metric_definitions: Arc<dyn MetricDefinitionsClient>,
    pub metrics: Arc<dyn MetricsClient>,
}

impl AzureClients {
    pub fn new(
        resources: Arc<dyn ResourcesClient>,
        metric_definitions: Arc<dyn MetricDefinitionsClient>,
        metrics: Arc<dyn MetricsClient>,
    ) -> Self {
        Self {
            resources,
            metric_definitions,
            metrics,
        }
    }
}

impl std::fmt::Debug for AzureClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureClients").finish_non_exhaustive()
    }
}

/// Selection passed to [`MetricsClient::list`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsQuery {
    pub metric_names: Vec<String>,
    pub aggregations: Vec<String>,
}

impl MetricsQuery {
    /// Metric names joined by commas, as the `metricnames` parameter expects.
    pub fn metric_names_param(&self) -> String {
        self.metric_names.join(",")
    }

    pub fn aggregations_param(&self) -> String {
        self.aggregations.join(",")
    }
}

// ── Inventory ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericResource {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub location: Option<String>,
}

/// One page of an inventory listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceListPage {
    #[serde(default)]
    pub value: Vec<GenericResource>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

// ── Metric definitions ─────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizableString {
    pub value: Option<String>,
    pub localized_value: Option<String>,
}

impl LocalizableString {
    pub fn new(value: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            localized_value: Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAvailability {
    pub time_grain: Option<String>,
    pub retention: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub name: Option<LocalizableString>,
    pub unit: Option<String>,
    #[serde(default)]
    pub metric_availabilities: Vec<MetricAvailability>,
}

impl MetricDefinition {
    /// Definition with a name and a single minimum time grain.
    pub fn new(name: &str, min_time_grain: &str) -> Self {
        Self {
            name: Some(LocalizableString::new(name)),
            unit: None,
            metric_availabilities: vec![MetricAvailability {
                time_grain: Some(min_time_grain.to_string()),
                retention: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricDefinitionPage {
    #[serde(default)]
    pub value: Vec<MetricDefinition>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

// ── Metric values ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub value: Vec<Metric>,
    pub namespace: Option<String>,
    #[serde(rename = "resourceregion")]
    pub resource_region: Option<String>,
    pub timespan: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub name: Option<LocalizableString>,
    pub unit: Option<String>,
    pub timeseries: Option<Vec<TimeSeriesElement>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesElement {
    pub data: Option<Vec<MetricValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub time_stamp: Option<String>,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub total: Option<f64>,
    pub count: Option<f64>,
}
