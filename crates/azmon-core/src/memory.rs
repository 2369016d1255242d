//! In-memory collaborators.
//!
//! Satisfy the same contracts as the network-backed clients in `azmon-arm`
//! without any I/O. Used by the test suites and for dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::{
    AzureClients, ClientFuture, GenericResource, MetricDefinition, MetricDefinitionsClient,
    MetricsClient, MetricsQuery, MetricsResponse, ResourcesClient,
};
use crate::error::ClientError;

/// Resource types named by a `resourceType eq 'T1' or resourceType eq 'T2'`
/// filter. An empty filter yields an empty list, meaning "no restriction".
pub fn filter_resource_types(filter: &str) -> Vec<String> {
    filter
        .split(" or ")
        .filter_map(|clause| {
            clause
                .trim()
                .strip_prefix("resourceType eq '")
                .and_then(|rest| rest.strip_suffix('\''))
                .map(str::to_string)
        })
        .collect()
}

/// Inventory backed by a list of `(resource group, resource)` pairs.
///
/// Resource types in a filter match without regard to ASCII case, as the
/// resource manager does.
#[derive(Debug, Default)]
pub struct InMemoryResources {
    resources: Vec<(String, GenericResource)>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to `resource_group`.
    pub fn with_resource(mut self, resource_group: &str, id: &str, resource_type: &str) -> Self {
        let name = id.rsplit('/').next().map(str::to_string);
        self.resources.push((
            resource_group.to_string(),
            GenericResource {
                id: Some(id.to_string()),
                name,
                resource_type: Some(resource_type.to_string()),
                location: None,
            },
        ));
        self
    }

    /// Add a raw resource, which may be missing fields.
    pub fn with_raw_resource(mut self, resource_group: &str, resource: GenericResource) -> Self {
        self.resources.push((resource_group.to_string(), resource));
        self
    }

    /// Make every call fail with a transport error.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn matching(&self, resource_group: Option<&str>, filter: &str) -> Result<Vec<GenericResource>, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.failure {
            return Err(ClientError::Transport(message.clone()));
        }

        let types = filter_resource_types(filter);
        Ok(self
            .resources
            .iter()
            .filter(|(group, _)| resource_group.is_none_or(|g| g == group))
            .filter(|(_, r)| {
                types.is_empty()
                    || r.resource_type
                        .as_ref()
                        .is_none_or(|t| types.iter().any(|wanted| wanted.eq_ignore_ascii_case(t)))
            })
            .map(|(_, r)| r.clone())
            .collect())
    }
}

impl ResourcesClient for InMemoryResources {
    fn list<'a>(&'a self, filter: &'a str) -> ClientFuture<'a, Vec<GenericResource>> {
        Box::pin(async move { self.matching(None, filter) })
    }

    fn list_by_resource_group<'a>(
        &'a self,
        resource_group: &'a str,
        filter: &'a str,
    ) -> ClientFuture<'a, Vec<GenericResource>> {
        Box::pin(async move { self.matching(Some(resource_group), filter) })
    }
}

/// Metric definition catalog keyed by fully-qualified resource ID.
#[derive(Debug, Default)]
pub struct InMemoryMetricDefinitions {
    definitions: HashMap<String, Vec<MetricDefinition>>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl InMemoryMetricDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(mut self, resource_id: &str, definitions: Vec<MetricDefinition>) -> Self {
        self.definitions
            .entry(resource_id.to_string())
            .or_default()
            .extend(definitions);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl MetricDefinitionsClient for InMemoryMetricDefinitions {
    fn list<'a>(&'a self, resource_id: &'a str) -> ClientFuture<'a, Vec<MetricDefinition>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if let Some(message) = &self.failure {
                return Err(ClientError::Transport(message.clone()));
            }
            Ok(self.definitions.get(resource_id).cloned().unwrap_or_default())
        })
    }
}

/// Metric values keyed by fully-qualified resource ID.
///
/// Only the metrics named in the query are returned, matched against
/// `name.value`. Every query is recorded.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    responses: HashMap<String, MetricsResponse>,
    failures: HashMap<String, String>,
    queries: Mutex<Vec<(String, MetricsQuery)>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, resource_id: &str, response: MetricsResponse) -> Self {
        self.responses.insert(resource_id.to_string(), response);
        self
    }

    /// Make calls for `resource_id` fail with a transport error.
    pub fn failing_for(mut self, resource_id: &str, message: &str) -> Self {
        self.failures.insert(resource_id.to_string(), message.to_string());
        self
    }

    /// Every `(resource_id, query)` received so far, in call order.
    pub async fn queries(&self) -> Vec<(String, MetricsQuery)> {
        self.queries.lock().await.clone()
    }
}

impl MetricsClient for InMemoryMetrics {
    fn list<'a>(
        &'a self,
        resource_id: &'a str,
        query: &'a MetricsQuery,
    ) -> ClientFuture<'a, MetricsResponse> {
        Box::pin(async move {
            self.queries
                .lock()
                .await
                .push((resource_id.to_string(), query.clone()));

            if let Some(message) = self.failures.get(resource_id) {
                return Err(ClientError::Transport(message.clone()));
            }

            let Some(response) = self.responses.get(resource_id) else {
                return Err(ClientError::Status {
                    status: 404,
                    body: format!("resource {resource_id} not found"),
                });
            };

            let mut response = response.clone();
            if !query.metric_names.is_empty() {
                response.value.retain(|metric| {
                    metric
                        .name
                        .as_ref()
                        .and_then(|n| n.value.as_ref())
                        .is_none_or(|name| query.metric_names.iter().any(|m| m == name))
                });
            }
            Ok(response)
        })
    }
}

/// Bundle in-memory collaborators, keeping handles for assertions.
pub fn in_memory_clients(
    resources: InMemoryResources,
    definitions: InMemoryMetricDefinitions,
    metrics: InMemoryMetrics,
) -> (AzureClients, InMemoryHandles) {
    let handles = InMemoryHandles {
        resources: Arc::new(resources),
        definitions: Arc::new(definitions),
        metrics: Arc::new(metrics),
    };
    let clients = AzureClients::new(
        handles.resources.clone(),
        handles.definitions.clone(),
        handles.metrics.clone(),
    );
    (clients, handles)
}

/// Shared handles to the collaborators inside an [`AzureClients`] bundle.
#[derive(Debug, Clone)]
pub struct InMemoryHandles {
    pub resources: Arc<InMemoryResources>,
    pub definitions: Arc<InMemoryMetricDefinitions>,
    pub metrics: Arc<InMemoryMetrics>,
}
