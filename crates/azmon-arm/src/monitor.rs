//! Azure Monitor metric definitions and metric values
//! (`Microsoft.Insights`).

use std::sync::Arc;

use azmon_core::api::{
    ClientFuture, MetricDefinition, MetricDefinitionPage, MetricDefinitionsClient, MetricsClient, MetricsQuery,
    MetricsResponse,
};

use crate::client::ArmClient;
use crate::options::MONITOR_API_VERSION;

#[derive(Debug, Clone)]
pub struct ArmMetricDefinitionsClient {
    client: Arc<ArmClient>,
}

impl ArmMetricDefinitionsClient {
    pub fn new(client: Arc<ArmClient>) -> Self {
        Self { client }
    }
}

impl MetricDefinitionsClient for ArmMetricDefinitionsClient {
    fn list<'a>(&'a self, resource_id: &'a str) -> ClientFuture<'a, Vec<MetricDefinition>> {
        Box::pin(async move {
            let path = format!("{resource_id}/providers/Microsoft.Insights/metricDefinitions");
            let url = self.client.url(&path, &[("api-version", MONITOR_API_VERSION)])?;
            self.client.get_all_pages::<MetricDefinitionPage>(url).await
        })
    }
}

#[derive(Debug, Clone)]
pub struct ArmMetricsClient {
    client: Arc<ArmClient>,
}

impl ArmMetricsClient {
    pub fn new(client: Arc<ArmClient>) -> Self {
        Self { client }
    }
}

impl MetricsClient for ArmMetricsClient {
    fn list<'a>(&'a self, resource_id: &'a str, query: &'a MetricsQuery) -> ClientFuture<'a, MetricsResponse> {
        Box::pin(async move {
            let path = format!("{resource_id}/providers/Microsoft.Insights/metrics");
            let metric_names = query.metric_names_param();
            let aggregations = query.aggregations_param();

            let mut params = vec![("api-version", MONITOR_API_VERSION)];
            if !metric_names.is_empty() {
                params.push(("metricnames", metric_names.as_str()));
            }
            if !aggregations.is_empty() {
                params.push(("aggregation", aggregations.as_str()));
            }

            let url = self.client.url(&path, &params)?;
            self.client.get_json(url).await
        })
    }
}
