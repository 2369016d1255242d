//! Metric collection: one metrics-list call per resource target, decoded
//! into flat [`MetricRecord`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::aggregation::Aggregation;
use crate::api::{Metric, MetricValue, MetricsClient, MetricsQuery, MetricsResponse, METRICS_PATH};
use crate::error::{ReceiverError, ReceiverResult};
use crate::record::{fields, tags, FieldValue, MetricRecord, METRIC_NAME_PREFIX};
use crate::targets::{ResourceIdParts, ResourceTarget};

/// Records and uncollected metric IDs for one resource target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetMetrics {
    pub records: Vec<MetricRecord>,
    /// `{resource_id}/providers/Microsoft.Insights/metrics/{metric}` for
    /// every metric with no usable data point.
    pub uncollected: Vec<String>,
}

/// Issues metrics-list calls and decodes the responses.
///
/// Cheap to clone; independent targets may be collected concurrently.
#[derive(Clone)]
pub struct Collector {
    subscription_id: String,
    client: Arc<dyn MetricsClient>,
}

impl Collector {
    pub fn new(subscription_id: impl Into<String>, client: Arc<dyn MetricsClient>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            client,
        }
    }

    /// Collect every metric of `target`. No retries: a transport or decode
    /// failure fails the whole target.
    pub async fn collect(&self, target: &ResourceTarget) -> ReceiverResult<TargetMetrics> {
        let query = MetricsQuery {
            metric_names: target.metrics.clone(),
            aggregations: target.aggregations.clone(),
        };
        let response = self
            .client
            .list(&target.resource_id, &query)
            .await
            .map_err(|e| ReceiverError::collection(&target.resource_id, format!("error listing metrics: {e}")))?;

        let collected = decode_response(&response, target, &self.subscription_id)
            .map_err(|message| ReceiverError::collection(&target.resource_id, message))?;

        debug!(
            resource_id = %target.resource_id,
            records = collected.records.len(),
            uncollected = collected.uncollected.len(),
            "collected resource target metrics"
        );
        Ok(collected)
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

/// Decode a metrics-list response for `target`.
pub fn decode_response(
    response: &MetricsResponse,
    target: &ResourceTarget,
    subscription_id: &str,
) -> Result<TargetMetrics, String> {
    let aggregations: Vec<Aggregation> = target
        .aggregations
        .iter()
        .filter_map(|a| a.parse().ok())
        .collect();

    let mut collected = TargetMetrics::default();
    for metric in &response.value {
        let name = metric_name(metric, response)?;
        let tags = metric_tags(metric, response, target, subscription_id)?;

        match metric_fields(metric, &aggregations)? {
            Some(fields) => collected.records.push(MetricRecord { name, fields, tags }),
            None => {
                let id = format!("{}{}{}", target.resource_id, METRICS_PATH, metric_name_value(metric)?);
                debug!(metric = %id, "no data point with a value");
                collected.uncollected.push(id);
            }
        }
    }
    Ok(collected)
}

fn sanitize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '.' | '/' => '_',
            c => c,
        })
        .collect()
}

fn metric_name_value(metric: &Metric) -> Result<&str, String> {
    metric
        .name
        .as_ref()
        .and_then(|n| n.value.as_deref())
        .ok_or_else(|| "metrics response is bad formatted: metric name.value is missing".to_string())
}

fn response_namespace(response: &MetricsResponse) -> Result<&str, String> {
    response
        .namespace
        .as_deref()
        .ok_or_else(|| "metrics response is bad formatted: namespace is missing".to_string())
}

/// `azure_monitor_{namespace}_{display name}`, lower-cased, with spaces,
/// dots and slashes turned into underscores.
pub fn metric_name(metric: &Metric, response: &MetricsResponse) -> Result<String, String> {
    let namespace = response_namespace(response)?;
    let display = metric
        .name
        .as_ref()
        .and_then(|n| n.localized_value.as_deref())
        .ok_or_else(|| "metrics response is bad formatted: metric name.localizedValue is missing".to_string())?;

    Ok(format!(
        "{METRIC_NAME_PREFIX}_{}_{}",
        sanitize(namespace),
        sanitize(display)
    ))
}

pub fn metric_tags(
    metric: &Metric,
    response: &MetricsResponse,
    target: &ResourceTarget,
    subscription_id: &str,
) -> Result<BTreeMap<String, String>, String> {
    if metric.id.is_none() {
        return Err("metrics response is bad formatted: metric ID is missing".to_string());
    }
    let unit = metric
        .unit
        .as_deref()
        .ok_or_else(|| "metrics response is bad formatted: metric unit is missing".to_string())?;
    let namespace = response_namespace(response)?;
    let region = response
        .resource_region
        .as_deref()
        .ok_or_else(|| "metrics response is bad formatted: resourceregion is missing".to_string())?;
    let parts = ResourceIdParts::parse(&target.resource_id)
        .ok_or_else(|| format!("resource ID {} is not fully qualified", target.resource_id))?;

    Ok(BTreeMap::from([
        (tags::SUBSCRIPTION_ID.to_string(), subscription_id.to_string()),
        (tags::RESOURCE_GROUP.to_string(), parts.resource_group),
        (tags::RESOURCE_NAME.to_string(), parts.resource_name),
        (tags::NAMESPACE.to_string(), namespace.to_string()),
        (tags::REGION.to_string(), region.to_string()),
        (tags::UNIT.to_string(), unit.to_string()),
    ]))
}

/// Fields of the latest data point, across all time series, carrying a
/// value for at least one requested aggregation.
///
/// Each series contributes its last such point; the most recent of those
/// wins and ties keep the earlier series. `None` when no point qualifies.
pub fn metric_fields(
    metric: &Metric,
    aggregations: &[Aggregation],
) -> Result<Option<BTreeMap<String, FieldValue>>, String> {
    let mut best: Option<(&str, BTreeMap<String, FieldValue>)> = None;

    for series in metric.timeseries.iter().flatten() {
        let data = series.data.as_deref().unwrap_or_default();
        let Some((timestamp, fields)) = latest_fields(data, aggregations)? else {
            continue;
        };
        if best.as_ref().is_none_or(|(current, _)| timestamp > *current) {
            best = Some((timestamp, fields));
        }
    }

    Ok(best.map(|(_, fields)| fields))
}

/// Walk `data` backwards to the last point with a requested value.
pub fn latest_fields<'a>(
    data: &'a [MetricValue],
    aggregations: &[Aggregation],
) -> Result<Option<(&'a str, BTreeMap<String, FieldValue>)>, String> {
    for point in data.iter().rev() {
        let mut fields = BTreeMap::new();
        for aggregation in aggregations {
            if let Some(value) = aggregation_value(point, *aggregation) {
                fields.insert(aggregation.as_str().to_string(), FieldValue::Number(value));
            }
        }
        if fields.is_empty() {
            continue;
        }

        let timestamp = point
            .time_stamp
            .as_deref()
            .ok_or_else(|| "metrics response is bad formatted: data point timeStamp is missing".to_string())?;
        fields.insert(fields::TIMESTAMP.to_string(), FieldValue::Timestamp(timestamp.to_string()));
        return Ok(Some((timestamp, fields)));
    }
    Ok(None)
}

fn aggregation_value(point: &MetricValue, aggregation: Aggregation) -> Option<f64> {
    match aggregation {
        Aggregation::Average => point.average,
        Aggregation::Count => point.count,
        Aggregation::Maximum => point.maximum,
        Aggregation::Minimum => point.minimum,
        Aggregation::Total => point.total,
    }
}
