//! Metric normalization: shaping resource targets into requests the
//! metrics API accepts.
//!
//! Every request must name metrics that exist for the resource, share one
//! minimum time grain, and carry at most [`MAX_METRICS_PER_REQUEST`]
//! metrics. The stages below get there by filling, validating, escaping
//! and splitting targets. Splits append new sibling targets to the shared
//! list and never remove one.

use std::collections::BTreeMap;

use tracing::debug;

use crate::aggregation::Aggregation;
use crate::api::{MetricDefinition, MetricDefinitionsClient};
use crate::error::{ReceiverError, ReceiverResult};
use crate::targets::{ResourceTarget, Targets};

/// Maximum number of metrics the API accepts in one request.
pub const MAX_METRICS_PER_REQUEST: usize = 20;

/// Fetch the metric catalog of one resource. An empty catalog is an error.
pub async fn fetch_metric_definitions(
    client: &dyn MetricDefinitionsClient,
    resource_id: &str,
) -> ReceiverResult<Vec<MetricDefinition>> {
    let definitions = client.list(resource_id).await.map_err(|e| {
        ReceiverError::catalog(resource_id, format!("error listing metric definitions: {e}"))
    })?;

    if definitions.is_empty() {
        return Err(ReceiverError::catalog(
            resource_id,
            "metric definitions response is bad formatted: value is empty",
        ));
    }

    Ok(definitions)
}

fn definition_name(definition: &MetricDefinition) -> Result<&str, String> {
    let name = definition.name.as_ref().ok_or_else(|| {
        "metric definitions response is bad formatted: metric definition name is missing".to_string()
    })?;
    name.value.as_deref().ok_or_else(|| {
        "metric definitions response is bad formatted: metric definition name.value is missing"
            .to_string()
    })
}

fn definition_min_time_grain(definition: &MetricDefinition) -> Result<&str, String> {
    let availability = definition.metric_availabilities.first().ok_or_else(|| {
        "metric definitions response is bad formatted: metric definition metricAvailabilities is empty"
            .to_string()
    })?;
    availability.time_grain.as_deref().ok_or_else(|| {
        "metric definitions response is bad formatted: metricAvailabilities[0].timeGrain is missing"
            .to_string()
    })
}

// ── Validate / fill ────────────────────────────────────────────

/// Check that every declared metric exists in the target's catalog.
pub fn check_target_metrics(
    target: &ResourceTarget,
    definitions: &[MetricDefinition],
) -> Result<(), String> {
    let names = definitions
        .iter()
        .map(definition_name)
        .collect::<Result<Vec<_>, _>>()?;

    match target.metrics.iter().find(|m| !names.contains(&m.as_str())) {
        Some(metric) => Err(format!(
            "resource target has invalid metric {metric}. Please check your resource targets, \
             resource group targets and subscription targets in your configuration"
        )),
        None => Ok(()),
    }
}

/// Validate the declared metrics of every resource target that has some.
pub async fn check_metrics_validation(
    targets: &Targets,
    client: &dyn MetricDefinitionsClient,
) -> ReceiverResult<()> {
    for target in targets.resource_targets.iter().filter(|t| !t.metrics.is_empty()) {
        let definitions = fetch_metric_definitions(client, &target.resource_id).await?;
        check_target_metrics(target, &definitions)
            .map_err(|message| ReceiverError::catalog(&target.resource_id, message))?;
    }
    Ok(())
}

/// Replace an empty metric list with every metric of the catalog, in
/// catalog order.
pub fn fill_target_metrics(
    target: &mut ResourceTarget,
    definitions: &[MetricDefinition],
) -> Result<(), String> {
    if !target.metrics.is_empty() {
        return Ok(());
    }
    target.metrics = definitions
        .iter()
        .map(|d| definition_name(d).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

/// Fill the metric list of every resource target that declares none.
pub async fn set_metrics(
    targets: &mut Targets,
    client: &dyn MetricDefinitionsClient,
) -> ReceiverResult<()> {
    for target in targets.resource_targets.iter_mut().filter(|t| t.metrics.is_empty()) {
        let definitions = fetch_metric_definitions(client, &target.resource_id).await?;
        fill_target_metrics(target, &definitions)
            .map_err(|message| ReceiverError::catalog(&target.resource_id, message))?;
        debug!(
            resource_id = %target.resource_id,
            metrics = target.metrics.len(),
            "filled metrics from catalog"
        );
    }
    Ok(())
}

// ── Escape ─────────────────────────────────────────────────────

/// Replace every comma in a metric name with `%2`.
///
/// Metric names are joined with commas in one request parameter, so a
/// literal comma must not reach it.
pub fn escape_metric_name(name: &str) -> String {
    name.replace(',', "%2")
}

pub fn escape_metrics(targets: &mut Targets) {
    for target in &mut targets.resource_targets {
        for metric in &mut target.metrics {
            if metric.contains(',') {
                *metric = escape_metric_name(metric);
            }
        }
    }
}

// ── Split by minimum time grain ────────────────────────────────

/// Group the target's metrics by minimum time grain.
///
/// The target keeps the lexicographically smallest grain's metrics; each
/// other grain becomes a returned sibling with copied aggregations. Metric
/// names may already be escaped: a catalog name equal to the metric wins,
/// otherwise the catalog name is compared in escaped form.
pub fn split_target_by_time_grain(
    target: &mut ResourceTarget,
    definitions: &[MetricDefinition],
) -> Result<Vec<ResourceTarget>, String> {
    let mut grains: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for metric in &target.metrics {
        let mut exact = None;
        let mut escaped = None;
        for definition in definitions {
            let name = definition_name(definition)?;
            if name == metric {
                exact = Some(definition);
                break;
            }
            if escaped.is_none() && escape_metric_name(name) == *metric {
                escaped = Some(definition);
            }
        }
        let grain = exact
            .or(escaped)
            .map(definition_min_time_grain)
            .transpose()?
            .ok_or_else(|| {
                format!("metric {metric} has no definition, cannot determine its minimum time grain")
            })?;
        grains.entry(grain.to_string()).or_default().push(metric.clone());
    }

    if grains.len() <= 1 {
        return Ok(Vec::new());
    }

    let mut groups = grains.into_values();
    if let Some(first) = groups.next() {
        target.metrics = first;
    }
    Ok(groups
        .map(|metrics| ResourceTarget::new(target.resource_id.clone(), metrics, target.aggregations.clone()))
        .collect())
}

/// Split every resource target whose metrics span several minimum time
/// grains.
pub async fn split_by_min_time_grain(
    targets: &mut Targets,
    client: &dyn MetricDefinitionsClient,
) -> ReceiverResult<()> {
    let original = targets.resource_targets.len();
    for index in 0..original {
        let resource_id = targets.resource_targets[index].resource_id.clone();
        let definitions = fetch_metric_definitions(client, &resource_id).await?;

        let siblings = split_target_by_time_grain(&mut targets.resource_targets[index], &definitions)
            .map_err(|message| ReceiverError::catalog(&resource_id, message))?;

        if !siblings.is_empty() {
            debug!(%resource_id, groups = siblings.len() + 1, "split target by minimum time grain");
            targets.resource_targets.extend(siblings);
        }
    }
    Ok(())
}

// ── Cap per request ────────────────────────────────────────────

/// Keep the first `max` metrics on the target and return the rest as
/// consecutive siblings of at most `max` metrics each.
pub fn split_target_by_max_metrics(target: &mut ResourceTarget, max: usize) -> Vec<ResourceTarget> {
    if max == 0 || target.metrics.len() <= max {
        return Vec::new();
    }

    let overflow = target.metrics.split_off(max);
    overflow
        .chunks(max)
        .map(|chunk| ResourceTarget::new(target.resource_id.clone(), chunk.to_vec(), target.aggregations.clone()))
        .collect()
}

/// Cap every resource target at [`MAX_METRICS_PER_REQUEST`] metrics.
pub fn split_by_max_metrics(targets: &mut Targets) {
    let original = targets.resource_targets.len();
    for index in 0..original {
        let siblings = split_target_by_max_metrics(&mut targets.resource_targets[index], MAX_METRICS_PER_REQUEST);
        if !siblings.is_empty() {
            debug!(
                resource_id = %targets.resource_targets[index].resource_id,
                extra_requests = siblings.len(),
                "split target exceeding the per-request metric limit"
            );
            targets.resource_targets.extend(siblings);
        }
    }
}

// ── Aggregations ───────────────────────────────────────────────

/// Default an empty aggregation list to every known aggregation.
pub fn default_target_aggregations(target: &mut ResourceTarget) {
    if target.aggregations.is_empty() {
        target.aggregations = Aggregation::all_names();
    }
}

pub fn set_aggregations(targets: &mut Targets) {
    for target in &mut targets.resource_targets {
        default_target_aggregations(target);
    }
}
