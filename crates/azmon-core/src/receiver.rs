//! The metrics receiver: owns the targets and collaborators of one
//! collection cycle and drives them through the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::api::AzureClients;
use crate::collect::{Collector, TargetMetrics};
use crate::error::{ReceiverError, ReceiverResult};
use crate::record::MetricRecord;
use crate::targets::{ResourceTarget, Targets};
use crate::{expand, normalize, validate};

/// Outcome of one collection cycle over every resource target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// Records in resource-target order.
    pub records: Vec<MetricRecord>,
    pub uncollected: Vec<String>,
    pub failures: Vec<TargetFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetFailure {
    pub resource_id: String,
    pub error: String,
}

impl CycleReport {
    pub fn all_failed(&self) -> bool {
        !self.failures.is_empty() && self.records.is_empty() && self.uncollected.is_empty()
    }
}

/// Receiver for one subscription.
///
/// Resource target IDs are fully qualified once, at construction. The
/// preparation stages below mutate the target set in place and must run in
/// the order [`MetricsReceiver::prepare`] uses.
pub struct MetricsReceiver {
    subscription_id: String,
    targets: Targets,
    clients: AzureClients,
    collector: Collector,
}

impl MetricsReceiver {
    /// Validate `targets` and qualify their resource IDs.
    pub fn new(
        subscription_id: impl Into<String>,
        mut targets: Targets,
        clients: AzureClients,
    ) -> ReceiverResult<Self> {
        let subscription_id = subscription_id.into();
        validate::validate(&targets, &subscription_id)?;
        validate::qualify_resource_ids(&mut targets, &subscription_id);

        let collector = Collector::new(subscription_id.clone(), clients.metrics.clone());
        Ok(Self {
            subscription_id,
            targets,
            clients,
            collector,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn resource_targets(&self) -> &[ResourceTarget] {
        &self.targets.resource_targets
    }

    /// Run every preparation stage in order. Afterwards each resource
    /// target names existing metrics sharing one minimum time grain, at
    /// most [`normalize::MAX_METRICS_PER_REQUEST`] of them, and at least
    /// one aggregation.
    pub async fn prepare(&mut self) -> ReceiverResult<()> {
        let declared = self.targets.resource_targets.len();

        self.create_resource_targets_from_resource_group_targets().await?;
        self.create_resource_targets_from_subscription_targets().await?;
        self.check_resource_targets_metrics_validation().await?;
        self.set_resource_targets_metrics().await?;
        self.escape_resource_targets_metrics();
        self.split_resource_targets_metrics_by_min_time_grain().await?;
        self.split_resource_targets_with_more_than_max_metrics();
        self.set_resource_targets_aggregations();

        info!(
            subscription_id = %self.subscription_id,
            declared,
            prepared = self.targets.resource_targets.len(),
            "resource targets prepared"
        );
        Ok(())
    }

    pub async fn create_resource_targets_from_resource_group_targets(&mut self) -> ReceiverResult<()> {
        let created =
            expand::expand_resource_group_targets(&mut self.targets, self.clients.resources.as_ref()).await?;
        debug!(created, "resource targets from resource group targets");
        Ok(())
    }

    pub async fn create_resource_targets_from_subscription_targets(&mut self) -> ReceiverResult<()> {
        let created =
            expand::expand_subscription_targets(&mut self.targets, self.clients.resources.as_ref()).await?;
        debug!(created, "resource targets from subscription targets");
        Ok(())
    }

    pub async fn check_resource_targets_metrics_validation(&self) -> ReceiverResult<()> {
        normalize::check_metrics_validation(&self.targets, self.clients.metric_definitions.as_ref()).await
    }

    pub async fn set_resource_targets_metrics(&mut self) -> ReceiverResult<()> {
        normalize::set_metrics(&mut self.targets, self.clients.metric_definitions.as_ref()).await
    }

    pub fn escape_resource_targets_metrics(&mut self) {
        normalize::escape_metrics(&mut self.targets);
    }

    pub async fn split_resource_targets_metrics_by_min_time_grain(&mut self) -> ReceiverResult<()> {
        normalize::split_by_min_time_grain(&mut self.targets, self.clients.metric_definitions.as_ref()).await
    }

    pub fn split_resource_targets_with_more_than_max_metrics(&mut self) {
        normalize::split_by_max_metrics(&mut self.targets);
    }

    pub fn set_resource_targets_aggregations(&mut self) {
        normalize::set_aggregations(&mut self.targets);
    }

    /// One metrics-list call for `target`.
    pub async fn collect_resource_target_metrics(
        &self,
        target: &ResourceTarget,
    ) -> ReceiverResult<TargetMetrics> {
        self.collector.collect(target).await
    }

    /// Collect every resource target, at most `concurrency` at a time.
    ///
    /// A failing target is reported in [`CycleReport::failures`] and does
    /// not stop the others.
    pub async fn collect_all(&self, concurrency: usize) -> CycleReport {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut task_targets = HashMap::new();

        for (index, target) in self.targets.resource_targets.iter().cloned().enumerate() {
            let collector = self.collector.clone();
            let semaphore = semaphore.clone();
            let resource_id = target.resource_id.clone();

            let handle = tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ReceiverError::collection(&target.resource_id, e))?;
                collector.collect(&target).await
            });
            task_targets.insert(handle.id(), (index, resource_id));
        }

        let mut outcomes: Vec<Option<TargetMetrics>> = vec![None; self.targets.resource_targets.len()];
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result.map_err(|e| e.to_string())),
                Err(e) => (e.id(), Err(format!("collection task failed: {e}"))),
            };
            let Some((index, resource_id)) = task_targets.remove(&id) else {
                continue;
            };

            match result {
                Ok(collected) => outcomes[index] = Some(collected),
                Err(error) => {
                    warn!(%resource_id, %error, "failed to collect resource target");
                    failures.push((index, TargetFailure { resource_id, error }));
                }
            }
        }

        failures.sort_by_key(|(index, _)| *index);
        let mut report = CycleReport {
            failures: failures.into_iter().map(|(_, failure)| failure).collect(),
            ..Default::default()
        };
        for collected in outcomes.into_iter().flatten() {
            report.records.extend(collected.records);
            report.uncollected.extend(collected.uncollected);
        }

        info!(
            subscription_id = %self.subscription_id,
            targets = self.targets.resource_targets.len(),
            records = report.records.len(),
            uncollected = report.uncollected.len(),
            failures = report.failures.len(),
            "collection cycle finished"
        );
        report
    }
}

impl std::fmt::Debug for MetricsReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsReceiver")
            .field("subscription_id", &self.subscription_id)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
