//! Structural validation of a target set, done before any network call.

use crate::aggregation::Aggregation;
use crate::error::{ReceiverError, ReceiverResult};
use crate::targets::{ResourceTarget, Targets};

/// Check that `targets` can be collected for `subscription_id`.
///
/// The first violation aborts with an error naming the target (1-based)
/// and the field at fault.
pub fn validate(targets: &Targets, subscription_id: &str) -> ReceiverResult<()> {
    if subscription_id.is_empty() {
        return Err(ReceiverError::Validation(
            "subscription ID is empty or missing".to_string(),
        ));
    }

    if targets.is_empty() {
        return Err(ReceiverError::Validation(
            "no target to collect metrics from".to_string(),
        ));
    }

    validate_resource_targets(&targets.resource_targets)?;
    validate_resource_group_targets(targets)?;
    validate_subscription_targets(targets)
}

/// Prefix every resource target ID with its subscription path.
pub fn qualify_resource_ids(targets: &mut Targets, subscription_id: &str) {
    for target in &mut targets.resource_targets {
        target.resource_id = format!("/subscriptions/{subscription_id}/{}", target.resource_id);
    }
}

fn invalid_aggregations(what: String) -> ReceiverError {
    ReceiverError::Validation(format!(
        "{what} aggregations contain invalid aggregation/s. The valid aggregations are: {}",
        Aggregation::all_names().join(", ")
    ))
}

fn validate_resource_targets(resource_targets: &[ResourceTarget]) -> ReceiverResult<()> {
    for (index, target) in resource_targets.iter().enumerate() {
        let n = index + 1;
        if target.resource_id.is_empty() {
            return Err(ReceiverError::Validation(format!(
                "resource target #{n} resource ID is empty or missing"
            )));
        }
        if !Aggregation::are_valid(&target.aggregations) {
            return Err(invalid_aggregations(format!("resource target #{n}")));
        }
    }
    Ok(())
}

fn validate_resource_group_targets(targets: &Targets) -> ReceiverResult<()> {
    for (group_index, target) in targets.resource_group_targets().iter().enumerate() {
        let g = group_index + 1;
        if target.resource_group.is_empty() {
            return Err(ReceiverError::Validation(format!(
                "resource group target #{g} resource group is empty or missing"
            )));
        }
        if target.resources.is_empty() {
            return Err(ReceiverError::Validation(format!(
                "resource group target #{g} has no resources"
            )));
        }

        for (resource_index, resource) in target.resources.iter().enumerate() {
            let r = resource_index + 1;
            if resource.resource_type.is_empty() {
                return Err(ReceiverError::Validation(format!(
                    "resource group target #{g} resource #{r} resource_type is empty or missing"
                )));
            }
            if !Aggregation::are_valid(&resource.aggregations) {
                return Err(invalid_aggregations(format!(
                    "resource group target #{g} resource #{r}"
                )));
            }
        }
    }
    Ok(())
}

fn validate_subscription_targets(targets: &Targets) -> ReceiverResult<()> {
    for (index, target) in targets.subscription_targets().iter().enumerate() {
        let n = index + 1;
        if target.resource_type.is_empty() {
            return Err(ReceiverError::Validation(format!(
                "subscription target #{n} resource_type is empty or missing"
            )));
        }
        if !Aggregation::are_valid(&target.aggregations) {
            return Err(invalid_aggregations(format!("subscription target #{n}")));
        }
    }
    Ok(())
}
