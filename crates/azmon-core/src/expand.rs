//! Expansion of resource group and subscription targets into resource
//! targets, driven by the resource inventory.

use tracing::debug;

use crate::api::{GenericResource, ResourcesClient};
use crate::error::{ReceiverError, ReceiverResult};
use crate::targets::{ResourceSpec, ResourceTarget, Targets};

/// Build `resourceType eq 'T1' or resourceType eq 'T2' ...` for `resources`.
pub fn resource_type_filter(resources: &[ResourceSpec]) -> String {
    resources
        .iter()
        .map(|r| format!("resourceType eq '{}'", r.resource_type))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Append one resource target per inventory match of every resource group
/// target's resource specs. Returns the number of targets created.
///
/// Nothing is appended unless every declared resource type matched.
pub async fn expand_resource_group_targets(
    targets: &mut Targets,
    client: &dyn ResourcesClient,
) -> ReceiverResult<usize> {
    if targets.resource_group_targets().is_empty() {
        return Ok(0);
    }

    let mut created = Vec::new();
    for group in targets.resource_group_targets() {
        let filter = resource_type_filter(&group.resources);
        let inventory = client
            .list_by_resource_group(&group.resource_group, &filter)
            .await
            .map_err(|e| {
                ReceiverError::Expansion(format!(
                    "listing resources of resource group {}: {e}",
                    group.resource_group
                ))
            })?;

        let group_targets = targets_from_inventory(&inventory, &group.resources).map_err(|message| {
            ReceiverError::Expansion(format!(
                "resource group target {}: {message}",
                group.resource_group
            ))
        })?;

        debug!(
            resource_group = %group.resource_group,
            inventory = inventory.len(),
            created = group_targets.len(),
            "expanded resource group target"
        );
        created.extend(group_targets);
    }

    let count = created.len();
    targets.resource_targets.extend(created);
    Ok(count)
}

/// Append one resource target per subscription-wide inventory match of
/// every subscription target. Returns the number of targets created.
pub async fn expand_subscription_targets(
    targets: &mut Targets,
    client: &dyn ResourcesClient,
) -> ReceiverResult<usize> {
    if targets.subscription_targets().is_empty() {
        return Ok(0);
    }

    let filter = resource_type_filter(targets.subscription_targets());
    let inventory = client
        .list(&filter)
        .await
        .map_err(|e| ReceiverError::Expansion(format!("listing subscription resources: {e}")))?;

    let created = targets_from_inventory(&inventory, targets.subscription_targets())
        .map_err(|message| ReceiverError::Expansion(format!("subscription targets: {message}")))?;

    debug!(
        inventory = inventory.len(),
        created = created.len(),
        "expanded subscription targets"
    );

    let count = created.len();
    targets.resource_targets.extend(created);
    Ok(count)
}

/// Match inventory entries against each spec's resource type.
///
/// Every match gets its own copy of the spec's metrics and aggregations.
/// A spec with no match fails the whole call.
fn targets_from_inventory(
    inventory: &[GenericResource],
    specs: &[ResourceSpec],
) -> Result<Vec<ResourceTarget>, String> {
    let mut created = Vec::new();

    for spec in specs {
        let mut matched = false;
        for resource in inventory {
            let resource_id = resource_id(resource)?;
            let resource_type = resource_type(resource)?;
            if !resource_type.eq_ignore_ascii_case(&spec.resource_type) {
                continue;
            }

            created.push(ResourceTarget::new(
                resource_id,
                spec.metrics.clone(),
                spec.aggregations.clone(),
            ));
            matched = true;
        }

        if !matched {
            return Err(format!(
                "could not find resources with resource type {}",
                spec.resource_type
            ));
        }
    }

    Ok(created)
}

fn resource_id(resource: &GenericResource) -> Result<&str, String> {
    resource
        .id
        .as_deref()
        .ok_or_else(|| "resources client response is bad formatted: resource ID is missing".to_string())
}

fn resource_type(resource: &GenericResource) -> Result<&str, String> {
    resource
        .resource_type
        .as_deref()
        .ok_or_else(|| "resources client response is bad formatted: resource type is missing".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryResources;
    use crate::targets::ResourceGroupTarget;

    const TYPE1: &str = "Microsoft.Test/type1";
    const TYPE2: &str = "Microsoft.Test/type2";
    const R1: &str = "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Test/type1/resource1";
    const R2: &str = "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Test/type2/resource2";
    const R3: &str = "/subscriptions/sub/resourceGroups/rg2/providers/Microsoft.Test/type1/resource3";

    fn inventory() -> InMemoryResources {
        InMemoryResources::new()
            .with_resource("rg1", R1, TYPE1)
            .with_resource("rg1", R2, TYPE2)
            .with_resource("rg2", R3, TYPE1)
    }

    fn spec(resource_type: &str, metrics: &[&str], aggregations: &[&str]) -> ResourceSpec {
        ResourceSpec::new(
            resource_type,
            metrics.iter().map(|s| s.to_string()).collect(),
            aggregations.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn filter_is_disjunction_over_types() {
        assert_eq!(
            resource_type_filter(&[spec(TYPE1, &[], &[]), spec(TYPE2, &[], &[])]),
            "resourceType eq 'Microsoft.Test/type1' or resourceType eq 'Microsoft.Test/type2'"
        );
        assert_eq!(resource_type_filter(&[]), "");
    }

    #[tokio::test]
    async fn resource_group_targets_expand_per_match() {
        let mut targets = Targets::new(
            vec![],
            vec![
                ResourceGroupTarget::new(
                    "rg1",
                    vec![spec(TYPE1, &["metric1"], &["total"]), spec(TYPE2, &[], &[])],
                ),
                ResourceGroupTarget::new("rg2", vec![spec(TYPE1, &["metric2"], &[])]),
            ],
            vec![],
        );

        let created = expand_resource_group_targets(&mut targets, &inventory()).await.unwrap();
        assert_eq!(created, 3);

        let ids: Vec<&str> = targets.resource_targets.iter().map(|t| t.resource_id.as_str()).collect();
        assert_eq!(ids, vec![R1, R2, R3]);
        assert_eq!(targets.resource_targets[0].metrics, vec!["metric1"]);
        assert_eq!(targets.resource_targets[0].aggregations, vec!["total"]);
        assert!(targets.resource_targets[1].metrics.is_empty());
        assert_eq!(targets.resource_targets[2].metrics, vec!["metric2"]);
    }

    #[tokio::test]
    async fn resource_group_type_without_match_fails_and_adds_nothing() {
        let mut targets = Targets::new(
            vec![],
            vec![
                ResourceGroupTarget::new("rg1", vec![spec(TYPE1, &[], &[])]),
                ResourceGroupTarget::new("rg2", vec![spec(TYPE2, &[], &[])]),
            ],
            vec![],
        );

        let err = expand_resource_group_targets(&mut targets, &inventory())
            .await
            .unwrap_err();
        match err {
            ReceiverError::Expansion(message) => {
                assert!(message.contains("rg2"));
                assert!(message.contains(TYPE2));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(targets.resource_targets.is_empty());
    }

    #[tokio::test]
    async fn subscription_targets_expand_across_groups() {
        let mut targets = Targets::new(vec![], vec![], vec![spec(TYPE1, &["metric1"], &["count"])]);

        let created = expand_subscription_targets(&mut targets, &inventory()).await.unwrap();
        assert_eq!(created, 2);
        assert_eq!(targets.resource_targets[0].resource_id, R1);
        assert_eq!(targets.resource_targets[1].resource_id, R3);
        assert_eq!(targets.resource_targets[1].aggregations, vec!["count"]);
    }

    #[tokio::test]
    async fn subscription_type_without_match_fails() {
        let mut targets = Targets::new(vec![], vec![], vec![spec("Microsoft.Test/type9", &[], &[])]);
        let err = expand_subscription_targets(&mut targets, &inventory()).await.unwrap_err();
        assert!(err.to_string().contains("Microsoft.Test/type9"));
        assert!(targets.resource_targets.is_empty());
    }

    #[tokio::test]
    async fn resource_type_match_ignores_case() {
        let inventory = InMemoryResources::new()
            .with_resource("rg1", R1, "microsoft.test/TYPE1")
            .with_resource("rg1", R2, TYPE2);
        let mut targets = Targets::new(
            vec![],
            vec![ResourceGroupTarget::new("rg1", vec![spec(TYPE1, &["metric1"], &[])])],
            vec![],
        );

        let created = expand_resource_group_targets(&mut targets, &inventory).await.unwrap();
        assert_eq!(created, 1);
        assert_eq!(targets.resource_targets[0].resource_id, R1);
        assert_eq!(targets.resource_targets[0].metrics, vec!["metric1"]);
    }

    #[tokio::test]
    async fn derived_targets_do_not_share_lists() {
        let mut targets = Targets::new(vec![], vec![], vec![spec(TYPE1, &["metric1"], &["total"])]);
        expand_subscription_targets(&mut targets, &inventory()).await.unwrap();

        targets.resource_targets[0].metrics.push("metric2".to_string());
        assert_eq!(targets.resource_targets[1].metrics, vec!["metric1"]);
        assert_eq!(targets.subscription_targets()[0].metrics, vec!["metric1"]);
    }

    #[tokio::test]
    async fn empty_sources_are_no_ops() {
        let inventory = inventory();
        let mut targets = Targets::default();
        assert_eq!(expand_resource_group_targets(&mut targets, &inventory).await.unwrap(), 0);
        assert_eq!(expand_subscription_targets(&mut targets, &inventory).await.unwrap(), 0);
        assert_eq!(inventory.calls(), 0);
    }

    #[tokio::test]
    async fn inventory_failure_is_expansion_error() {
        let mut targets = Targets::new(vec![], vec![], vec![spec(TYPE1, &[], &[])]);
        let err = expand_subscription_targets(&mut targets, &InMemoryResources::new().failing("timeout"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiverError::Expansion(m) if m.contains("timeout")));
    }

    #[tokio::test]
    async fn inventory_entry_without_id_is_rejected() {
        let inventory = InMemoryResources::new().with_raw_resource(
            "rg1",
            GenericResource {
                id: None,
                resource_type: Some(TYPE1.to_string()),
                ..Default::default()
            },
        );
        let mut targets = Targets::new(vec![], vec![], vec![spec(TYPE1, &[], &[])]);
        let err = expand_subscription_targets(&mut targets, &inventory).await.unwrap_err();
        assert!(err.to_string().contains("resource ID is missing"));
    }
}
