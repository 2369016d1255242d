//! `azmon targets`: print the prepared resource targets.

use anyhow::Result;
use azmon_core::ResourceTarget;

use super::{build_receiver, OutputFormat};

pub async fn targets(path: &str, format: OutputFormat, secret_env: &str) -> Result<()> {
    let mut receiver = build_receiver(path, secret_env)?;
    receiver.prepare().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(receiver.resource_targets())?),
        OutputFormat::Text => print!("{}", format_targets(receiver.resource_targets())),
    }
    Ok(())
}

/// One line per request: resource ID, metrics, aggregations.
pub fn format_targets(targets: &[ResourceTarget]) -> String {
    targets
        .iter()
        .map(|t| {
            format!(
                "{} metrics={} aggregations={}\n",
                t.resource_id,
                t.metrics.join(","),
                t.aggregations.join(",")
            )
        })
        .collect()
}
