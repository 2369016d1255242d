//! `azmon collect`: run one collection cycle.

use anyhow::{bail, Result};
use azmon_core::{render_prometheus, CycleReport};
use tracing::{debug, info};

use super::{build_receiver, OutputFormat};

pub async fn collect(path: &str, format: OutputFormat, concurrency: usize, secret_env: &str) -> Result<()> {
    let mut receiver = build_receiver(path, secret_env)?;
    receiver.prepare().await?;

    let report = receiver.collect_all(concurrency).await;
    for metric in &report.uncollected {
        debug!(%metric, "no value collected");
    }

    print!("{}", render(&report, format)?);

    if report.all_failed() {
        bail!("all {} resource target(s) failed to collect", report.failures.len());
    }
    info!(
        records = report.records.len(),
        failures = report.failures.len(),
        "collect finished"
    );
    Ok(())
}

fn render(report: &CycleReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&report.records)?),
        OutputFormat::Text => render_prometheus(&report.records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmon_core::{FieldValue, MetricRecord};
    use std::collections::BTreeMap;

    fn report() -> CycleReport {
        CycleReport {
            records: vec![MetricRecord {
                name: "azure_monitor_a_b_m".to_string(),
                fields: BTreeMap::from([
                    ("total".to_string(), FieldValue::Number(5.0)),
                    ("timestamp".to_string(), FieldValue::Timestamp("2022-02-22T22:59:00Z".to_string())),
                ]),
                tags: BTreeMap::from([("unit".to_string(), "Count".to_string())]),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_json_keeps_timestamp_string() {
        let output = render(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["fields"]["total"], 5.0);
        assert_eq!(value[0]["fields"]["timestamp"], "2022-02-22T22:59:00Z");
    }

    #[test]
    fn test_render_text_is_prometheus() {
        let output = render(&report(), OutputFormat::Text).unwrap();
        assert!(output.contains("# TYPE azure_monitor_a_b_m_total gauge"));
    }
}
