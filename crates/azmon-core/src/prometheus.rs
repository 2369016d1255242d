//! Prometheus text exposition format.
//!
//! Renders collected records as gauges, one sample per aggregation field.

use std::collections::BTreeMap;

use chrono::DateTime;

use crate::record::{FieldValue, MetricRecord};

/// Render records into Prometheus text format.
///
/// Each numeric field becomes a sample of the `{record name}_{field}` gauge,
/// labelled with the record's tags. The data point's time is the sample
/// timestamp in milliseconds. All samples of one gauge follow its `# TYPE`
/// line.
pub fn render_prometheus(records: &[MetricRecord]) -> String {
    let mut families: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for record in records {
        let labels = labels(record);
        let timestamp = record.timestamp().and_then(sample_timestamp);
        for (field, value) in &record.fields {
            let FieldValue::Number(value) = value else {
                continue;
            };
            let sample = match timestamp {
                Some(ms) => format!("{{{labels}}} {value} {ms}"),
                None => format!("{{{labels}}} {value}"),
            };
            families
                .entry(format!("{}_{field}", record.name))
                .or_default()
                .push(sample);
        }
    }

    let mut out = String::new();
    for (family, samples) in &families {
        out.push_str(&format!("# TYPE {family} gauge\n"));
        for sample in samples {
            out.push_str(&format!("{family}{sample}\n"));
        }
    }
    out
}

fn labels(record: &MetricRecord) -> String {
    record
        .tags
        .iter()
        .map(|(key, value)| format!("{key}=\"{}\"", escape_label(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Milliseconds since the epoch, if the point's time is RFC 3339.
fn sample_timestamp(ts: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(ts).ok().map(|t| t.timestamp_millis())
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
