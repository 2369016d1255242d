//! Flat metric records produced by a collection cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix of every record name.
pub const METRIC_NAME_PREFIX: &str = "azure_monitor";

/// Field keys. Aggregation fields share the aggregation's name.
pub mod fields {
    pub const TOTAL: &str = "total";
    pub const AVERAGE: &str = "average";
    pub const MINIMUM: &str = "minimum";
    pub const MAXIMUM: &str = "maximum";
    pub const COUNT: &str = "count";
    pub const TIMESTAMP: &str = "timestamp";
}

/// Tag keys.
pub mod tags {
    pub const SUBSCRIPTION_ID: &str = "subscription_id";
    pub const RESOURCE_GROUP: &str = "resource_group";
    pub const RESOURCE_NAME: &str = "resource_name";
    pub const NAMESPACE: &str = "namespace";
    pub const REGION: &str = "resource_region";
    pub const UNIT: &str = "unit";

    pub const ALL: [&str; 6] = [SUBSCRIPTION_ID, RESOURCE_GROUP, RESOURCE_NAME, NAMESPACE, REGION, UNIT];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    /// ISO-8601 timestamp, verbatim from the API.
    Timestamp(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Timestamp(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&str> {
        match self {
            FieldValue::Timestamp(ts) => Some(ts),
            FieldValue::Number(_) => None,
        }
    }
}

/// One metric's latest value for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub tags: BTreeMap<String, String>,
}

impl MetricRecord {
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.field(fields::TIMESTAMP).and_then(FieldValue::as_timestamp)
    }
}
