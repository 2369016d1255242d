//! The fixed set of aggregations the metrics API computes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A statistical summary computed by the API over one sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Average,
    Count,
    Maximum,
    Minimum,
    Total,
}

impl Aggregation {
    /// Every aggregation, in the order used when a target declares none.
    pub const ALL: [Aggregation; 5] = [
        Aggregation::Average,
        Aggregation::Count,
        Aggregation::Maximum,
        Aggregation::Minimum,
        Aggregation::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Average => "average",
            Aggregation::Count => "count",
            Aggregation::Maximum => "maximum",
            Aggregation::Minimum => "minimum",
            Aggregation::Total => "total",
        }
    }

    /// Names of every aggregation, in [`Aggregation::ALL`] order.
    pub fn all_names() -> Vec<String> {
        Self::ALL.iter().map(|a| a.as_str().to_string()).collect()
    }

    /// Whether every name is an exact, case-sensitive member of the set.
    pub fn are_valid(names: &[String]) -> bool {
        names.iter().all(|name| name.parse::<Aggregation>().is_ok())
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown aggregation '{s}'"))
    }
}
