//! azmon-core: target resolution and request shaping for Azure Monitor
//! metrics.
//!
//! Turns a declarative set of targets (single resources, resource groups,
//! whole subscriptions) into metrics API requests the service accepts, then
//! decodes the responses into flat records.
//!
//! # Pipeline
//!
//! ```text
//! MetricsReceiver::new      validate, qualify resource IDs
//! MetricsReceiver::prepare
//!   ├── expand              resource group / subscription → resource targets
//!   ├── normalize           check / fill metrics, escape commas,
//!   │                       split by min time grain, cap at 20, default aggregations
//! MetricsReceiver::collect_all
//!   └── collect             one metrics-list call per target → MetricRecord
//! ```
//!
//! The three network collaborators are traits in [`api`]; [`memory`]
//! implements them in memory.

pub mod aggregation;
pub mod api;
pub mod collect;
pub mod config;
pub mod error;
pub mod expand;
pub mod memory;
pub mod normalize;
pub mod prometheus;
pub mod receiver;
pub mod record;
pub mod targets;
pub mod validate;

pub use aggregation::Aggregation;
pub use api::{AzureClients, MetricDefinitionsClient, MetricsClient, ResourcesClient};
pub use collect::{Collector, TargetMetrics};
pub use config::ReceiverConfig;
pub use error::{ClientError, ClientResult, ReceiverError, ReceiverResult};
pub use prometheus::render_prometheus;
pub use receiver::{CycleReport, MetricsReceiver, TargetFailure};
pub use record::{FieldValue, MetricRecord};
pub use targets::{ResourceGroupTarget, ResourceSpec, ResourceTarget, Targets};
