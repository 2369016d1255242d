//! azmon-arm: Azure Resource Manager clients for the azmon receiver.
//!
//! Implements the collaborator traits of `azmon_core::api` over HTTPS,
//! authenticated with a client-secret credential.
//!
//! # Architecture
//!
//! ```text
//! create_azure_clients()
//!   ├── ClientSecretCredential   token cache, refreshed 60s before expiry
//!   ├── ArmClient                bearer GET, status mapping, nextLink paging
//!   ├── ArmResourcesClient       /subscriptions/{id}[/resourceGroups/{rg}]/resources
//!   ├── ArmMetricDefinitionsClient  {resource}/providers/Microsoft.Insights/metricDefinitions
//!   └── ArmMetricsClient         {resource}/providers/Microsoft.Insights/metrics
//! ```

pub mod client;
pub mod credential;
pub mod error;
pub mod monitor;
pub mod options;
pub mod resources;

use std::sync::Arc;

use azmon_core::AzureClients;
use tracing::debug;

pub use client::ArmClient;
pub use credential::ClientSecretCredential;
pub use error::{ArmError, ArmResult};
pub use monitor::{ArmMetricDefinitionsClient, ArmMetricsClient};
pub use options::ClientOptions;
pub use resources::ArmResourcesClient;

/// Build the three collaborators for one subscription, sharing one HTTP
/// connection pool and one credential.
pub fn create_azure_clients(
    subscription_id: &str,
    client_id: &str,
    client_secret: &str,
    tenant_id: &str,
    options: &ClientOptions,
) -> ArmResult<AzureClients> {
    let http = reqwest::Client::builder()
        .timeout(options.timeout)
        .user_agent(concat!("azmon/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let credential = Arc::new(ClientSecretCredential::new(
        http.clone(),
        tenant_id,
        client_id,
        client_secret,
        options,
    )?);
    let client = Arc::new(ArmClient::new(http, &options.resource_manager_endpoint, credential)?);

    debug!(
        %subscription_id,
        endpoint = %options.resource_manager_endpoint,
        "created resource manager clients"
    );

    Ok(AzureClients::new(
        Arc::new(ArmResourcesClient::new(client.clone(), subscription_id)),
        Arc::new(ArmMetricDefinitionsClient::new(client.clone())),
        Arc::new(ArmMetricsClient::new(client)),
    ))
}
