pub mod collect;
pub mod targets;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use azmon_arm::{create_azure_clients, ClientOptions};
use azmon_core::{MetricsReceiver, ReceiverConfig};
use clap::ValueEnum;

pub const DEFAULT_SECRET_ENV: &str = "AZMON_CLIENT_SECRET";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn load_config(path: &str) -> Result<ReceiverConfig> {
    ReceiverConfig::from_file(Path::new(path)).with_context(|| format!("loading {path}"))
}

/// Fill an empty client secret from `env_value`.
pub fn resolve_client_secret(config: &mut ReceiverConfig, env_value: Option<String>) {
    if config.client_secret.is_empty()
        && let Some(secret) = env_value
    {
        config.client_secret = secret;
    }
}

/// Load the config and build a receiver backed by the ARM clients.
pub fn build_receiver(path: &str, secret_env: &str) -> Result<MetricsReceiver> {
    let mut config = load_config(path)?;
    resolve_client_secret(&mut config, std::env::var(secret_env).ok());
    receiver_from_config(&config)
}

pub fn receiver_from_config(config: &ReceiverConfig) -> Result<MetricsReceiver> {
    config.check_credentials()?;

    let options = ClientOptions::from_cloud(config.cloud.as_ref());
    let clients = create_azure_clients(
        &config.subscription_id,
        &config.client_id,
        &config.client_secret,
        &config.tenant_id,
        &options,
    )
    .context("creating Azure clients")?;

    Ok(MetricsReceiver::new(&config.subscription_id, config.targets(), clients)?)
}
