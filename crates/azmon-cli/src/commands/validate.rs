//! `azmon validate`: check a configuration without network calls.

use anyhow::Result;
use azmon_core::validate;

use super::load_config;

pub fn validate(path: &str) -> Result<()> {
    let config = load_config(path)?;
    println!("{}", summary(&config)?);
    Ok(())
}

fn summary(config: &azmon_core::ReceiverConfig) -> Result<String> {
    let targets = config.targets();
    validate::validate(&targets, &config.subscription_id)?;
    config.check_credentials()?;

    Ok(format!(
        "✓ configuration valid: {} resource target(s), {} resource group target(s), {} subscription target(s)",
        targets.resource_targets.len(),
        targets.resource_group_targets().len(),
        targets.subscription_targets().len()
    ))
}
