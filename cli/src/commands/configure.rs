//! Show or update the persisted CLI defaults

use anyhow::{bail, Result};
use colored::Colorize;

use hushfund::amount::MAX_DECIMALS;
use hushfund::{Address, Mode};

use crate::config::{CliConfig, Settings};

/// `None` fields are left unchanged
pub struct ConfigUpdate {
    pub wallet: Option<String>,
    pub mode: Option<Mode>,
    pub decimals: Option<u8>,
}

pub fn show(settings: &Settings) -> Result<()> {
    let config = CliConfig::load(&settings.config_file)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("{}", format!("({})", settings.config_file.display()).dimmed());
    Ok(())
}

pub fn set(settings: &Settings, update: ConfigUpdate) -> Result<CliConfig> {
    let mut config = CliConfig::load(&settings.config_file)?;

    if let Some(wallet) = update.wallet {
        config.wallet = Some(Address::parse(&wallet)?);
    }
    if let Some(mode) = update.mode {
        config.mode = mode;
    }
    if let Some(decimals) = update.decimals {
        if decimals > MAX_DECIMALS {
            bail!("Token decimals must be at most {}", MAX_DECIMALS);
        }
        config.decimals = decimals;
    }

    config.save(&settings.config_file)?;
    println!("{}", "Configuration saved.".green());
    Ok(config)
}
