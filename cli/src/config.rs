//! Configuration and file locations for the hushfund CLI
//!
//! Everything lives under `~/.hushfund/` unless overridden by flags:
//! the encrypted key vault, the local network state and `config.json`
//! holding the default wallet and mode.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use hushfund::amount::MAX_DECIMALS;
use hushfund::{Address, Mode};

const HUSHFUND_DIR: &str = ".hushfund";
const CONFIG_FILE: &str = "config.json";
const VAULT_FILE: &str = "keys.vault";
const NETWORK_FILE: &str = "network.json";

/// Decimals of the simulated token when a new network file is created
pub const DEFAULT_DECIMALS: u8 = 18;

/// Environment variable consulted before prompting for the vault password
pub const PASSWORD_ENV: &str = "HUSHFUND_PASSWORD";

/// Persisted defaults, edited with `hushfund config set`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    /// Default wallet address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Address>,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_mode() -> Mode {
    Mode::Standalone
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            wallet: None,
            mode: default_mode(),
            decimals: default_decimals(),
        }
    }
}

impl CliConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_json::from_str(&json).context("Failed to parse config file")?;
        if config.decimals > MAX_DECIMALS {
            bail!("Invalid decimals {} in {} (at most {})", config.decimals, path.display(), MAX_DECIMALS);
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create hushfund directory")?;
        }
        let json = serde_json::to_string_pretty(self)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::write(path, &json)?;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, &json)?;
        }

        Ok(())
    }
}

/// Get the hushfund directory path
pub fn hushfund_dir() -> Result<PathBuf> {
    match dirs::home_dir() {
        Some(home) => Ok(home.join(HUSHFUND_DIR)),
        None => bail!("Could not find home directory; pass --vault and --network-file explicitly"),
    }
}

/// Global flags as given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub vault: Option<PathBuf>,
    pub network_file: Option<PathBuf>,
    pub wallet: Option<String>,
    pub mode: Option<Mode>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_file: PathBuf,
    pub vault: PathBuf,
    pub network_file: PathBuf,
    pub wallet: Option<Address>,
    pub mode: Mode,
    pub decimals: u8,
}

impl Settings {
    /// Flags win over `config.json`, which wins over built-in defaults.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let base = match (&overrides.config_file, &overrides.vault, &overrides.network_file) {
            (Some(_), Some(_), Some(_)) => None,
            _ => Some(hushfund_dir()?),
        };
        let under_base = |name: &str| base.as_ref().map(|dir| dir.join(name)).unwrap_or_default();

        let config_file = overrides.config_file.unwrap_or_else(|| under_base(CONFIG_FILE));
        let config = CliConfig::load(&config_file)?;

        let wallet = match overrides.wallet {
            Some(raw) => Some(Address::parse(&raw).with_context(|| format!("Invalid --wallet '{}'", raw))?),
            None => config.wallet,
        };

        Ok(Self {
            vault: overrides.vault.unwrap_or_else(|| under_base(VAULT_FILE)),
            network_file: overrides.network_file.unwrap_or_else(|| under_base(NETWORK_FILE)),
            config_file,
            wallet,
            mode: overrides.mode.unwrap_or(config.mode),
            decimals: config.decimals,
        })
    }

    pub fn require_wallet(&self) -> Result<Address> {
        match self.wallet {
            Some(wallet) => Ok(wallet),
            None => bail!("No wallet configured. Pass --wallet or run 'hushfund config set --wallet <address>'"),
        }
    }
}

/// Shorten a long hex string for display
pub fn abbreviate(hex: &str) -> String {
    if hex.len() <= 18 {
        return hex.to_string();
    }
    format!("{}...{}", &hex[..10], &hex[hex.len() - 6..])
}
