//! hushfund CLI - private donations over an encrypted-balance token

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hushfund::Mode;

mod commands;
mod config;
mod context;
mod password;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod integration_tests;

use commands::*;
use config::{Overrides, Settings};
use context::Session;

#[derive(Parser)]
#[command(name = "hushfund")]
#[command(version = "0.1.0")]
#[command(about = "Private donations - amounts stay encrypted, campaigns still get credit")]
#[command(long_about = r#"
hushfund lets a wallet donate to campaigns while the amount stays encrypted.
Only the donor and the recipient can decrypt it; the campaign still sees
which transactions were donated to it.

Quick Start:
  1. hushfund config set --wallet 0x...   Choose your wallet
  2. hushfund register                   Generate and register your key
  3. hushfund faucet --amount 100        Get encrypted test funds
  4. hushfund donate --to 0x... --amount 5 --campaign 0x...
  5. hushfund history --campaign 0x...   Read the donations (campaign owner)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Wallet address (overrides config.json)
    #[arg(long, global = true)]
    wallet: Option<String>,

    /// Privacy mode: standalone or converter (overrides config.json)
    #[arg(long, global = true)]
    mode: Option<Mode>,

    /// Path to the encrypted key vault
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Path to the local network state file
    #[arg(long, global = true)]
    network_file: Option<PathBuf>,

    /// Path to config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the decryption key for the wallet and mode
    Keygen {
        /// Replace an existing, unregistered key
        #[arg(short, long)]
        force: bool,
    },

    /// Register the decryption key (generates one if missing)
    Register,

    /// Show encrypted and decrypted balance
    Balance,

    /// Mint encrypted test funds on the local network
    Faucet {
        #[arg(short, long)]
        amount: String,
    },

    /// Move public tokens into the encrypted balance (converter mode)
    Deposit {
        #[arg(short, long)]
        amount: String,
    },

    /// Donate privately to a campaign
    Donate {
        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount in whole tokens, e.g. 1.5
        #[arg(short, long)]
        amount: String,

        /// Message for the recipient (encrypted)
        #[arg(short, long, default_value = "")]
        message: String,

        /// Campaign contract address to link the donation to
        #[arg(short, long, conflicts_with = "campaign_id")]
        campaign: Option<String>,

        /// Campaign identifier when the campaign has no contract
        #[arg(long)]
        campaign_id: Option<String>,
    },

    /// Withdraw from the encrypted balance to the wallet
    Withdraw {
        /// Amount to withdraw (default: maximum leaving the fee reserve)
        #[arg(short, long)]
        amount: Option<String>,

        /// Campaign the withdrawal is booked against
        #[arg(short, long)]
        campaign: Option<String>,
    },

    /// Decrypt the donations registered with a campaign
    History {
        /// Campaign contract address
        #[arg(short, long)]
        campaign: String,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the local decryption key
    Forget {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show configuration and registration info
    Info,

    /// Show or change persisted defaults
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print config.json
    Show,

    /// Update config.json
    Set {
        #[arg(long)]
        wallet: Option<String>,

        #[arg(long)]
        mode: Option<Mode>,

        /// Token decimals used when creating a new network file
        #[arg(long)]
        decimals: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(Overrides {
        config_file: cli.config,
        vault: cli.vault,
        network_file: cli.network_file,
        wallet: cli.wallet,
        mode: cli.mode,
    })?;

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => configure::show(&settings)?,
            ConfigAction::Set { wallet, mode, decimals } => {
                configure::set(&settings, configure::ConfigUpdate { wallet, mode, decimals })?;
            }
        },
        Commands::Info => {
            let session = if settings.vault.exists() {
                Some(open_session(&settings)?)
            } else {
                None
            };
            info::run(&settings, session.as_ref()).await?;
        }
        command => {
            settings.require_wallet()?;
            let session = open_session(&settings)?;
            run(&session, command).await?;
        }
    }

    Ok(())
}

fn open_session(settings: &Settings) -> Result<Session> {
    let password = password::vault_password(settings.vault.exists())?;
    Session::open(settings.clone(), &password)
}

async fn run(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Keygen { force } => keygen::run(session, force).await,
        Commands::Register => register::run(session).await,
        Commands::Balance => balance::run(session).await,
        Commands::Faucet { amount } => faucet::run(session, &amount).await,
        Commands::Deposit { amount } => deposit::run(session, &amount).await,
        Commands::Donate { to, amount, message, campaign, campaign_id } => {
            donate::run(
                session,
                donate::DonateOptions {
                    to,
                    amount,
                    message,
                    campaign,
                    campaign_id,
                },
            )
            .await
        }
        Commands::Withdraw { amount, campaign } => withdraw::run(session, amount, campaign).await,
        Commands::History { campaign, json } => history::run(session, &campaign, json).await,
        Commands::Forget { yes } => forget::run(session, yes),
        Commands::Info | Commands::Config { .. } => bail!("this command does not open a session"),
    }
}
