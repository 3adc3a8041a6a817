//! Generate and store the decryption key for the active wallet and mode

use anyhow::{bail, Result};
use colored::Colorize;

use hushfund::ProtocolError;

use crate::config::abbreviate;
use crate::context::Session;

pub async fn run(session: &Session, force: bool) -> Result<()> {
    let client = &session.client;
    let scope = client.scope()?;

    if client.has_stored_key()? {
        if !force {
            bail!(
                "A decryption key already exists for {}. Use --force to replace it.\n\
                 Warning: a replaced key cannot decrypt balances encrypted for the old one!",
                scope
            );
        }
        if client.is_registered().await? {
            return Err(ProtocolError::AlreadyRegistered(scope).into());
        }
        client.clear_key()?;
    }

    println!("{}", "=== hushfund Key Generation ===".cyan().bold());
    println!();
    println!("{}", format!("Generating decryption key for {}...", scope).cyan());

    let key = client.generate_key().await?;

    println!();
    println!("{}", "Decryption key generated and encrypted successfully!".green().bold());
    println!();
    println!("{}:", "Scope".yellow());
    println!("  {}", scope);
    println!("{}:", "Key (abbreviated)".yellow());
    println!("  {}", abbreviate(&hex::encode(key.expose().as_bytes())));
    println!();
    println!(
        "{}",
        format!("Stored in vault: {}", session.settings.vault.display()).dimmed()
    );
    println!();
    println!("{}", "Next: run 'hushfund register' to register it on the network.".dimmed());

    Ok(())
}
