//! Show configuration and key info

use anyhow::Result;
use colored::Colorize;

use crate::config::Settings;
use crate::context::Session;

pub async fn run(settings: &Settings, session: Option<&Session>) -> Result<()> {
    println!();
    println!("{}", "hushfund Configuration".yellow().bold());
    println!();

    println!("{}:", "Wallet".cyan());
    match settings.wallet {
        Some(wallet) => println!("  {}", wallet),
        None => println!("  {}", "NOT CONFIGURED".red()),
    }
    println!();

    println!("{}:", "Mode".cyan());
    println!("  {}", settings.mode);
    println!();

    if let Some(session) = session {
        let client = &session.client;
        println!("{}:", "Registration".cyan());
        match client.scope() {
            Ok(scope) => {
                let state = client.registration_state().await?;
                let label = if state.is_ready() {
                    state.to_string().green()
                } else {
                    state.to_string().yellow()
                };
                println!("  {}: {}", scope, label);
            }
            Err(_) => println!("  {}", "no wallet".dimmed()),
        }
        println!();

        println!("{}:", "Network".cyan());
        println!("  Token decimals: {}", session.decimals().await?);
        println!();
    }

    println!("{}:", "File Locations".cyan());
    println!("  Config:  {}", settings.config_file.display());
    println!("  Vault:   {}", settings.vault.display());
    println!("  Network: {}", settings.network_file.display());

    Ok(())
}
