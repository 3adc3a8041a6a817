//! Show the encrypted and decrypted balance of the active scope

use anyhow::Result;
use colored::Colorize;

use hushfund::amount::format_units;

use crate::config::abbreviate;
use crate::context::Session;

pub async fn run(session: &Session) -> Result<()> {
    let client = &session.client;
    let scope = client.scope()?;
    let state = client.registration_state().await?;

    println!("{}", format!("Reading balance for {}...", scope).cyan());

    if !client.is_registered().await? {
        println!();
        println!("{}", "Not registered - no encrypted balance yet.".yellow());
        println!("{}", "Run 'hushfund register' first.".dimmed());
        return Ok(());
    }

    let snapshot = client.refresh_balance().await?;
    let decimals = snapshot.decimals.unwrap_or(session.settings.decimals);

    println!();
    println!("{}", "Balance Summary".yellow().bold());
    println!();

    match &snapshot.encrypted {
        Some(encrypted) => {
            println!("{}:", "Encrypted".cyan());
            for word in &encrypted.ciphertext {
                println!("  {}", abbreviate(word));
            }
        }
        None => println!("{}: {}", "Encrypted".cyan(), "unavailable".red()),
    }
    println!();

    match snapshot.decrypted {
        Some(value) => {
            println!("Decrypted: {}", format_units(value, decimals).green());
            if let Some(max) = client.max_withdrawal().await? {
                println!("Max withdrawal: {}", max.formatted());
            }
        }
        None if state.is_ready() => {
            println!("Decrypted: {}", "unable to decrypt".red());
        }
        None => {
            println!("Decrypted: {} ({})", "locked".yellow(), state);
        }
    }

    if let Some(reason) = snapshot.last_error {
        println!();
        println!("{}", reason.dimmed());
    }

    Ok(())
}
