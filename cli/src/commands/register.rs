//! Register the decryption key on the privacy network

use anyhow::Result;
use colored::Colorize;

use crate::context::Session;

pub async fn run(session: &Session) -> Result<()> {
    let client = &session.client;
    let scope = client.scope()?;

    println!("{}", format!("Registering {} on the privacy network...", scope).cyan());

    let outcome = client.register().await?;

    if outcome.generated_key {
        println!("{}", "Generated a new decryption key for this scope.".dimmed());
    }

    match outcome.tx_hash {
        Some(tx_hash) => {
            println!();
            println!("{}", "Registration successful!".green().bold());
            println!("Transaction: {}", tx_hash);
        }
        None => {
            println!();
            println!("{}", "Already registered - nothing to submit.".yellow());
        }
    }

    println!("State: {}", client.registration_state().await?);
    Ok(())
}
