//! Convert public tokens into encrypted balance (converter mode)

use anyhow::Result;
use colored::Colorize;

use hushfund::amount::format_units;

use crate::context::Session;

pub async fn run(session: &Session, amount: &str) -> Result<()> {
    let client = &session.client;

    println!("{}", format!("Depositing {} into the encrypted balance...", amount).cyan());

    let outcome = client.deposit(amount).await?;
    let decimals = session.decimals().await?;

    println!();
    println!("{}", "Deposit successful!".green().bold());
    println!("Amount:      {}", format_units(outcome.amount_base_units, decimals));
    println!("Transaction: {}", outcome.tx_hash);

    if let Some(balance) = client.balance_snapshot().decrypted {
        println!("Balance:     {}", format_units(balance, decimals).green());
    }
    Ok(())
}
