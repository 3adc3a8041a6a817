//! Withdraw from the encrypted balance to the wallet

use anyhow::{bail, Result};
use colored::Colorize;

use hushfund::amount::format_units;
use hushfund::{Address, CampaignRef};

use crate::context::Session;

/// Withdraw `amount`, or the maximum that leaves the fee reserve when `None`
pub async fn run(session: &Session, amount: Option<String>, campaign: Option<String>) -> Result<()> {
    let client = &session.client;

    let amount = match amount {
        Some(amount) => amount,
        None => match client.max_withdrawal().await? {
            Some(max) if max.base_units > 0 => {
                println!("{}", format!("Withdrawing maximum: {}", max.formatted()).dimmed());
                max.formatted()
            }
            Some(_) => bail!("Nothing to withdraw - the encrypted balance is empty"),
            None => bail!("Decrypted balance is unavailable; pass --amount explicitly or register first"),
        },
    };

    let campaign = match campaign {
        Some(raw) => Some(CampaignRef::with_contract(Address::parse(&raw)?)),
        None => None,
    };

    println!("{}", format!("Withdrawing {}...", amount).cyan());

    let outcome = client.withdraw(&amount, campaign.as_ref()).await?;
    let decimals = session.decimals().await?;

    println!();
    println!("{}", "Withdrawal successful!".green().bold());
    println!("Amount:      {}", format_units(outcome.amount_base_units, decimals));
    println!("Transaction: {}", outcome.tx_hash);
    println!("Message:     {}", outcome.message.dimmed());

    if let Some(balance) = client.balance_snapshot().decrypted {
        println!("Remaining:   {}", format_units(balance, decimals).green());
    }
    Ok(())
}
