//! Mint encrypted test balance on the local network

use anyhow::Result;
use colored::Colorize;

use hushfund::amount::{format_units, parse_units};

use crate::context::Session;

pub async fn run(session: &Session, amount: &str) -> Result<()> {
    let scope = session.client.scope()?;
    let decimals = session.decimals().await?;
    let base_units = parse_units(amount, decimals)?;

    let tx_hash = session.network()?.mint(&scope, base_units).await?;

    println!("{}", "Minted encrypted balance on the local network.".green());
    println!("Amount:      {}", format_units(base_units, decimals));
    println!("Transaction: {}", tx_hash);
    Ok(())
}
