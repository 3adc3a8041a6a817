//! Decrypt and list the donations registered with a campaign

use anyhow::Result;
use chrono::{TimeZone, Utc};
use colored::Colorize;

use hushfund::{Address, DonationRecord};

use crate::config::abbreviate;
use crate::context::Session;

pub async fn run(session: &Session, campaign: &str, json: bool) -> Result<()> {
    let campaign = Address::parse(campaign)?;
    let records = session.client.history(campaign).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Donations to {}", campaign).yellow().bold());
    println!();

    if records.is_empty() {
        println!("{}", "No donations registered yet.".dimmed());
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }

    let unreadable = records.iter().filter(|r| r.is_degraded()).count();
    println!();
    println!("Total: {} donation(s)", records.len());
    if unreadable > 0 {
        println!(
            "{}",
            format!("{} could not be decrypted with this wallet's key.", unreadable).yellow()
        );
    }
    Ok(())
}

fn print_record(record: &DonationRecord) {
    let when = match Utc.timestamp_opt(record.timestamp, 0).single() {
        Some(time) if record.timestamp > 0 => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => "unknown time".to_string(),
    };

    let tx = abbreviate(&record.tx_hash.to_string());
    if record.is_degraded() {
        println!("  {}  {}  {}", when.dimmed(), tx, record.message.red());
    } else {
        println!("  {}  {}  from {}", when.dimmed(), tx, abbreviate(&record.donor).cyan());
        println!("      {}", record.message);
    }
}
