//! Donate privately to a campaign

use anyhow::Result;
use colored::Colorize;

use hushfund::amount::format_units;
use hushfund::{Address, CampaignRef, DonationRequest, LinkageStatus};

use crate::context::Session;

/// Options for a donation
pub struct DonateOptions {
    /// Campaign recipient address
    pub to: String,
    pub amount: String,
    pub message: String,
    /// Campaign contract address, when deployed
    pub campaign: Option<String>,
    /// Campaign identifier, used when there is no contract
    pub campaign_id: Option<String>,
}

impl DonateOptions {
    pub fn campaign_ref(&self) -> Result<CampaignRef> {
        Ok(match (&self.campaign, &self.campaign_id) {
            (Some(contract), _) => CampaignRef::with_contract(Address::parse(contract)?),
            (None, Some(id)) => CampaignRef::with_id(id.clone()),
            (None, None) => CampaignRef::with_id(self.to.clone()),
        })
    }
}

pub async fn run(session: &Session, options: DonateOptions) -> Result<()> {
    let client = &session.client;
    let campaign = options.campaign_ref()?;

    println!("{}", "=== hushfund Private Donation ===".cyan().bold());
    println!();
    println!("To:       {}", options.to);
    println!("Amount:   {}", options.amount);
    println!("Campaign: {}", campaign.message_address());
    println!();
    println!("{}", "Submitting encrypted transfer...".cyan());

    let outcome = client
        .donate(DonationRequest {
            recipient: options.to,
            amount: options.amount,
            message: options.message,
            campaign,
        })
        .await?;

    let decimals = session.decimals().await?;

    println!();
    println!("{}", "Donation successful!".green().bold());
    println!("Amount:      {}", format_units(outcome.amount_base_units, decimals));
    println!("Transaction: {}", outcome.tx_hash());

    match &outcome.linkage {
        LinkageStatus::Linked(receipt) => println!("Linked:      {}", receipt),
        LinkageStatus::Skipped => println!("{}", "No campaign contract - linkage skipped.".dimmed()),
        LinkageStatus::Failed(_) => {}
    }
    if let Some(warning) = outcome.linkage_warning() {
        println!();
        println!("{}", format!("Warning: {}", warning).yellow());
        println!("{}", "The donation went through but is not listed on the campaign.".yellow());
    }

    if let Some(balance) = client.balance_snapshot().decrypted {
        println!();
        println!("Remaining balance: {}", format_units(balance, decimals).green());
    }
    Ok(())
}
