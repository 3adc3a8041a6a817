//! Wire format of messages carried inside the encrypted transfer channel
//!
//! ```text
//! DONATION:<campaignAddress>:<freeText>
//! WITHDRAWAL:<campaignAddress>
//! WITHDRAWAL
//! ```
//!
//! Decoding never fails. Messages come out of a decrypted channel, so anything
//! that does not match the schema is kept as unstructured text.

const DONATION_TAG: &str = "DONATION";
const WITHDRAWAL_TAG: &str = "WITHDRAWAL";
const SEPARATOR: char = ':';

/// Text substituted when the donor leaves the message blank
pub const ANONYMOUS_DONATION: &str = "Anonymous donation";

/// A donation message after decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDonation {
    /// `None` when the raw message was not a structured donation
    pub campaign_address: Option<String>,
    pub text: String,
}

/// Coarse classification of a decrypted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Donation(DecodedDonation),
    Withdrawal { campaign_address: Option<String> },
    Unstructured(String),
}

pub fn encode_donation(campaign_address: &str, user_text: &str) -> String {
    let text = if user_text.trim().is_empty() {
        ANONYMOUS_DONATION
    } else {
        user_text
    };
    format!("{DONATION_TAG}{SEPARATOR}{campaign_address}{SEPARATOR}{text}")
}

pub fn decode_donation(raw: &str) -> DecodedDonation {
    let mut parts = raw.splitn(3, SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(DONATION_TAG), Some(campaign), Some(text)) => DecodedDonation {
            campaign_address: Some(campaign.to_string()),
            text: text.to_string(),
        },
        _ => DecodedDonation {
            campaign_address: None,
            text: raw.to_string(),
        },
    }
}

pub fn encode_withdrawal(campaign_address: Option<&str>) -> String {
    match campaign_address {
        Some(campaign) => format!("{WITHDRAWAL_TAG}{SEPARATOR}{campaign}"),
        None => WITHDRAWAL_TAG.to_string(),
    }
}

/// `Some(campaign)` for a withdrawal message, `None` for anything else
pub fn decode_withdrawal(raw: &str) -> Option<Option<String>> {
    if raw == WITHDRAWAL_TAG {
        return Some(None);
    }
    raw.strip_prefix(WITHDRAWAL_TAG)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .map(|campaign| Some(campaign.to_string()))
}

pub fn classify(raw: &str) -> MessageKind {
    let donation = decode_donation(raw);
    if donation.campaign_address.is_some() {
        return MessageKind::Donation(donation);
    }
    match decode_withdrawal(raw) {
        Some(campaign_address) => MessageKind::Withdrawal { campaign_address },
        None => MessageKind::Unstructured(raw.to_string()),
    }
}
