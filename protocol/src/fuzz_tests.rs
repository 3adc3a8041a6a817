//! Property-based tests for the message codec and amount parsing
//!
//! Properties tested:
//! - Donation round-trip: campaign and text survive encode/decode, colons included
//! - Blank text always decodes as the anonymous placeholder
//! - Decoding never panics and falls back to the raw text
//! - Amount parsing agrees with formatting and never accepts zero

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use crate::amount::{format_units, max_withdrawal, parse_units};
    use crate::codec::{classify, decode_donation, decode_withdrawal, encode_donation, MessageKind, ANONYMOUS_DONATION};

    // Campaign identifiers never contain the separator
    fn campaign_id() -> impl Strategy<Value = String> {
        "[A-Za-z0-9x_-]{0,48}"
    }

    fn visible_text() -> impl Strategy<Value = String> {
        "[ -~]{0,120}".prop_filter("non-blank", |t| !t.trim().is_empty())
    }

    proptest! {
        /// Property: donation messages round-trip
        #[test]
        fn prop_donation_roundtrip(campaign in campaign_id(), text in visible_text()) {
            let decoded = decode_donation(&encode_donation(&campaign, &text));
            prop_assert_eq!(decoded.campaign_address, Some(campaign));
            prop_assert_eq!(decoded.text, text);
        }

        /// Property: blank text decodes as the anonymous placeholder
        #[test]
        fn prop_blank_text_is_anonymous(campaign in campaign_id(), blank in "[ \t\n]{0,8}") {
            let decoded = decode_donation(&encode_donation(&campaign, &blank));
            prop_assert_eq!(decoded.text, ANONYMOUS_DONATION);
        }

        /// Property: decoding arbitrary input never panics
        #[test]
        fn prop_decode_is_total(raw in any::<String>()) {
            let decoded = decode_donation(&raw);
            if decoded.campaign_address.is_none() {
                prop_assert_eq!(&decoded.text, &raw);
            }
            let _ = decode_withdrawal(&raw);
            let _ = classify(&raw);
        }

        /// Property: anything without the donation tag is unstructured or a withdrawal
        #[test]
        fn prop_untagged_is_not_a_donation(raw in "[a-z :]{0,40}") {
            prop_assert!(!matches!(classify(&raw), MessageKind::Donation(_)));
        }

        /// Property: formatting then parsing base units is the identity
        #[test]
        fn prop_amount_format_parse(units in 1u128..=u64::MAX as u128, decimals in 0u8..=18) {
            let rendered = format_units(units, decimals);
            prop_assert_eq!(parse_units(&rendered, decimals).unwrap(), units);
        }

        /// Property: max withdrawal never exceeds the balance
        #[test]
        fn prop_max_withdrawal_bounded(balance in any::<u64>(), decimals in 0u8..=18) {
            let max = max_withdrawal(balance as u128, decimals);
            prop_assert!(max <= balance as u128);
        }

        /// Property: negative and zero amounts are always rejected
        #[test]
        fn prop_non_positive_rejected(whole in "[0-9]{1,6}", decimals in 0u8..=18) {
            let negative = format!("-{whole}");
            prop_assert!(parse_units(&negative, decimals).is_err());
            let zeros = "0".repeat(whole.len());
            prop_assert!(parse_units(&zeros, decimals).is_err());
        }
    }
}
