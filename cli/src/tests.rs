//! Tests for the hushfund CLI
//!
//! Tests cover:
//! - Password strength rules
//! - Settings resolution (flags over config.json over defaults)
//! - Argument parsing

#[cfg(test)]
mod password_tests {
    use crate::password::{unmet_requirements, validate_password_strength};

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Short1").is_err());
        assert!(validate_password_strength("alllowercase1").is_err());
        assert!(validate_password_strength("ALLUPPERCASE1").is_err());
        assert!(validate_password_strength("NoDigitsHere").is_err());
        assert!(validate_password_strength("Correct1Horse").is_ok());
    }

    #[test]
    fn test_every_unmet_requirement_is_reported() {
        assert_eq!(
            unmet_requirements("abc"),
            vec!["at least 8 characters", "an uppercase letter", "a digit"]
        );
        assert!(unmet_requirements("Correct1Horse").is_empty());

        let message = validate_password_strength("lowercase").unwrap_err().to_string();
        assert!(message.contains("an uppercase letter"));
        assert!(message.contains("a digit"));
        assert!(!message.contains("8 characters"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // Seven characters, more than eight bytes
        assert_eq!(unmet_requirements("Ünïcö1d"), vec!["at least 8 characters"]);
    }
}

#[cfg(test)]
mod config_tests {
    use std::path::Path;

    use tempfile::tempdir;

    use hushfund::{Address, Mode};

    use crate::config::{abbreviate, CliConfig, Overrides, Settings, DEFAULT_DECIMALS};

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const OTHER: &str = "0x2222222222222222222222222222222222222222";

    fn overrides(dir: &Path) -> Overrides {
        Overrides {
            config_file: Some(dir.join("config.json")),
            vault: Some(dir.join("keys.vault")),
            network_file: Some(dir.join("network.json")),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_config_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.mode, Mode::Standalone);
        assert_eq!(config.decimals, DEFAULT_DECIMALS);
        assert!(config.wallet.is_none());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = CliConfig {
            wallet: Some(Address::parse(WALLET).unwrap()),
            mode: Mode::Converter,
            decimals: 6,
        };
        config.save(&path).unwrap();
        assert_eq!(CliConfig::load(&path).unwrap(), config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, format!(r#"{{"wallet":"{}"}}"#, WALLET)).unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.wallet, Some(Address::parse(WALLET).unwrap()));
        assert_eq!(config.mode, Mode::Standalone);
        assert_eq!(config.decimals, DEFAULT_DECIMALS);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }

    #[test]
    fn test_oversized_decimals_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"decimals":39}"#).unwrap();
        assert!(CliConfig::load(&path).is_err());

        std::fs::write(&path, r#"{"decimals":38}"#).unwrap();
        assert_eq!(CliConfig::load(&path).unwrap().decimals, 38);
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempdir().unwrap();
        CliConfig {
            wallet: Some(Address::parse(WALLET).unwrap()),
            mode: Mode::Standalone,
            decimals: 2,
        }
        .save(&dir.path().join("config.json"))
        .unwrap();

        let from_config = Settings::resolve(overrides(dir.path())).unwrap();
        assert_eq!(from_config.wallet, Some(Address::parse(WALLET).unwrap()));
        assert_eq!(from_config.mode, Mode::Standalone);
        assert_eq!(from_config.decimals, 2);

        let flagged = Settings::resolve(Overrides {
            wallet: Some(OTHER.into()),
            mode: Some(Mode::Converter),
            ..overrides(dir.path())
        })
        .unwrap();
        assert_eq!(flagged.wallet, Some(Address::parse(OTHER).unwrap()));
        assert_eq!(flagged.mode, Mode::Converter);
        assert_eq!(flagged.vault, dir.path().join("keys.vault"));
        assert_eq!(flagged.network_file, dir.path().join("network.json"));
    }

    #[test]
    fn test_invalid_wallet_flag_rejected() {
        let dir = tempdir().unwrap();
        let result = Settings::resolve(Overrides {
            wallet: Some("0x1234".into()),
            ..overrides(dir.path())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_require_wallet() {
        let dir = tempdir().unwrap();
        let settings = Settings::resolve(overrides(dir.path())).unwrap();
        assert!(settings.require_wallet().is_err());

        let settings = Settings::resolve(Overrides {
            wallet: Some(WALLET.into()),
            ..overrides(dir.path())
        })
        .unwrap();
        assert_eq!(settings.require_wallet().unwrap(), Address::parse(WALLET).unwrap());
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("0x1234"), "0x1234");
        assert_eq!(abbreviate(WALLET), "0x11111111...111111");
    }
}

#[cfg(test)]
mod args_tests {
    use clap::Parser;

    use hushfund::{Address, CampaignRef, Mode};

    use crate::commands::donate::DonateOptions;
    use crate::{Cli, Commands};

    const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";
    const CAMPAIGN: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hushfund", "balance", "--mode", "converter", "--wallet", RECIPIENT]).unwrap();
        assert_eq!(cli.mode, Some(Mode::Converter));
        assert_eq!(cli.wallet.as_deref(), Some(RECIPIENT));
        assert!(matches!(cli.command, Commands::Balance));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["hushfund", "balance", "--mode", "shielded"]).is_err());
    }

    #[test]
    fn test_donate_arguments() {
        let cli = Cli::try_parse_from([
            "hushfund", "donate", "--to", RECIPIENT, "--amount", "1.5", "--campaign", CAMPAIGN,
        ])
        .unwrap();
        match cli.command {
            Commands::Donate { to, amount, message, campaign, campaign_id } => {
                assert_eq!(to, RECIPIENT);
                assert_eq!(amount, "1.5");
                assert_eq!(message, "");
                assert_eq!(campaign.as_deref(), Some(CAMPAIGN));
                assert!(campaign_id.is_none());
            }
            _ => panic!("expected donate"),
        }
    }

    #[test]
    fn test_campaign_and_campaign_id_conflict() {
        let result = Cli::try_parse_from([
            "hushfund", "donate", "--to", RECIPIENT, "--amount", "1", "--campaign", CAMPAIGN, "--campaign-id", "roof",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_withdraw_amount_is_optional() {
        let cli = Cli::try_parse_from(["hushfund", "withdraw"]).unwrap();
        assert!(matches!(cli.command, Commands::Withdraw { amount: None, campaign: None }));
    }

    fn options(campaign: Option<&str>, campaign_id: Option<&str>) -> DonateOptions {
        DonateOptions {
            to: RECIPIENT.into(),
            amount: "1".into(),
            message: String::new(),
            campaign: campaign.map(String::from),
            campaign_id: campaign_id.map(String::from),
        }
    }

    #[test]
    fn test_campaign_ref_selection() {
        let contract = options(Some(CAMPAIGN), None).campaign_ref().unwrap();
        assert_eq!(contract, CampaignRef::with_contract(Address::parse(CAMPAIGN).unwrap()));

        let id = options(None, Some("roof")).campaign_ref().unwrap();
        assert_eq!(id, CampaignRef::with_id("roof"));

        // Without either, the recipient stands in for the campaign
        let fallback = options(None, None).campaign_ref().unwrap();
        assert_eq!(fallback.message_address(), RECIPIENT);

        assert!(options(Some("not-an-address"), None).campaign_ref().is_err());
    }
}
