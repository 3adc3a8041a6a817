//! Integration tests for the hushfund CLI
//!
//! These tests drive the command handlers against a temporary vault and
//! network file, one session per simulated process:
//! - Config -> register -> faucet -> donate -> history -> withdraw
//! - Key deletion guard and regeneration

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;

    use tempfile::tempdir;

    use hushfund::adapters::file_store::{EncryptedFileKeyStore, KdfParams};
    use hushfund::{Address, Mode, RegistrationState};

    use crate::commands::donate::DonateOptions;
    use crate::commands::*;
    use crate::config::{Overrides, Settings};
    use crate::context::Session;

    const PASSWORD: &str = "Correct1Horse";
    const OWNER: &str = "0x2222222222222222222222222222222222222222";
    const DONOR: &str = "0x1111111111111111111111111111111111111111";
    const CAMPAIGN: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    fn settings(dir: &Path, wallet: &str, mode: Mode) -> Settings {
        Settings::resolve(Overrides {
            config_file: Some(dir.join("config.json")),
            vault: Some(dir.join(format!("{}.vault", &wallet[2..6]))),
            network_file: Some(dir.join("network.json")),
            wallet: Some(wallet.into()),
            mode: Some(mode),
        })
        .unwrap()
    }

    fn open(dir: &Path, wallet: &str, mode: Mode) -> Session {
        let settings = settings(dir, wallet, mode);
        let store = EncryptedFileKeyStore::open_with_params(&settings.vault, PASSWORD, KdfParams::light()).unwrap();
        Session::with_store(settings, store).unwrap()
    }

    #[tokio::test]
    async fn test_donation_round_trip_through_commands() {
        let dir = tempdir().unwrap();

        // Two decimals keep the numbers readable
        let base = settings(dir.path(), DONOR, Mode::Standalone);
        let config = configure::set(
            &base,
            configure::ConfigUpdate {
                wallet: None,
                mode: None,
                decimals: Some(2),
            },
        )
        .unwrap();
        assert_eq!(config.decimals, 2);

        let owner = open(dir.path(), OWNER, Mode::Standalone);
        assert_eq!(owner.decimals().await.unwrap(), 2);
        register::run(&owner).await.unwrap();
        drop(owner);

        let donor = open(dir.path(), DONOR, Mode::Standalone);
        register::run(&donor).await.unwrap();
        faucet::run(&donor, "10").await.unwrap();
        balance::run(&donor).await.unwrap();
        donate::run(
            &donor,
            DonateOptions {
                to: OWNER.into(),
                amount: "2.5".into(),
                message: "keep going".into(),
                campaign: Some(CAMPAIGN.into()),
                campaign_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(donor.client.balance_snapshot().decrypted, Some(750));
        drop(donor);

        let owner = open(dir.path(), OWNER, Mode::Standalone);
        history::run(&owner, CAMPAIGN, false).await.unwrap();
        let records = owner.client.history(Address::parse(CAMPAIGN).unwrap()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "keep going");
        assert_eq!(records[0].donor, DONOR);

        // Withdrawing without an amount takes the maximum, leaving one base unit
        withdraw::run(&owner, None, Some(CAMPAIGN.into())).await.unwrap();
        assert_eq!(owner.client.decrypted_balance().await.unwrap(), Some(1));
    }

    #[test]
    fn test_config_set_rejects_unrepresentable_decimals() {
        let dir = tempdir().unwrap();
        let base = settings(dir.path(), DONOR, Mode::Standalone);
        let update = |decimals| configure::ConfigUpdate {
            wallet: None,
            mode: None,
            decimals: Some(decimals),
        };

        assert!(configure::set(&base, update(41)).is_err());
        assert!(!base.config_file.exists());
        assert_eq!(configure::set(&base, update(38)).unwrap().decimals, 38);
    }

    #[tokio::test]
    async fn test_donate_requires_registration() {
        let dir = tempdir().unwrap();
        let donor = open(dir.path(), DONOR, Mode::Standalone);

        let result = donate::run(
            &donor,
            DonateOptions {
                to: OWNER.into(),
                amount: "1".into(),
                message: String::new(),
                campaign: None,
                campaign_id: Some("roof".into()),
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_forget_requires_confirmation() {
        let dir = tempdir().unwrap();
        let session = open(dir.path(), DONOR, Mode::Converter);
        keygen::run(&session, false).await.unwrap();
        assert!(session.client.has_stored_key().unwrap());

        // A second keygen without --force refuses to overwrite
        assert!(keygen::run(&session, false).await.is_err());

        assert!(forget::run(&session, false).is_err());
        assert!(session.client.has_stored_key().unwrap());

        forget::run(&session, true).unwrap();
        assert!(!session.client.has_stored_key().unwrap());
        assert_eq!(
            session.client.registration_state().await.unwrap(),
            RegistrationState::KeyMissing
        );
    }

    #[tokio::test]
    async fn test_forced_keygen_refused_once_registered() {
        let dir = tempdir().unwrap();
        let session = open(dir.path(), DONOR, Mode::Converter);
        register::run(&session).await.unwrap();
        assert!(keygen::run(&session, true).await.is_err());
        assert!(session.client.has_stored_key().unwrap());
    }

    #[tokio::test]
    async fn test_deposit_in_converter_mode() {
        let dir = tempdir().unwrap();
        let session = open(dir.path(), DONOR, Mode::Converter);
        register::run(&session).await.unwrap();
        deposit::run(&session, "1").await.unwrap();
        assert_eq!(
            session.client.decrypted_balance().await.unwrap(),
            Some(10u128.pow(crate::config::DEFAULT_DECIMALS as u32))
        );

        let standalone = open(dir.path(), OWNER, Mode::Standalone);
        register::run(&standalone).await.unwrap();
        assert!(deposit::run(&standalone, "1").await.is_err());
    }

    #[tokio::test]
    async fn test_info_without_session() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path(), DONOR, Mode::Standalone);
        info::run(&settings, None).await.unwrap();

        let session = open(dir.path(), DONOR, Mode::Standalone);
        info::run(&settings, Some(&session)).await.unwrap();
    }
}
