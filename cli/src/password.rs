//! Vault password handling

use anyhow::{bail, Context, Result};

use crate::config::PASSWORD_ENV;

const MIN_PASSWORD_CHARS: usize = 8;

/// Attempts at choosing a new password before giving up
const NEW_PASSWORD_ATTEMPTS: usize = 3;

/// A condition every new vault password has to meet
struct Rule {
    requirement: &'static str,
    holds: fn(&str) -> bool,
}

const RULES: &[Rule] = &[
    Rule { requirement: "at least 8 characters", holds: long_enough },
    Rule { requirement: "an uppercase letter", holds: has_upper },
    Rule { requirement: "a lowercase letter", holds: has_lower },
    Rule { requirement: "a digit", holds: has_digit },
];

fn long_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
}

fn has_upper(password: &str) -> bool {
    password.chars().any(char::is_uppercase)
}

fn has_lower(password: &str) -> bool {
    password.chars().any(char::is_lowercase)
}

fn has_digit(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_digit())
}

/// Requirements `password` misses, in the order they are listed to the user
pub fn unmet_requirements(password: &str) -> Vec<&'static str> {
    RULES
        .iter()
        .filter(|rule| !(rule.holds)(password))
        .map(|rule| rule.requirement)
        .collect()
}

/// Reject a new vault password, naming everything it lacks
pub fn validate_password_strength(password: &str) -> Result<()> {
    let unmet = unmet_requirements(password);
    if !unmet.is_empty() {
        bail!("Password needs {}", unmet.join(", "));
    }
    Ok(())
}

/// Read a password from the terminal without echoing it
pub fn prompt_password(prompt: &str) -> Result<String> {
    rpassword::prompt_password(prompt).context("Failed to read password")
}

/// Ask for a new password until it is strong enough and typed the same twice
pub fn prompt_new_password(prompt: &str) -> Result<String> {
    for _ in 0..NEW_PASSWORD_ATTEMPTS {
        let password = prompt_password(prompt)?;
        if let Err(e) = validate_password_strength(&password) {
            eprintln!("{}", e);
            continue;
        }
        if prompt_password("Confirm password: ")? != password {
            eprintln!("Passwords do not match");
            continue;
        }
        return Ok(password);
    }
    bail!("No usable password after {} attempts", NEW_PASSWORD_ATTEMPTS)
}

/// Password for the vault: `HUSHFUND_PASSWORD` if set, else an interactive prompt.
///
/// A vault that does not exist yet asks for confirmation and enforces the
/// strength rules.
pub fn vault_password(vault_exists: bool) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        if password.is_empty() {
            bail!("{} is set but empty", PASSWORD_ENV);
        }
        if !vault_exists {
            validate_password_strength(&password).context(format!("{} is too weak for a new vault", PASSWORD_ENV))?;
        }
        return Ok(password);
    }

    if vault_exists {
        prompt_password("Vault password: ")
    } else {
        let requirements: Vec<_> = RULES.iter().map(|rule| rule.requirement).collect();
        println!("Choose a password to encrypt your decryption keys.");
        println!("It needs {}.", requirements.join(", "));
        prompt_new_password("New vault password: ")
    }
}
