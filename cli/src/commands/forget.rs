//! Remove the local decryption key (recovery path)

use anyhow::{bail, Result};
use colored::Colorize;

use crate::context::Session;

pub fn run(session: &Session, yes: bool) -> Result<()> {
    let client = &session.client;
    let scope = client.scope()?;

    if !client.has_stored_key()? {
        println!("{}", format!("No decryption key stored for {}.", scope).yellow());
        return Ok(());
    }

    if !yes {
        bail!(
            "Refusing to delete the key for {} without --yes.\n\
             Balances stay on the network, but only the same key can decrypt them.",
            scope
        );
    }

    client.clear_key()?;
    println!("{}", format!("Deleted the decryption key for {}.", scope).green());
    println!("{}", "Run 'hushfund keygen' to regenerate it.".dimmed());
    Ok(())
}
