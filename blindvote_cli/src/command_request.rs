use super::{authority, expand};
use anyhow::{anyhow, Context};
use blindvote::{request_credential, Config, Credential, CredentialKind, Identity, KeyCache};
use blindvote::{Authority, PublicKey};
use std::fs::File;
use std::io::prelude::*;

pub fn command_request(matches: &clap::ArgMatches, config: &Config) -> anyhow::Result<()> {
    // Unwraps are OK, both these args are required
    let voter_id = matches.value_of("id").unwrap();
    let voter_name = matches.value_of("name").unwrap();

    let kind: CredentialKind = match matches.value_of("credential") {
        Some(kind) => kind.parse()?,
        None => config.credential,
    };

    let authority = authority(config)?;
    let keys = KeyCache::new();

    if let Some(path) = matches.value_of("pubkey") {
        let path = expand(path)?;
        let key = PublicKey::from_pem_file(&path)?;
        tracing::info!(%path, bits = key.bits(), "using local public key");
        keys.preload(authority.url(), key);
    }

    let identity = Identity::new(voter_name, voter_id);
    let user_info_hash = identity.hash_hex();

    let credential = request_credential(&authority, &keys, identity, kind).map_err(|failure| {
        tracing::debug!(step = %failure.step, error = %failure.error, "credential request failed");
        match failure.http_status() {
            Some(status) => anyhow!("could not obtain a credential (HTTP {})", status),
            None => anyhow!("could not obtain a credential"),
        }
    })?;

    match &credential {
        Credential::AccountAddress { account_address } => {
            println!("account-address: {}", account_address)
        }
        Credential::SigningKey { private_key } => println!("private-key: {}", private_key),
        Credential::EligibilityToken { message, signature } => {
            println!("message: {}", message);
            println!("signature: {}", signature);
        }
    }

    if matches.is_present("save") {
        let location = format!("{}_account.json", voter_name);
        save(&location, &credential, &user_info_hash)?;
        println!("saved: {}", location);
    }

    Ok(())
}

fn save(location: &str, credential: &Credential, user_info_hash: &str) -> anyhow::Result<()> {
    let mut record = serde_json::to_value(credential)?;
    record
        .as_object_mut()
        .ok_or_else(|| anyhow!("credential is not a JSON object"))?
        .insert("user_info_hash".to_owned(), user_info_hash.into());

    let mut file =
        File::create(location).with_context(|| format!("cannot create file {}", location))?;
    file.write_all(serde_json::to_string_pretty(&record)?.as_bytes())
        .with_context(|| format!("unable to write credential to {}", location))?;
    Ok(())
}
