use super::{authority, expand};
use blindvote::{resolve, Config, PublicKey};

pub fn command_pubkey(matches: &clap::ArgMatches, config: &Config) -> anyhow::Result<()> {
    let key = match matches.value_of("pubkey") {
        Some(path) => PublicKey::from_pem_file(expand(path)?)?,
        None => resolve(&authority(config)?)?,
    };

    println!("bits: {}", key.bits());
    println!("n: {}", key.n);
    println!("e: {}", key.e);
    Ok(())
}
