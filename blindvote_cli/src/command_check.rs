use super::authority;
use anyhow::anyhow;
use blindvote::serde_decimal::parse_decimal;
use blindvote::{check_eligibility, Config};

pub fn command_check(matches: &clap::ArgMatches, config: &Config) -> anyhow::Result<()> {
    // Unwraps are OK, both these args are required
    let message = matches.value_of("message").unwrap();
    let signature = matches.value_of("signature").unwrap();

    let message = parse_decimal(message).map_err(|e| anyhow!("invalid message: {}", e))?;
    let signature = parse_decimal(signature).map_err(|e| anyhow!("invalid signature: {}", e))?;

    let authority = authority(config)?;
    if check_eligibility(&authority, &message, &signature)? {
        println!("eligible");
    } else {
        println!("not eligible");
    }
    Ok(())
}
