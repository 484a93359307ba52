use blindvote::{commit, Identity};

pub fn command_hash(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    // Unwraps are OK, both these args are required
    let identity = Identity::new(
        matches.value_of("name").unwrap(),
        matches.value_of("id").unwrap(),
    );

    println!("user-info-hash: {}", identity.hash_hex());
    println!("message: {}", commit(&identity));
    Ok(())
}
