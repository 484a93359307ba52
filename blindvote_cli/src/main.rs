use blindvote::{Config, HttpAuthority};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use tracing_subscriber::EnvFilter;

mod command_check;
mod command_hash;
mod command_health;
mod command_pubkey;
mod command_request;

use command_check::command_check;
use command_hash::command_hash;
use command_health::command_health;
use command_pubkey::command_pubkey;
use command_request::command_request;

fn main() {
    let matches = App::new("BlindVote CLI")
        .version("0.1")
        .about("Requests anonymous voter credentials from a blind-signing authority")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("uri")
                .long("uri")
                .takes_value(true)
                .global(true)
                .help("Set the authority uri - can also be set with BLINDVOTE_URI"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .takes_value(true)
                .global(true)
                .help("HTTP timeout in seconds - can also be set with BLINDVOTE_TIMEOUT_SECS"),
        )
        .arg(
            Arg::with_name("log-format")
                .long("log-format")
                .takes_value(true)
                .possible_values(&["text", "json"])
                .default_value("text")
                .global(true)
                .help("Log output format"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("request")
                .about("Request an anonymous credential for a voter")
                .arg(
                    Arg::with_name("id")
                        .long("id")
                        .takes_value(true)
                        .required(true)
                        .help("Voter id"),
                )
                .arg(
                    Arg::with_name("name")
                        .long("name")
                        .takes_value(true)
                        .required(true)
                        .help("Voter name"),
                )
                .arg(
                    Arg::with_name("pubkey")
                        .long("pubkey")
                        .takes_value(true)
                        .help("Use a local PEM public key instead of fetching it"),
                )
                .arg(
                    Arg::with_name("credential")
                        .long("credential")
                        .takes_value(true)
                        .possible_values(&["account", "signing-key", "token"])
                        .help("Credential to request - can also be set with BLINDVOTE_CREDENTIAL"),
                )
                .arg(
                    Arg::with_name("save")
                        .long("save")
                        .help("Save the credential to {name}_account.json"),
                ),
        )
        .subcommand(
            SubCommand::with_name("check")
                .about("Check whether a message and signature can still be used")
                .arg(
                    Arg::with_name("message")
                        .long("message")
                        .takes_value(true)
                        .required(true)
                        .help("Message as a decimal integer"),
                )
                .arg(
                    Arg::with_name("signature")
                        .long("signature")
                        .takes_value(true)
                        .required(true)
                        .help("Signature as a decimal integer"),
                ),
        )
        .subcommand(
            SubCommand::with_name("pubkey")
                .about("Fetch and print the authority's public key")
                .arg(
                    Arg::with_name("pubkey")
                        .long("pubkey")
                        .takes_value(true)
                        .help("Decode a local PEM file instead of fetching"),
                ),
        )
        .subcommand(
            SubCommand::with_name("hash")
                .about("Print the identity hash for a voter")
                .arg(
                    Arg::with_name("id")
                        .long("id")
                        .takes_value(true)
                        .required(true)
                        .help("Voter id"),
                )
                .arg(
                    Arg::with_name("name")
                        .long("name")
                        .takes_value(true)
                        .required(true)
                        .help("Voter name"),
                ),
        )
        .subcommand(SubCommand::with_name("health").about("Check that the authority is up"))
        .get_matches();

    init_tracing(
        matches.occurrences_of("v"),
        matches.value_of("log-format").unwrap_or("text"),
    );

    if let Err(e) = run(&matches) {
        tracing::debug!(error = ?e, "command failed");
        let message = e.to_string();
        if message.starts_with("blindvote:") {
            eprintln!("{}", message);
        } else {
            eprintln!("blindvote: {}", message);
        }
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = config(matches)?;

    match matches.subcommand() {
        ("request", Some(matches)) => command_request(matches, &config),
        ("check", Some(matches)) => command_check(matches, &config),
        ("pubkey", Some(matches)) => command_pubkey(matches, &config),
        ("hash", Some(matches)) => command_hash(matches),
        ("health", Some(_)) => command_health(&config),
        _ => unreachable!("clap requires a subcommand"),
    }
}

/// Environment configuration with command-line overrides applied
fn config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;

    if let Some(uri) = matches.value_of("uri") {
        config.uri = uri.to_owned();
    }
    if let Some(timeout) = matches.value_of("timeout") {
        config.timeout_secs = timeout
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timeout: {}", timeout))?;
    }

    tracing::info!(uri = %config.uri, "using authority");
    Ok(config)
}

pub fn authority(config: &Config) -> anyhow::Result<HttpAuthority> {
    Ok(HttpAuthority::with_config(config)?)
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand(input: &str) -> anyhow::Result<String> {
    Ok(shellexpand::full(input)
        .map_err(|e| anyhow::anyhow!("cannot expand {}: {}", input, e))?
        .into_owned())
}

fn init_tracing(verbosity: u64, log_format: &str) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match log_format {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
}
