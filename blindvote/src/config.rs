use crate::*;
use std::env::var;

pub const DEFAULT_URI: &str = "http://127.0.0.1:5000";
pub const DEFAULT_KEY_PATH: &str = "/public.pem";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URI of the signing authority
    pub uri: String,

    /// Path of the served public key artifact
    pub key_path: String,

    /// Per-request HTTP timeout
    pub timeout_secs: u64,

    /// What to exchange the verified signature for
    pub credential: CredentialKind,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            uri: DEFAULT_URI.to_owned(),
            key_path: DEFAULT_KEY_PATH.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            credential: CredentialKind::AccountAddress,
        }
    }
}

impl Config {
    /// Read configuration from `BLINDVOTE_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| var(name).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, Error> {
        let mut config = Config::default();

        if let Some(uri) = lookup("BLINDVOTE_URI") {
            config.uri = uri;
        }

        if let Some(key_path) = lookup("BLINDVOTE_KEY_PATH") {
            config.key_path = key_path;
        }

        if let Some(timeout) = lookup("BLINDVOTE_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|_| {
                Error::Config(format!("BLINDVOTE_TIMEOUT_SECS is not a number: {}", timeout))
            })?;
        }

        if let Some(credential) = lookup("BLINDVOTE_CREDENTIAL") {
            config.credential = credential.parse()?;
        }

        Ok(config)
    }
}
