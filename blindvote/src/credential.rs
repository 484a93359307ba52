use crate::*;
use rsa::BigUint;
use std::fmt;
use std::str::FromStr;

/// What a verified signature is exchanged for.
///
/// Which one applies depends on how the authority is deployed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    /// `POST /assign_account`: the authority hands out an anonymous chain account
    AccountAddress,

    /// `POST /get_signing_key`: the authority hands out a private key to sign with
    SigningKey,

    /// No exchange: the verified `(message, signature)` pair itself is the credential
    EligibilityToken,
}

impl CredentialKind {
    pub fn name(&self) -> &'static str {
        match self {
            CredentialKind::AccountAddress => "account",
            CredentialKind::SigningKey => "signing-key",
            CredentialKind::EligibilityToken => "token",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CredentialKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "account" | "account-address" => Ok(CredentialKind::AccountAddress),
            "signing-key" | "key" => Ok(CredentialKind::SigningKey),
            "token" | "eligibility-token" => Ok(CredentialKind::EligibilityToken),
            _ => Err(Error::Config(format!("unknown credential kind: {}", s))),
        }
    }
}

/// The eligibility credential produced by one protocol run.
///
/// Not `Clone`: a credential is handed to the contract layer once.
#[derive(Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    AccountAddress {
        account_address: String,
    },
    SigningKey {
        private_key: String,
    },
    EligibilityToken {
        #[serde(with = "serde_decimal")]
        message: BigUint,

        #[serde(with = "serde_decimal")]
        signature: BigUint,
    },
}

impl Credential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::AccountAddress { .. } => CredentialKind::AccountAddress,
            Credential::SigningKey { .. } => CredentialKind::SigningKey,
            Credential::EligibilityToken { .. } => CredentialKind::EligibilityToken,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Credential::AccountAddress { account_address } => f
                .debug_struct("AccountAddress")
                .field("account_address", account_address)
                .finish(),
            Credential::SigningKey { .. } => f.debug_struct("SigningKey").finish_non_exhaustive(),
            Credential::EligibilityToken { message, .. } => f
                .debug_struct("EligibilityToken")
                .field("message", message)
                .finish_non_exhaustive(),
        }
    }
}
