use crate::*;
use reqwest::blocking::{Client, Response};
use rsa::BigUint;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlindSignRequest {
    #[serde(with = "serde_decimal")]
    pub blinded_message: BigUint,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlindSignResponse {
    #[serde(with = "serde_decimal")]
    pub blind_signature: BigUint,
}

/// Proof of eligibility presented when exchanging for a credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    #[serde(with = "serde_decimal")]
    pub message: BigUint,

    #[serde(with = "serde_decimal")]
    pub signature: BigUint,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountResponse {
    pub account_address: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SigningKeyResponse {
    pub private_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EligibilityRequest {
    #[serde(with = "serde_decimal")]
    pub user_hash: BigUint,

    #[serde(with = "serde_decimal")]
    pub signature: BigUint,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityResponse {
    pub eligible: bool,
}

/// The signing authority, seen from the voter's side.
///
/// Each method is one round-trip. Implementations report any failure to get
/// a usable answer (status, transport, timeout, undecodable body) as an
/// [`HttpFailure`]; mapping it onto a protocol step is up to the caller.
pub trait Authority {
    /// Base URL identifying this authority. Used as the key-cache key.
    fn url(&self) -> &str;

    /// Fetch the raw public key artifact (PEM or JWK text)
    fn fetch_public_key(&self) -> Result<String, HttpFailure>;

    /// `POST /blind_sign`
    fn blind_sign(&self, request: &BlindSignRequest) -> Result<BlindSignResponse, HttpFailure>;

    /// `POST /assign_account`
    fn assign_account(&self, request: &ExchangeRequest) -> Result<AccountResponse, HttpFailure>;

    /// `POST /get_signing_key`
    fn get_signing_key(
        &self,
        request: &ExchangeRequest,
    ) -> Result<SigningKeyResponse, HttpFailure>;

    /// `POST /check_eligibility`
    fn check_eligibility(
        &self,
        request: &EligibilityRequest,
    ) -> Result<EligibilityResponse, HttpFailure>;

    /// `GET /deployed.json`
    fn deployment(&self) -> Result<ContractInfo, HttpFailure>;

    /// `GET /health`
    fn health(&self) -> Result<(), HttpFailure>;
}

/// Ask the authority whether a `(message, signature)` pair can still be used.
///
/// Read-only; safe to poll.
pub fn check_eligibility<A: Authority + ?Sized>(
    authority: &A,
    message: &BigUint,
    signature: &BigUint,
) -> Result<bool, Error> {
    let request = EligibilityRequest {
        user_hash: message.clone(),
        signature: signature.clone(),
    };
    let response = authority
        .check_eligibility(&request)
        .map_err(Error::EligibilityQueryFailed)?;
    tracing::debug!(eligible = response.eligible, "eligibility checked");
    Ok(response.eligible)
}

/// An [`Authority`] reached over HTTP.
pub struct HttpAuthority {
    base_uri: String,
    key_path: String,
    client: Client,
}

impl HttpAuthority {
    pub fn new(base_uri: &str) -> Result<Self, Error> {
        Self::with_config(&Config {
            uri: base_uri.to_owned(),
            ..Config::default()
        })
    }

    pub fn with_config(config: &Config) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(HttpAuthority {
            base_uri: config.uri.trim_end_matches('/').to_owned(),
            key_path: config.key_path.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_uri, path)
        } else {
            format!("{}/{}", self.base_uri, path)
        }
    }

    fn get(&self, path: &str) -> Result<Response, HttpFailure> {
        let url = self.endpoint(path);
        tracing::trace!(%url, "GET");
        check_status(self.client.get(&url).send()?)
    }

    fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, HttpFailure> {
        let url = self.endpoint(path);
        tracing::trace!(%url, "POST");
        let res = check_status(self.client.post(&url).json(body).send()?)?;
        Ok(res.json()?)
    }
}

fn check_status(res: Response) -> Result<Response, HttpFailure> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    Err(HttpFailure::Status(status.as_u16(), body))
}

impl Authority for HttpAuthority {
    fn url(&self) -> &str {
        &self.base_uri
    }

    fn fetch_public_key(&self) -> Result<String, HttpFailure> {
        Ok(self.get(&self.key_path)?.text()?)
    }

    fn blind_sign(&self, request: &BlindSignRequest) -> Result<BlindSignResponse, HttpFailure> {
        self.post("/blind_sign", request)
    }

    fn assign_account(&self, request: &ExchangeRequest) -> Result<AccountResponse, HttpFailure> {
        self.post("/assign_account", request)
    }

    fn get_signing_key(
        &self,
        request: &ExchangeRequest,
    ) -> Result<SigningKeyResponse, HttpFailure> {
        self.post("/get_signing_key", request)
    }

    fn check_eligibility(
        &self,
        request: &EligibilityRequest,
    ) -> Result<EligibilityResponse, HttpFailure> {
        self.post("/check_eligibility", request)
    }

    fn deployment(&self) -> Result<ContractInfo, HttpFailure> {
        Ok(self.get("/deployed.json")?.json()?)
    }

    fn health(&self) -> Result<(), HttpFailure> {
        let status: HealthResponse = self.get("/health")?.json()?;
        if status.status == "ok" {
            Ok(())
        } else {
            Err(HttpFailure::Body(format!("status {:?}", status.status)))
        }
    }
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}
