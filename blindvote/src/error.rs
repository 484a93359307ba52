use std::fmt;
use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("blindvote: division by zero")]
    DivisionByZero,

    #[error("blindvote: no modular inverse exists")]
    NoInverse,

    #[error("blindvote: cannot sample from an empty range below {0}")]
    EmptyRange(rsa::BigUint),

    #[error("blindvote: message is not smaller than the key modulus")]
    MessageOutOfRange,

    #[error("blindvote: failed to fetch public key from {url}: {reason}")]
    KeyFetch { url: String, reason: HttpFailure },

    #[error("blindvote: failed to decode public key: {0}")]
    KeyDecode(String),

    #[error("blindvote: blind signing request rejected: {0}")]
    SigningRejected(HttpFailure),

    #[error("blindvote: signature verification failed")]
    VerificationFailed,

    #[error("blindvote: credential exchange failed: {0}")]
    CredentialExchangeFailed(HttpFailure),

    #[error("blindvote: eligibility query failed: {0}")]
    EligibilityQueryFailed(HttpFailure),

    #[error("blindvote: health check failed: {0}")]
    HealthCheckFailed(HttpFailure),

    #[error("blindvote: contract error: {0}")]
    Contract(String),

    #[error("blindvote: invalid configuration: {0}")]
    Config(String),
}

/// Why an HTTP round-trip with the authority did not produce a usable answer.
///
/// Timeouts and connection failures are reported as `Transport` and are
/// treated exactly like a non-success status by the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpFailure {
    /// The authority answered with a non-success status code.
    Status(u16, String),

    /// The request never completed (connect error, timeout, ...).
    Transport(String),

    /// The authority answered 2xx but the body could not be understood.
    Body(String),
}

impl HttpFailure {
    /// HTTP status code, if the authority answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpFailure::Status(code, _) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HttpFailure::Status(code, body) if body.is_empty() => write!(f, "HTTP {}", code),
            HttpFailure::Status(code, body) => write!(f, "HTTP {}: {}", code, body),
            HttpFailure::Transport(e) => write!(f, "transport error: {}", e),
            HttpFailure::Body(e) => write!(f, "malformed response: {}", e),
        }
    }
}

impl From<reqwest::Error> for HttpFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            HttpFailure::Body(e.to_string())
        } else {
            HttpFailure::Transport(e.to_string())
        }
    }
}
