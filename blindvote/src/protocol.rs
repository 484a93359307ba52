//! The voter side of the credential exchange.
//!
//! One [`CredentialProtocol`] is one attempt. It walks a fixed sequence of
//! states and either ends holding a [`Credential`] or fails at the step that
//! went wrong. Nothing is retried; a new attempt means a new protocol value and
//! therefore a new blinding factor.

use crate::*;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rsa::BigUint;
use std::fmt;
use std::mem;
use std::sync::Arc;
use thiserror::Error;

/// Observable protocol state, without the secrets each state carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    KeyResolved,
    Committed,
    Blinded,
    SignatureRequested,
    Unblinded,
    /// The unblinded signature checked out; the credential exchange is next
    Verified,
    /// Terminal: the credential was issued
    Issued,
    /// Terminal: a step failed
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Issued | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::KeyResolved => "key_resolved",
            Phase::Committed => "committed",
            Phase::Blinded => "blinded",
            Phase::SignatureRequested => "signature_requested",
            Phase::Unblinded => "unblinded",
            Phase::Verified => "verified",
            Phase::Issued => "issued",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The transition that was being attempted when a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveKey,
    Blind,
    RequestSignature,
    Unblind,
    Verify,
    ExchangeCredential,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Step::ResolveKey => "resolve key",
            Step::Blind => "blind",
            Step::RequestSignature => "request signature",
            Step::Unblind => "unblind",
            Step::Verify => "verify",
            Step::ExchangeCredential => "exchange credential",
        };
        f.write_str(name)
    }
}

/// Why a run ended without a credential.
#[derive(Debug, Error)]
#[error("blindvote: credential protocol failed at {step}: {error}")]
pub struct ProtocolFailure {
    pub step: Step,

    #[source]
    pub error: Error,
}

impl ProtocolFailure {
    fn new(step: Step, error: Error) -> Self {
        ProtocolFailure { step, error }
    }

    /// HTTP status code of the failing round-trip, if there was one
    pub fn http_status(&self) -> Option<u16> {
        match &self.error {
            Error::KeyFetch { reason, .. }
            | Error::SigningRejected(reason)
            | Error::CredentialExchangeFailed(reason) => reason.status(),
            _ => None,
        }
    }
}

enum State {
    Init,
    KeyResolved {
        key: Arc<PublicKey>,
    },
    Committed {
        key: Arc<PublicKey>,
        message: BigUint,
    },
    Blinded {
        key: Arc<PublicKey>,
        message: BigUint,
        blinded: BigUint,
        r: BlindingFactor,
    },
    SignatureRequested {
        key: Arc<PublicKey>,
        message: BigUint,
        blind_signature: BigUint,
        r: BlindingFactor,
    },
    Unblinded {
        key: Arc<PublicKey>,
        message: BigUint,
        signature: BigUint,
    },
    Verified {
        message: BigUint,
        signature: BigUint,
    },
    Issued(Credential),
    Failed(ProtocolFailure),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Init => Phase::Init,
            State::KeyResolved { .. } => Phase::KeyResolved,
            State::Committed { .. } => Phase::Committed,
            State::Blinded { .. } => Phase::Blinded,
            State::SignatureRequested { .. } => Phase::SignatureRequested,
            State::Unblinded { .. } => Phase::Unblinded,
            State::Verified { .. } => Phase::Verified,
            State::Issued(_) => Phase::Issued,
            State::Failed(_) => Phase::Failed,
        }
    }
}

/// One credential exchange for one identity.
///
/// Borrows the authority and the key cache from the caller; everything else,
/// including the blinding factor, is owned by the run and dropped with it.
pub struct CredentialProtocol<'a, A: Authority + ?Sized, R = OsRng> {
    authority: &'a A,
    keys: &'a KeyCache,
    identity: Identity,
    kind: CredentialKind,
    rng: R,
    state: State,
}

impl<'a, A: Authority + ?Sized> CredentialProtocol<'a, A, OsRng> {
    pub fn new(
        authority: &'a A,
        keys: &'a KeyCache,
        identity: Identity,
        kind: CredentialKind,
    ) -> Self {
        Self::with_rng(authority, keys, identity, kind, OsRng)
    }
}

impl<'a, A: Authority + ?Sized, R: RngCore + CryptoRng> CredentialProtocol<'a, A, R> {
    pub fn with_rng(
        authority: &'a A,
        keys: &'a KeyCache,
        identity: Identity,
        kind: CredentialKind,
        rng: R,
    ) -> Self {
        CredentialProtocol {
            authority,
            keys,
            identity,
            kind,
            rng,
            state: State::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// The failure, once the run has failed
    pub fn failure(&self) -> Option<&ProtocolFailure> {
        match &self.state {
            State::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Perform a single transition and return the phase reached.
    ///
    /// Calling this in a terminal phase does nothing.
    pub fn step(&mut self) -> Phase {
        let state = mem::replace(&mut self.state, State::Init);
        self.state = if state.phase().is_terminal() {
            state
        } else {
            self.transition(state)
        };
        self.phase()
    }

    /// Drive the run to a terminal state.
    pub fn run(mut self) -> Result<Credential, ProtocolFailure> {
        loop {
            match mem::replace(&mut self.state, State::Init) {
                State::Issued(credential) => return Ok(credential),
                State::Failed(failure) => return Err(failure),
                state => self.state = self.transition(state),
            }
        }
    }

    fn transition(&mut self, state: State) -> State {
        let from = state.phase();
        match self.advance(state) {
            Ok(next) => {
                tracing::debug!(%from, to = %next.phase(), kind = %self.kind, "credential protocol transition");
                next
            }
            Err(failure) => {
                tracing::warn!(%from, step = %failure.step, error = %failure.error, "credential protocol failed");
                State::Failed(failure)
            }
        }
    }

    fn advance(&mut self, state: State) -> Result<State, ProtocolFailure> {
        let next = match state {
            State::Init => {
                let key = self
                    .keys
                    .resolve(self.authority)
                    .map_err(|e| ProtocolFailure::new(Step::ResolveKey, e))?;
                State::KeyResolved { key }
            }

            State::KeyResolved { key } => {
                let message = commit(&self.identity);
                State::Committed { key, message }
            }

            State::Committed { key, message } => {
                let (blinded, r) = blind(&key, &message, &mut self.rng)
                    .map_err(|e| ProtocolFailure::new(Step::Blind, e))?;
                State::Blinded {
                    key,
                    message,
                    blinded,
                    r,
                }
            }

            State::Blinded {
                key,
                message,
                blinded,
                r,
            } => {
                let response = self
                    .authority
                    .blind_sign(&BlindSignRequest {
                        blinded_message: blinded,
                    })
                    .map_err(|f| ProtocolFailure::new(Step::RequestSignature, Error::SigningRejected(f)))?;
                State::SignatureRequested {
                    key,
                    message,
                    blind_signature: response.blind_signature,
                    r,
                }
            }

            State::SignatureRequested {
                key,
                message,
                blind_signature,
                r,
            } => {
                let signature = unblind(&key, &blind_signature, &r)
                    .map_err(|e| ProtocolFailure::new(Step::Unblind, e))?;
                drop(r);
                State::Unblinded {
                    key,
                    message,
                    signature,
                }
            }

            State::Unblinded {
                key,
                message,
                signature,
            } => {
                // Hard stop: a bad signature means a corrupted channel or a dishonest authority
                if !verify(&key, &message, &signature) {
                    return Err(ProtocolFailure::new(Step::Verify, Error::VerificationFailed));
                }
                State::Verified { message, signature }
            }

            State::Verified { message, signature } => {
                let credential = self
                    .exchange(message, signature)
                    .map_err(|e| ProtocolFailure::new(Step::ExchangeCredential, e))?;
                State::Issued(credential)
            }

            terminal @ State::Issued(_) | terminal @ State::Failed(_) => terminal,
        };
        Ok(next)
    }

    fn exchange(&self, message: BigUint, signature: BigUint) -> Result<Credential, Error> {
        let request = ExchangeRequest { message, signature };
        match self.kind {
            CredentialKind::AccountAddress => {
                let response = self
                    .authority
                    .assign_account(&request)
                    .map_err(Error::CredentialExchangeFailed)?;
                Ok(Credential::AccountAddress {
                    account_address: response.account_address,
                })
            }
            CredentialKind::SigningKey => {
                let response = self
                    .authority
                    .get_signing_key(&request)
                    .map_err(Error::CredentialExchangeFailed)?;
                Ok(Credential::SigningKey {
                    private_key: response.private_key,
                })
            }
            CredentialKind::EligibilityToken => Ok(Credential::EligibilityToken {
                message: request.message,
                signature: request.signature,
            }),
        }
    }
}

/// Run one credential exchange to completion with a fresh blinding factor.
pub fn request_credential<A: Authority + ?Sized>(
    authority: &A,
    keys: &KeyCache,
    identity: Identity,
    kind: CredentialKind,
) -> Result<Credential, ProtocolFailure> {
    CredentialProtocol::new(authority, keys, identity, kind).run()
}
