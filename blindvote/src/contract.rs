//! The election contract, as far as a voter client needs to see it.
//!
//! Contract logic lives on chain. This module only names the calls the client
//! makes and manages handles to a deployed contract; talking to an actual
//! chain is the job of a [`ContractConnector`] implementation.

use crate::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Name of the voting contract inside `deployed.json`
pub const VOTING_CONTRACT: &str = "Voting";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: u64,
    pub name: String,
    pub party: String,
    pub vote_count: u64,
}

/// Voting window, in seconds since the Unix epoch
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionDates {
    pub start: u64,
    pub end: u64,
}

/// The deployed election contract.
pub trait VotingContract {
    fn vote(&self, candidate_id: u64) -> Result<(), Error>;

    /// Whether the account behind this handle has already voted
    fn check_vote(&self) -> Result<bool, Error>;

    fn get_candidate(&self, id: u64) -> Result<Candidate, Error>;
    fn get_count_candidates(&self) -> Result<u64, Error>;
    fn get_dates(&self) -> Result<ElectionDates, Error>;

    fn add_candidate(&self, name: &str, party: &str) -> Result<(), Error>;
    fn set_dates(&self, start: u64, end: u64) -> Result<(), Error>;

    /// All candidates, in id order. Candidate ids start at 1.
    fn candidates(&self) -> Result<Vec<Candidate>, Error> {
        let count = self.get_count_candidates()?;
        (1..=count).map(|id| self.get_candidate(id)).collect()
    }
}

/// One contract entry of the deployment descriptor
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeployedContract {
    pub address: String,
    #[serde(default)]
    pub abi: serde_json::Value,
}

/// The deployment descriptor served as `deployed.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContractInfo {
    pub contracts: BTreeMap<String, DeployedContract>,
}

impl ContractInfo {
    pub fn voting(&self) -> Result<&DeployedContract, Error> {
        self.contracts
            .get(VOTING_CONTRACT)
            .ok_or_else(|| Error::Contract(format!("no {} contract deployed", VOTING_CONTRACT)))
    }
}

/// Builds contract handles for a particular chain client.
pub trait ContractConnector {
    type Contract: VotingContract;

    /// A handle that can only read
    fn connect_read_only(&self, contract: &DeployedContract) -> Result<Self::Contract, Error>;

    /// A handle that sends transactions using `credential`
    fn connect_with(
        &self,
        contract: &DeployedContract,
        credential: Credential,
    ) -> Result<Self::Contract, Error>;
}

/// Contract handles owned by the caller.
///
/// Deployment descriptors and read-only handles are fetched at most once per
/// authority URL. Signing handles are never cached: each wraps a credential
/// that is used once.
pub struct ContractConnections<C: ContractConnector> {
    connector: C,
    deployments: SingleFlight<ContractInfo>,
    read_only: SingleFlight<C::Contract>,
}

impl<C: ContractConnector> ContractConnections<C> {
    pub fn new(connector: C) -> Self {
        ContractConnections {
            connector,
            deployments: SingleFlight::new(),
            read_only: SingleFlight::new(),
        }
    }

    pub fn deployment<A: Authority + ?Sized>(
        &self,
        authority: &A,
    ) -> Result<Arc<ContractInfo>, Error> {
        self.deployments.get_or_try_init(authority.url(), || {
            tracing::debug!(url = authority.url(), "fetching contract deployment");
            authority
                .deployment()
                .map_err(|e| Error::Contract(format!("cannot fetch deployment: {}", e)))
        })
    }

    pub fn read_only<A: Authority + ?Sized>(
        &self,
        authority: &A,
    ) -> Result<Arc<C::Contract>, Error> {
        let info = self.deployment(authority)?;
        self.read_only.get_or_try_init(authority.url(), || {
            self.connector.connect_read_only(info.voting()?)
        })
    }

    pub fn signer<A: Authority + ?Sized>(
        &self,
        authority: &A,
        credential: Credential,
    ) -> Result<C::Contract, Error> {
        let info = self.deployment(authority)?;
        self.connector.connect_with(info.voting()?, credential)
    }
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("blindvote: this credential has already been used to vote")]
    AlreadyVoted,

    #[error(transparent)]
    Protocol(#[from] ProtocolFailure),

    #[error(transparent)]
    Contract(#[from] Error),
}

/// Obtain a fresh credential for `identity` and cast one vote with it.
pub fn cast_vote<A, C>(
    authority: &A,
    keys: &KeyCache,
    contracts: &ContractConnections<C>,
    identity: Identity,
    kind: CredentialKind,
    candidate_id: u64,
) -> Result<(), VoteError>
where
    A: Authority + ?Sized,
    C: ContractConnector,
{
    let credential = request_credential(authority, keys, identity, kind)?;
    let contract = contracts.signer(authority, credential)?;

    if contract.check_vote()? {
        return Err(VoteError::AlreadyVoted);
    }
    contract.vote(candidate_id)?;

    tracing::info!(candidate_id, "vote cast");
    Ok(())
}
