use rsa::BigUint;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A voter's real-world identity, as known to the signing authority.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub voter_name: String,
    pub voter_id: String,
}

impl Identity {
    pub fn new<N: Into<String>, I: Into<String>>(voter_name: N, voter_id: I) -> Self {
        Identity {
            voter_name: voter_name.into(),
            voter_id: voter_id.into(),
        }
    }

    /// Canonical encoding: a compact JSON object with lexicographically sorted
    /// keys, e.g. `{"voter_id":"42","voter_name":"Alice"}`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut fields = BTreeMap::new();
        fields.insert("voter_id", self.voter_id.as_str());
        fields.insert("voter_name", self.voter_name.as_str());

        // A map of string to string always serializes
        serde_json::to_vec(&fields).unwrap_or_default()
    }

    /// SHA-256 of the canonical encoding
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.canonical_bytes()).into()
    }

    /// Lowercase hex of the identity digest
    pub fn hash_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

/// Commit an identity into the message domain: the big-endian integer value of
/// the SHA-256 digest of its canonical encoding.
///
/// The commitment is deterministic. Unlinkability of the final credential comes
/// from the blinding factor, not from the message.
pub fn commit(identity: &Identity) -> BigUint {
    BigUint::from_bytes_be(&identity.digest())
}
