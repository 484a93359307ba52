use crate::*;
use std::sync::Arc;

/// Fetch and decode the authority's public key, bypassing any cache.
pub fn resolve<A: Authority + ?Sized>(authority: &A) -> Result<PublicKey, Error> {
    tracing::debug!(url = authority.url(), "fetching authority public key");
    let artifact = authority.fetch_public_key().map_err(|reason| Error::KeyFetch {
        url: authority.url().to_owned(),
        reason,
    })?;
    PublicKey::decode(&artifact)
}

/// Public keys by authority URL.
///
/// Owned by the caller and shared by reference between protocol runs. Keys
/// are immutable once fetched; there is no rotation handling beyond an
/// explicit [`KeyCache::invalidate`].
#[derive(Default)]
pub struct KeyCache {
    keys: SingleFlight<PublicKey>,
}

impl KeyCache {
    pub fn new() -> Self {
        KeyCache::default()
    }

    /// The authority's public key, fetched at most once per URL.
    pub fn resolve<A: Authority + ?Sized>(&self, authority: &A) -> Result<Arc<PublicKey>, Error> {
        if let Some(key) = self.keys.get(authority.url()) {
            tracing::trace!(url = authority.url(), "public key cache hit");
            return Ok(key);
        }
        self.keys.get_or_try_init(authority.url(), || resolve(authority))
    }

    /// Seed the cache with a key obtained out of band, e.g. from a local file.
    ///
    /// An already cached key for `url` wins and is returned.
    pub fn preload(&self, url: &str, key: PublicKey) -> Arc<PublicKey> {
        match self
            .keys
            .get_or_try_init::<_, std::convert::Infallible>(url, || Ok(key))
        {
            Ok(key) => key,
            Err(never) => match never {},
        }
    }

    pub fn cached(&self, url: &str) -> Option<Arc<PublicKey>> {
        self.keys.get(url)
    }

    pub fn invalidate(&self, url: &str) {
        self.keys.invalidate(url);
    }
}
