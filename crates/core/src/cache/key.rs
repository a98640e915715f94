//! Cache entry key computation.

use sha2::{Digest, Sha256};
use url::Url;

use crate::request::WorkerRequest;

/// Canonical identity of a cache entry: method plus canonical URL.
///
/// The hash is what the store indexes on; method and URL are kept alongside
/// it so stored rows stay inspectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryKey {
    pub method: String,
    pub url: String,
}

impl EntryKey {
    /// Key for an explicit method + canonical URL pair.
    pub fn new(method: &str, url: &Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.to_string() }
    }

    /// Key identifying a request.
    pub fn for_request(request: &WorkerRequest) -> Self {
        Self::new(&request.method, &request.url)
    }

    /// SHA-256 over `method\nurl`, hex encoded.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
