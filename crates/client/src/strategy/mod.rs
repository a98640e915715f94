//! The two caching strategies.
//!
//! Classification fully decides which strategy runs before any cache or
//! network access happens; there is no fallback from one strategy into the
//! other. Cache writes after a successful fetch are best-effort: a failed
//! write is logged and the response is still returned, matching the
//! fire-and-forget writes of the source worker.

use vendavoa_core::{CacheStore, EntryKey, Error, ResponseSnapshot, RouteClass, WorkerRequest};

use crate::fallback;
use crate::fetch::Network;

/// Run the strategy selected by `class`.
pub async fn execute(
    class: RouteClass,
    store: &CacheStore,
    net: &dyn Network,
    request: &WorkerRequest,
) -> Result<ResponseSnapshot, Error> {
    match class {
        RouteClass::Dynamic => network_first(store, net, request).await,
        RouteClass::Static => cache_first(store, net, request).await,
    }
}

/// Network-first with cache fallback, for dynamic/API requests.
///
/// Any reachable response is returned as-is; only status 200 is cached.
/// When the network is unreachable the cached snapshot is served, and when
/// there is none either, a synthetic JSON error takes its place.
pub async fn network_first(
    store: &CacheStore,
    net: &dyn Network,
    request: &WorkerRequest,
) -> Result<ResponseSnapshot, Error> {
    let key = EntryKey::for_request(request);

    match net.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                if let Err(e) = store.put(&key, &response).await {
                    tracing::warn!(key = %key, error = %e, "failed to cache response");
                }
            }
            Ok(response)
        }
        Err(Error::NetworkUnreachable(reason)) => {
            tracing::debug!(key = %key, %reason, "network unreachable, trying cache");
            match store.get(&key).await? {
                Some(cached) => Ok(cached),
                None => Ok(fallback::api_fallback(request)),
            }
        }
        Err(e) => Err(e),
    }
}

/// Cache-first with network fallback, for static assets and page shells.
///
/// A cache hit is served without touching the network at all. On a miss the
/// response is fetched and cached only when it is a status-200 same-origin
/// response; cross-origin responses are returned uncached. When the network
/// is unreachable, document requests get the offline page and anything else
/// propagates the failure (a wrong-typed substitute would be worse than
/// nothing).
pub async fn cache_first(
    store: &CacheStore,
    net: &dyn Network,
    request: &WorkerRequest,
) -> Result<ResponseSnapshot, Error> {
    let key = EntryKey::for_request(request);

    if let Some(cached) = store.get(&key).await? {
        return Ok(cached);
    }

    match net.fetch(request).await {
        Ok(response) => {
            if response.is_success() && response.same_origin(request) {
                if let Err(e) = store.put(&key, &response).await {
                    tracing::warn!(key = %key, error = %e, "failed to cache response");
                }
            }
            Ok(response)
        }
        Err(Error::NetworkUnreachable(reason)) => {
            if request.accepts_html() {
                tracing::debug!(key = %key, %reason, "network unreachable, serving offline page");
                Ok(fallback::document_fallback(request))
            } else {
                Err(Error::NetworkUnreachable(reason))
            }
        }
        Err(e) => Err(e),
    }
}
