//! Worker lifecycle controller.
//!
//! Owns the cache store and the network client, drives the
//! install/activate lifecycle, and dispatches every intercepted request
//! through the classifier into the matching strategy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use vendavoa_client::fetch::Network;
use vendavoa_client::strategy;
use vendavoa_core::config::AppConfig;
use vendavoa_core::request::canonicalize;
use vendavoa_core::{CacheDb, CacheStore, EntryKey, Error, ResponseSnapshot, WorkerRequest, routes};

/// Request identities that must be cached before a new worker generation
/// counts as installed: app shell, dashboard, core stylesheet and script,
/// and the PWA manifest.
pub const STATIC_MANIFEST: &[&str] = &[
    "/",
    "/dashboard",
    "/static/css/style.css",
    "/static/js/app.js",
    "/static/manifest.json",
];

/// Sync tag recognized as the deferred-reconciliation signal.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Pre-populating the cache with the static manifest.
    Installing,
    /// Manifest cached; waiting to take over from the previous generation.
    Installed,
    /// Evicting stale cache generations.
    Activating,
    /// Serving intercepted requests.
    Active,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Active => write!(f, "active"),
        }
    }
}

/// Control messages a page can send to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Activate a waiting worker generation immediately instead of
    /// waiting for every page to be reloaded.
    ForceActivate,
}

/// Extension point invoked when a background-sync signal arrives.
///
/// Deliberately minimal: no queue, no retry policy. Write-replay logic, if
/// it ever exists, attaches here.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn reconcile(&self) -> Result<(), Error>;
}

/// The offline worker: lifecycle controller plus request dispatch.
pub struct ServiceWorker {
    store: CacheStore,
    net: Arc<dyn Network>,
    app_origin: Url,
    state_tx: watch::Sender<WorkerState>,
    sync_handler: Option<Arc<dyn SyncHandler>>,
}

impl ServiceWorker {
    /// Build a worker over the shared cache database and a network client.
    pub fn new(db: CacheDb, net: Arc<dyn Network>, config: &AppConfig) -> Result<Self, Error> {
        let app_origin = canonicalize(&config.app_origin)?;
        let store = CacheStore::open(db, &config.cache_version);
        let (state_tx, _) = watch::channel(WorkerState::Installing);

        Ok(Self { store, net, app_origin, state_tx, sync_handler: None })
    }

    /// Attach a background-sync handler.
    pub fn with_sync_handler(mut self, handler: Arc<dyn SyncHandler>) -> Self {
        self.sync_handler = Some(handler);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions. Observers see `Active` the moment
    /// activation completes, without any reload on their side.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state_tx.subscribe()
    }

    /// Active cache generation tag.
    pub fn version(&self) -> &str {
        self.store.version()
    }

    /// The store serving this worker generation.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Build an intercepted request, resolving root-relative targets
    /// against the app origin. Non-http(s) targets are declined here with
    /// [`Error::UnsupportedScheme`] and never reach dispatch.
    pub fn request_for(
        &self,
        method: &str,
        target: &str,
        headers: Vec<(String, String)>,
    ) -> Result<WorkerRequest, Error> {
        let url;
        let target = if target.starts_with('/') {
            url = self
                .app_origin
                .join(target)
                .map_err(|e| Error::InvalidUrl(e.to_string()))?
                .to_string();
            url.as_str()
        } else {
            target
        };
        WorkerRequest::new(method, target, headers)
    }

    /// Pre-populate the cache with the static manifest.
    ///
    /// Every manifest entry must fetch with status 200; the batch is
    /// written in one transaction, so a failed install leaves nothing
    /// behind and the worker never reaches `Installed`.
    pub async fn install(&self) -> Result<(), Error> {
        self.state_tx.send_replace(WorkerState::Installing);
        tracing::info!(version = self.store.version(), "installing worker generation");

        let mut entries = Vec::with_capacity(STATIC_MANIFEST.len());
        for path in STATIC_MANIFEST {
            let request = self.request_for("GET", path, Vec::new())?;
            let response = self
                .net
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;

            if !response.is_success() {
                return Err(Error::InstallFailed(format!("{path}: status {}", response.status)));
            }

            entries.push((EntryKey::for_request(&request), response));
        }

        self.store.put_all(&entries).await?;
        self.state_tx.send_replace(WorkerState::Installed);
        tracing::info!(count = entries.len(), "static manifest cached, worker installed");

        Ok(())
    }

    /// Evict every cache generation except the active one, then take over.
    pub async fn activate(&self) -> Result<(), Error> {
        self.state_tx.send_replace(WorkerState::Activating);

        for version in self.store.db().list_versions().await? {
            if version != self.store.version() {
                let deleted = self.store.db().delete_version(&version).await?;
                tracing::info!(%version, deleted, "evicted stale cache generation");
            }
        }

        self.state_tx.send_replace(WorkerState::Active);
        tracing::info!(version = self.store.version(), "worker active");

        Ok(())
    }

    /// Serve one intercepted request.
    ///
    /// Produces exactly one outcome: a snapshot (network, cache, or
    /// synthesized fallback), or an error for the one deliberately
    /// unresolved case (unreachable network on a non-document static miss).
    pub async fn handle(&self, request: &WorkerRequest) -> Result<ResponseSnapshot, Error> {
        let class = routes::classify(&request.url);
        tracing::debug!(request = %request.identity(), %class, "dispatching");
        strategy::execute(class, &self.store, self.net.as_ref(), request).await
    }

    /// Handle a control message from a page.
    pub async fn message(&self, message: ControlMessage) -> Result<(), Error> {
        match message {
            ControlMessage::ForceActivate => match self.state() {
                WorkerState::Installed => self.activate().await,
                state => {
                    tracing::debug!(%state, "force-activate ignored");
                    Ok(())
                }
            },
        }
    }

    /// Handle a background-sync signal. Unknown tags are ignored; the
    /// recognized tag runs the attached handler, if any.
    pub async fn sync(&self, tag: &str) -> Result<(), Error> {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(%tag, "ignoring unknown sync tag");
            return Ok(());
        }

        match &self.sync_handler {
            Some(handler) => handler.reconcile().await,
            None => {
                tracing::info!("background sync signaled, nothing to reconcile");
                Ok(())
            }
        }
    }
}
