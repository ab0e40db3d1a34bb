//! Cache-policy gateway.
//!
//! Every outbound request passes through [`Gateway::fetch`]. GET requests to
//! http(s) URLs are served network-first: the live response always wins and
//! is written to the runtime store as a side effect; the cache is consulted
//! only when the network fails.
//!
//! ```text
//! Installing ──Installed──▶ Waiting ──ForceActivate──▶ Active
//!      └──────Installed (skip_waiting)───────────────────▲
//! ```
//!
//! Entering `Active` deletes every store of older generations.

pub mod lifecycle;
pub mod network;
pub mod policy;
pub mod request;

#[cfg(test)]
pub mod mock;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use url::Url;

use crate::app::{ConfluenceError, Result};
use crate::config::CacheConfig;
use crate::store::Store;

pub use lifecycle::{ControlMessage, Generation, Lifecycle, LifecycleEvent, Phase};
pub use network::{HttpNetwork, Network};
pub use policy::Resolution;
pub use request::{Request, RequestBody, Response, ResponseKind, ResponseOrigin};

/// Per-store entry counts for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub name: String,
    pub entries: usize,
    pub current: bool,
}

pub struct Gateway {
    store: Arc<dyn Store + Send + Sync>,
    network: Arc<dyn Network>,
    generation: Generation,
    lifecycle: Mutex<Lifecycle>,
    shell_url: Option<Url>,
    precache: Vec<Url>,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        network: Arc<dyn Network>,
        config: &CacheConfig,
    ) -> Result<Self> {
        let shell_url = config
            .shell_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;

        let precache = match &shell_url {
            Some(base) => config
                .precache
                .iter()
                .map(|path| base.join(path))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            store,
            network,
            generation: Generation::new(&config.app, &config.version),
            lifecycle: Mutex::new(Lifecycle::new(config.skip_waiting)),
            shell_url,
            precache,
        })
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle().phase()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bring the gateway up. A generation that an earlier run already
    /// activated resumes directly; otherwise it is installed.
    pub async fn start(&self) -> Result<Phase> {
        let static_store = self.generation.static_store();
        if self.store.active_generation()?.as_deref() == Some(static_store.as_str()) {
            debug!("Resuming cache generation {}", static_store);
            return self.transition(LifecycleEvent::Resumed);
        }
        self.install().await
    }

    /// Precache the shell manifest into the static store.
    ///
    /// All manifest entries are fetched before any is written; one failure
    /// fails the whole install and leaves the generation redundant.
    pub async fn install(&self) -> Result<Phase> {
        let phase = self.phase();
        if phase != Phase::Installing {
            return Err(ConfluenceError::Lifecycle(format!(
                "cannot install while {}",
                phase
            )));
        }

        let static_store = self.generation.static_store();
        info!("Installing cache generation {}", static_store);

        match self.fetch_manifest().await {
            Ok(responses) => {
                self.store.open_store(&static_store)?;
                for (request, response) in &responses {
                    self.store.put(&response.to_entry(&static_store, request))?;
                }
                info!("Precached {} shell resources", responses.len());
                self.transition(LifecycleEvent::Installed)
            }
            Err(e) => {
                warn!("Install of {} failed: {}", static_store, e);
                self.transition(LifecycleEvent::InstallFailed)?;
                Err(e)
            }
        }
    }

    async fn fetch_manifest(&self) -> Result<Vec<(Request, Response)>> {
        let mut responses = Vec::with_capacity(self.precache.len());

        for url in &self.precache {
            let request = Request::get(url.clone());
            let response = self.network.send(&request).await?;
            if !policy::is_cacheable(&response) {
                return Err(ConfluenceError::HttpStatus {
                    status: response.status,
                    url: url.to_string(),
                });
            }
            responses.push((request, response));
        }

        Ok(responses)
    }

    /// Handle one message from the control channel.
    pub fn handle_message(&self, message: ControlMessage) -> Result<Phase> {
        info!("Control message received: {:?}", message);
        match message {
            ControlMessage::ForceActivate => self.transition(LifecycleEvent::ForceActivate),
        }
    }

    /// Parse and handle a raw JSON control message.
    pub fn handle_raw_message(&self, json: &str) -> Result<Phase> {
        self.handle_message(ControlMessage::parse(json)?)
    }

    /// Every consumer of the previous generation has closed.
    pub fn release_consumers(&self) -> Result<Phase> {
        self.transition(LifecycleEvent::ConsumersReleased)
    }

    /// Drop every store belonging to this app.
    pub fn uninstall(&self) -> Result<Vec<String>> {
        self.transition(LifecycleEvent::Uninstall)?;

        let mut deleted = Vec::new();
        for name in self.store.store_names()? {
            if self.generation.owns(&name) && self.store.delete_store(&name)? {
                deleted.push(name);
            }
        }
        self.store.set_active_generation(None)?;

        info!("Uninstalled {} cache stores", deleted.len());
        Ok(deleted)
    }

    fn transition(&self, event: LifecycleEvent) -> Result<Phase> {
        let (before, after) = {
            let mut lifecycle = self.lifecycle();
            let before = lifecycle.phase();
            (before, lifecycle.apply(event)?)
        };

        if before != after {
            info!("Cache lifecycle {} -> {}", before, after);
        }
        if after == Phase::Active && before != Phase::Active {
            self.activate()?;
        }

        Ok(after)
    }

    /// Delete every store of older generations and record this one as
    /// active.
    fn activate(&self) -> Result<Vec<String>> {
        let names = self.store.store_names()?;
        let stale: Vec<String> = self
            .generation
            .stale(&names)
            .into_iter()
            .map(String::from)
            .collect();

        for name in &stale {
            info!("Deleting old cache: {}", name);
            self.store.delete_store(name)?;
        }

        self.store.open_store(&self.generation.static_store())?;
        self.store.open_store(&self.generation.runtime_store())?;
        self.store
            .set_active_generation(Some(&self.generation.static_store()))?;

        Ok(stale)
    }

    /// Send a request through the cache policy.
    pub async fn fetch(&self, request: Request) -> Result<Response> {
        if !policy::intercepts(&request) || self.phase() != Phase::Active {
            return self.network.send(&request).await;
        }

        let static_store = self.generation.static_store();
        let runtime_store = self.generation.runtime_store();
        let stores = [static_store.as_str(), runtime_store.as_str()];

        let cached = self.lookup(&stores, &request.identity());
        let network = self.network.send(&request).await;

        let shell = if network.is_err() && cached.is_none() && request.accepts_html() {
            self.shell_document(&request, &stores)
        } else {
            None
        };

        match policy::resolve(&request, network, cached, shell) {
            Resolution::Network { response, store } => {
                if store {
                    self.write_runtime(&request, &response, &runtime_store);
                }
                Ok(response)
            }
            Resolution::Cached(response) => {
                info!("Serving from cache: {}", request.url);
                Ok(response)
            }
            Resolution::Shell(response) => {
                info!("Serving shell document for {}", request.url);
                Ok(response)
            }
            Resolution::Unavailable(e) => {
                warn!("Network failed for {} with no cached copy: {}", request.url, e);
                Err(ConfluenceError::Unavailable {
                    url: request.url.to_string(),
                })
            }
        }
    }

    fn lookup(&self, stores: &[&str], key: &str) -> Option<Response> {
        match self.store.lookup(stores, key) {
            Ok(entry) => entry.map(|e| Response::from_entry(e, ResponseOrigin::Cache)),
            Err(e) => {
                warn!("Cache lookup failed: {}", e);
                None
            }
        }
    }

    fn shell_document(&self, request: &Request, stores: &[&str]) -> Option<Response> {
        let shell_url = match &self.shell_url {
            Some(url) => url.clone(),
            None => request.url.join("/").ok()?,
        };
        self.lookup(stores, &Request::get(shell_url).identity())
    }

    fn write_runtime(&self, request: &Request, response: &Response, runtime_store: &str) {
        // A failed write never fails the response
        match self.store.put(&response.to_entry(runtime_store, request)) {
            Ok(()) => debug!("Cached {}", request.url),
            Err(e) => warn!("Failed to cache {}: {}", request.url, e),
        }
    }

    /// All stores with entry counts, current generation flagged.
    pub fn status(&self) -> Result<Vec<StoreStatus>> {
        self.store
            .store_names()?
            .into_iter()
            .map(|name| -> Result<StoreStatus> {
                let entries = self.store.entry_count(&name)?;
                let current = self.generation.is_current(&name);
                Ok(StoreStatus {
                    name,
                    entries,
                    current,
                })
            })
            .collect()
    }
}
