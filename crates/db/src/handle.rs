//! The store handle shared by request handlers.

use std::sync::{Arc, OnceLock};

use songapi_core::error::CoreError;
use songapi_core::readiness::StoreReadiness;
use songapi_core::store::SongStore;
use tokio::sync::watch;

/// Owned view of the data store: current readiness plus the store itself.
///
/// The connection supervisor is the only writer of readiness. Handlers go
/// through [`StoreHandle::songs`], which lends out the store only while it is
/// connected, so every store-dependent endpoint fails fast with the same
/// error while the store is down.
pub struct StoreHandle {
    readiness: watch::Sender<StoreReadiness>,
    store: OnceLock<Arc<dyn SongStore>>,
}

impl StoreHandle {
    /// A handle with no store attached yet, in the `connecting` state.
    pub fn new() -> Self {
        let (readiness, _) = watch::channel(StoreReadiness::Connecting);
        Self {
            readiness,
            store: OnceLock::new(),
        }
    }

    /// A handle with `store` already attached.
    pub fn with_store(store: Arc<dyn SongStore>, readiness: StoreReadiness) -> Self {
        let handle = Self::new();
        handle.attach(store);
        handle.set_readiness(readiness);
        handle
    }

    /// Current readiness.
    pub fn readiness(&self) -> StoreReadiness {
        *self.readiness.borrow()
    }

    /// Watch readiness transitions.
    pub fn subscribe(&self) -> watch::Receiver<StoreReadiness> {
        self.readiness.subscribe()
    }

    /// Record a readiness transition, returning the previous state.
    pub fn set_readiness(&self, next: StoreReadiness) -> StoreReadiness {
        self.readiness.send_replace(next)
    }

    /// Attach the store once the client exists. Later calls are ignored and
    /// return `false`.
    pub fn attach(&self, store: Arc<dyn SongStore>) -> bool {
        self.store.set(store).is_ok()
    }

    /// Borrow the store for one operation.
    ///
    /// Fails with [`CoreError::StoreUnavailable`] unless the store is
    /// attached and connected.
    pub fn songs(&self) -> Result<Arc<dyn SongStore>, CoreError> {
        let readiness = self.readiness();
        if !readiness.is_ready() {
            return Err(CoreError::StoreUnavailable(readiness));
        }
        self.store
            .get()
            .cloned()
            .ok_or(CoreError::StoreUnavailable(readiness))
    }
}

impl Default for StoreHandle {
    fn default() -> Self {
        Self::new()
    }
}
