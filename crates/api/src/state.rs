use std::sync::Arc;

use songapi_db::StoreHandle;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Store readiness and the song store, maintained by the connection
    /// manager.
    pub store: Arc<StoreHandle>,
}
