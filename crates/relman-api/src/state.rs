//! Application state.

use std::sync::Arc;

use relman_core::access::PermissionStore;
use relman_core::store::Store;
use relman_engine::Engine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub permissions: Arc<dyn PermissionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, permissions: Arc<dyn PermissionStore>) -> Self {
        Self {
            engine: Engine::new(store),
            permissions,
        }
    }
}
