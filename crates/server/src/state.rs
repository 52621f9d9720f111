//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::vault::Vault;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands handlers their
/// dependencies explicitly - the vault handle is injected here rather than
/// living in a process-wide global.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    vault: Vault,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, vault: Vault) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, vault }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the record vault.
    #[must_use]
    pub fn vault(&self) -> &Vault {
        &self.inner.vault
    }
}
