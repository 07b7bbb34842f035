//! # FieldSync Core
//!
//! Connection resolution and multi-domain data sync for the field sales client.
//!
//! ```text
//! fieldsync-core/src/
//! ├── registry.rs       # ordered server candidates
//! ├── resolver/         # health probing, fallback, ConnectionState owner
//! ├── converter/        # remote JSON -> Entity, per known schema
//! ├── orchestrator/     # sequence-numbered concurrent domain refresh
//! ├── store/            # LocalStateStore: committed snapshots + disk
//! ├── remote.rs         # RemoteApi seam over fieldsync-client
//! ├── config.rs         # SyncConfig
//! └── paths.rs          # data directory layout
//! ```
//!
//! The [`FieldSync`] handle wires everything together from a [`SyncConfig`].

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)
)]

pub mod config;
pub mod converter;
pub mod error;
pub mod orchestrator;
pub mod paths;
pub mod registry;
pub mod remote;
pub mod resolver;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{load_config, save_config, SyncConfig};
pub use error::{AppError, AppResult, ConvertError};
pub use orchestrator::SyncOrchestrator;
pub use registry::ServerRegistry;
pub use remote::RemoteApi;
pub use resolver::ConnectionResolver;
pub use store::{ApplyOutcome, LocalStateStore, StateSnapshot};

use std::path::Path;
use std::sync::Arc;

use fieldsync_client::BackendClient;

/// A fully wired sync session.
pub struct FieldSync {
    pub config: SyncConfig,
    pub store: Arc<LocalStateStore>,
    pub resolver: Arc<ConnectionResolver>,
    pub orchestrator: SyncOrchestrator,
}

impl FieldSync {
    /// Open the store in `data_dir` and connect components over HTTP.
    pub async fn open(data_dir: &Path, config: SyncConfig) -> AppResult<Self> {
        let client = BackendClient::new(config.client_config())?;
        Self::with_remote(data_dir, config, Arc::new(client)).await
    }

    /// Like [`open`](Self::open) with a caller-supplied backend.
    pub async fn with_remote(
        data_dir: &Path,
        config: SyncConfig,
        remote: Arc<dyn RemoteApi>,
    ) -> AppResult<Self> {
        let registry = ServerRegistry::from_config(&config)?;
        let store = Arc::new(LocalStateStore::open(data_dir).await?);
        let resolver = Arc::new(ConnectionResolver::new(remote.clone(), registry, store.clone()));
        let orchestrator = SyncOrchestrator::new(remote, resolver.clone(), store.clone())
            .with_server_sync(config.server_sync_after_refresh);

        Ok(Self {
            config,
            store,
            resolver,
            orchestrator,
        })
    }
}
