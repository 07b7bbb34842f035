//! Connection Resolver
//!
//! Finds a working backend among the configured candidates and owns the
//! session's [`ConnectionState`]. Probing never fails loudly: every per
//! candidate failure is logged and resolution moves on to the next one.


use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;

use fieldsync_client::ClientError;
use fieldsync_types::{
    ConnectionState, ConnectionStatus, ErrorKind, ServerCandidate, ServerSelection,
    ServerTestResult,
};

use crate::registry::ServerRegistry;
use crate::remote::RemoteApi;
use crate::store::LocalStateStore;

pub struct ConnectionResolver {
    remote: Arc<dyn RemoteApi>,
    registry: ServerRegistry,
    store: Arc<LocalStateStore>,
    state: watch::Sender<ConnectionState>,
    /// The persisted candidate gets the first probe only once per process.
    resume_pending: AtomicBool,
    connect_gate: Mutex<()>,
}

impl ConnectionResolver {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        registry: ServerRegistry,
        store: Arc<LocalStateStore>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::disconnected());
        Self {
            remote,
            registry,
            store,
            state,
            resume_pending: AtomicBool::new(true),
            connect_gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Stream of connection states, starting with the current one.
    pub fn subscribe(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn active_candidate(&self) -> Option<ServerCandidate> {
        self.state.borrow().active_candidate.clone()
    }

    /// Probe candidates until one answers the health check.
    ///
    /// The first call in a process tries the last-known-good candidate
    /// first; every later call starts from the highest priority again.
    /// Returns false when every candidate failed.
    pub async fn connect_with_fallback(&self) -> bool {
        let _guard = self.connect_gate.lock().await;

        let preferred = if self.resume_pending.swap(false, Ordering::SeqCst) {
            self.store
                .selected_server()
                .and_then(|selection| self.registry.find_selection(&selection))
                .map(|(index, _)| index)
        } else {
            None
        };

        self.publish(|state| {
            state.status = ConnectionStatus::Connecting;
            state.message = "Connecting...".to_string();
        });

        for (index, candidate) in self.registry.probe_order(preferred) {
            tracing::debug!("Probing {}", candidate);
            match self.remote.probe(candidate).await {
                Ok(response) => {
                    let message = format!("Connected to {} ({}ms)", candidate.name, response.latency_ms);
                    tracing::info!("✅ {}", message);
                    self.publish(|state| {
                        state.status = ConnectionStatus::Connected(candidate.clone());
                        state.active_candidate = Some(candidate.clone());
                        state.last_error = None;
                        state.last_probe_time = Some(Utc::now());
                        state.message = message;
                    });
                    self.remember(candidate, index).await;
                    return true;
                }
                Err(e) => {
                    tracing::warn!("⚠️ {} unavailable: {}", candidate, e);
                }
            }
        }

        let message = if self.registry.is_empty() {
            "No servers configured".to_string()
        } else {
            "All servers unreachable, showing cached data".to_string()
        };
        tracing::warn!("❌ {}", message);
        self.publish(|state| {
            state.status = ConnectionStatus::Disconnected;
            state.active_candidate = None;
            state.last_error = Some(ErrorKind::AllCandidatesExhausted);
            state.last_probe_time = Some(Utc::now());
            state.message = message;
        });
        false
    }

    /// Probe every candidate concurrently for troubleshooting.
    ///
    /// Results come back in priority order. Connection state is untouched.
    pub async fn test_all_servers(&self) -> Vec<ServerTestResult> {
        let probes = self
            .registry
            .candidates()
            .iter()
            .map(|candidate| self.test_one(candidate));
        join_all(probes).await
    }

    async fn test_one(&self, candidate: &ServerCandidate) -> ServerTestResult {
        let started = Instant::now();
        let result = self.remote.probe(candidate).await;
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => ServerTestResult {
                candidate: candidate.clone(),
                available: true,
                status_code: Some(response.status),
                latency_ms: response.latency_ms,
                error: None,
                detail: None,
            },
            Err(e) => {
                let status_code = match &e {
                    ClientError::Http { status, .. } => Some(*status),
                    _ => None,
                };
                ServerTestResult {
                    candidate: candidate.clone(),
                    available: false,
                    status_code,
                    latency_ms: elapsed,
                    error: Some(e.kind()),
                    detail: Some(e.to_string()),
                }
            }
        }
    }

    /// Drop the active candidate after it stopped answering, so the next
    /// refresh re-resolves.
    pub fn mark_unreachable(&self, error: ErrorKind) {
        let Some(lost) = self.active_candidate() else {
            return;
        };
        let message = format!("Lost connection to {}", lost.name);
        tracing::warn!("⚠️ {}: {}", message, error);
        self.publish(|state| {
            state.status = ConnectionStatus::Disconnected;
            state.active_candidate = None;
            state.last_error = Some(error);
            state.message = message;
        });
    }

    fn publish(&self, update: impl FnOnce(&mut ConnectionState)) {
        self.state.send_modify(update);
    }

    async fn remember(&self, candidate: &ServerCandidate, index: usize) {
        let selection = ServerSelection::from_candidate(candidate, index);
        if !self.store.set_selected_server(Some(selection)) {
            return;
        }
        if let Err(e) = self.store.persist_settings().await {
            tracing::warn!("⚠️ Failed to save selected server: {}", e);
        }
    }
}
