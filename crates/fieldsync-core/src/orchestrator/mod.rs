//! Sync Orchestrator
//!
//! Runs refresh cycles against the active backend:
//!
//! 1. Make sure a candidate is connected (resolving if needed)
//! 2. Issue one sequence-numbered fetch per domain, all concurrently
//! 3. Convert and apply each result independently as it completes
//! 4. Advance `last_sync`, persist, and optionally nudge the server to sync
//!
//! A domain failure never affects another domain, and a result that was
//! overtaken by a newer fetch of the same domain is dropped by the store.

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests;

use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fieldsync_types::{
    current_timestamp_ms, Entity, EntitySource, ErrorKind, NewContact, ServerCandidate, SyncDomain,
    SyncRecord, SyncReport,
};

use crate::converter;
use crate::error::AppResult;
use crate::remote::RemoteApi;
use crate::resolver::ConnectionResolver;
use crate::store::{ApplyOutcome, LocalStateStore};

/// Per-domain monotonically increasing fetch numbers, starting at 1.
#[derive(Debug, Default)]
struct SequenceIssuer {
    counters: [AtomicU64; 4],
}

impl SequenceIssuer {
    fn next(&self, domain: SyncDomain) -> u64 {
        let slot = match domain {
            SyncDomain::Contacts => &self.counters[0],
            SyncDomain::Incidents => &self.counters[1],
            SyncDomain::Analytics => &self.counters[2],
            SyncDomain::RollingSales => &self.counters[3],
        };
        slot.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteApi>,
    resolver: Arc<ConnectionResolver>,
    store: Arc<LocalStateStore>,
    sequences: SequenceIssuer,
    server_sync_after_refresh: bool,
}

impl SyncOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        resolver: Arc<ConnectionResolver>,
        store: Arc<LocalStateStore>,
    ) -> Self {
        Self {
            remote,
            resolver,
            store,
            sequences: SequenceIssuer::default(),
            server_sync_after_refresh: true,
        }
    }

    pub fn with_server_sync(mut self, enabled: bool) -> Self {
        self.server_sync_after_refresh = enabled;
        self
    }

    pub fn store(&self) -> &Arc<LocalStateStore> {
        &self.store
    }

    pub fn resolver(&self) -> &Arc<ConnectionResolver> {
        &self.resolver
    }

    /// Refresh every domain. Never fails: per-domain outcomes are in the
    /// report, connection failure leaves the store untouched.
    pub async fn refresh(&self) -> SyncReport {
        let Some(candidate) = self.ensure_connected().await else {
            return SyncReport::disconnected(ErrorKind::AllCandidatesExhausted, self.store.last_sync());
        };

        // numbers are taken before any fetch is awaited
        let issued: Vec<(SyncDomain, u64)> = SyncDomain::ALL
            .iter()
            .map(|domain| (*domain, self.sequences.next(*domain)))
            .collect();

        let fetches = issued
            .into_iter()
            .map(|(domain, sequence)| self.sync_domain(&candidate, domain, sequence));
        let records = join_all(fetches).await;

        let mut report = SyncReport {
            records,
            server: Some(candidate.name.clone()),
            connection_error: None,
            server_sync: None,
            last_sync: None,
        };

        if report.any_applied() {
            self.commit_cycle().await;
            if self.server_sync_after_refresh {
                report.server_sync = Some(self.trigger_server_sync(&candidate).await);
            }
        } else {
            self.check_connectivity(&report.records);
        }

        report.last_sync = self.store.last_sync();
        tracing::info!(
            "🔄 Refresh via {}: {} applied, {} failed",
            candidate.name,
            report.applied_count(),
            report.failed_count()
        );
        report
    }

    /// Refresh a single domain with the same ordering rules as [`refresh`](Self::refresh).
    pub async fn refresh_domain(&self, domain: SyncDomain) -> SyncRecord {
        let sequence = self.sequences.next(domain);
        let Some(candidate) = self.ensure_connected().await else {
            return SyncRecord::failed(domain, sequence, ErrorKind::AllCandidatesExhausted);
        };

        let record = self.sync_domain(&candidate, domain, sequence).await;
        if record.applied {
            self.commit_cycle().await;
        } else {
            self.check_connectivity(std::slice::from_ref(&record));
        }
        record
    }

    /// Create a contact on the backend and merge the echoed record.
    pub async fn create_contact(&self, contact: NewContact) -> Result<Entity, ErrorKind> {
        let missing = contact.missing_fields();
        if !missing.is_empty() {
            // same answer the backend gives for a missing required field
            tracing::warn!("Contact rejected, missing fields: {}", missing.join(", "));
            return Err(ErrorKind::HttpError { status: 400 });
        }

        let candidate = self
            .ensure_connected()
            .await
            .ok_or(ErrorKind::AllCandidatesExhausted)?;

        let issued_at = current_timestamp_ms();
        let payload = match self.remote.create_contact(&candidate, &contact).await {
            Ok(payload) => payload,
            Err(e) => {
                let kind = e.kind();
                tracing::warn!("⚠️ Creating contact at {} failed: {}", contact.address, e);
                if kind.is_connectivity() {
                    self.resolver.mark_unreachable(kind.clone());
                }
                return Err(kind);
            }
        };

        let entity = converter::convert_created_contact(&payload, issued_at).map_err(|e| {
            tracing::warn!("⚠️ {}", e);
            e.kind()
        })?;

        if !self.store.upsert(entity.clone()) {
            // a local edit at the same address is newer than the echo
            tracing::debug!("Stored contact {} is newer than the created echo", entity.id);
            let stored = self
                .store
                .committed()
                .domain(SyncDomain::Contacts)
                .and_then(|map| map.get(&entity.natural_key).cloned());
            return Ok(stored.unwrap_or(entity));
        }
        self.persist().await;
        tracing::info!("➕ Contact created: {}", entity.id);
        Ok(entity)
    }

    /// Record an on-device edit of a stored entity.
    ///
    /// The natural key and id are re-derived from the edited body and the
    /// entry under the old key is replaced. Returns false for sample entities
    /// and when a newer value is already stored.
    pub async fn record_local_edit(&self, entity: Entity) -> bool {
        if entity.source == EntitySource::Sample {
            tracing::warn!("Ignoring edit of sample entity {}", entity.id);
            return false;
        }

        let previous_key = entity.natural_key.clone();
        let edit = converter::rekey(entity).into_local_edit(current_timestamp_ms());
        let id = edit.id.clone();
        if !self.store.replace(&previous_key, edit) {
            tracing::debug!("Local edit of {} superseded by newer stored value", id);
            return false;
        }
        self.persist().await;
        true
    }

    pub async fn clear_cache(&self) -> AppResult<()> {
        self.store.clear().await
    }

    async fn ensure_connected(&self) -> Option<ServerCandidate> {
        if let Some(active) = self.resolver.active_candidate() {
            return Some(active);
        }
        if self.resolver.connect_with_fallback().await {
            self.resolver.active_candidate()
        } else {
            None
        }
    }

    async fn sync_domain(
        &self,
        candidate: &ServerCandidate,
        domain: SyncDomain,
        sequence: u64,
    ) -> SyncRecord {
        let issued_at = current_timestamp_ms();
        tracing::debug!("Fetching {} #{} from {}", domain, sequence, candidate.name);

        let payload = match self.remote.fetch_domain(candidate, domain).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("⚠️ {} #{} fetch failed: {}", domain, sequence, e);
                return SyncRecord::failed(domain, sequence, e.kind());
            }
        };

        let conversion = match converter::convert(domain, &payload, issued_at) {
            Ok(conversion) => conversion,
            Err(e) => {
                tracing::warn!("⚠️ {} #{} rejected: {}", domain, sequence, e);
                return SyncRecord::failed(domain, sequence, e.kind());
            }
        };

        let item_count = conversion.entities.len();
        let outcome =
            self.store
                .apply_domain(domain, sequence, conversion.entities, conversion.salespeople);

        let applied = match outcome {
            ApplyOutcome::Applied(stats) => {
                tracing::debug!("{} #{} applied: {:?}", domain, sequence, stats);
                true
            }
            ApplyOutcome::Stale { latest } => {
                tracing::debug!("{} #{} discarded, #{} already applied", domain, sequence, latest);
                false
            }
        };

        SyncRecord {
            domain,
            sequence_number: sequence,
            success: true,
            applied,
            item_count,
            error: None,
            fetched_at: Utc::now(),
        }
    }

    async fn commit_cycle(&self) {
        self.store.advance_last_sync(Utc::now());
        self.persist().await;
    }

    async fn persist(&self) {
        if let Err(e) = self.store.persist().await {
            tracing::warn!("⚠️ Failed to save snapshot: {}", e);
        }
    }

    /// Every fetch failed on transport: the active server is gone.
    fn check_connectivity(&self, records: &[SyncRecord]) {
        let mut errors = records.iter().map(|r| r.error.as_ref());
        let first = match errors.next() {
            Some(Some(kind)) if kind.is_connectivity() => kind.clone(),
            _ => return,
        };
        if errors.all(|e| e.is_some_and(ErrorKind::is_connectivity)) {
            self.resolver.mark_unreachable(first);
        }
    }

    async fn trigger_server_sync(&self, candidate: &ServerCandidate) -> bool {
        match self.remote.trigger_server_sync(candidate).await {
            Ok(()) => {
                tracing::debug!("Server-side sync triggered on {}", candidate.name);
                true
            }
            Err(e) => {
                tracing::warn!("⚠️ Server-side sync on {} failed: {}", candidate.name, e);
                false
            }
        }
    }
}
