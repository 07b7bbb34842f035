//! Local State Store
//!
//! Single owner of synchronized entities, the selected server and the last
//! sync time. The committed state is an immutable [`StateSnapshot`] held in a
//! `watch` channel; every write builds a replacement snapshot (with fresh
//! per-domain maps) and swaps it in one step, so readers never observe a
//! half-applied domain.
//!
//! Writers are crate-internal: the orchestrator applies entity results and
//! advances `last_sync`, the resolver records the selected server.

mod merge;
mod persist;
mod sample;


pub use merge::{DomainMap, MergeStats};
pub use persist::{PersistedSettings, PersistedSnapshot, SNAPSHOT_VERSION};

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use fieldsync_types::{
    AnalyticsSnapshot, Entity, EntitySource, Incident, SalesWeek, Salesperson, ServerSelection,
    SyncDomain,
};

use crate::error::AppResult;
use crate::paths::{SETTINGS_FILE, SNAPSHOT_FILE};

/// One committed, immutable view of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub domains: BTreeMap<SyncDomain, Arc<DomainMap>>,
    /// Salesperson index referenced by `Incident::assigned_salesperson_id`.
    pub salespeople: Arc<BTreeMap<i64, Salesperson>>,
    pub last_sync: Option<DateTime<Utc>>,
    pub selected_server: Option<ServerSelection>,
    /// True only for the built-in demo snapshot.
    pub sample: bool,
    /// Highest fetch sequence applied per domain.
    applied_seq: BTreeMap<SyncDomain, u64>,
}

impl StateSnapshot {
    pub fn domain(&self, domain: SyncDomain) -> Option<&DomainMap> {
        self.domains.get(&domain).map(|m| m.as_ref())
    }

    pub fn entities(&self, domain: SyncDomain) -> impl Iterator<Item = &Entity> {
        self.domain(domain).into_iter().flat_map(|m| m.values())
    }

    pub fn count(&self, domain: SyncDomain) -> usize {
        self.domain(domain).map_or(0, |m| m.len())
    }

    /// No entities in any domain.
    pub fn is_empty(&self) -> bool {
        self.domains.values().all(|m| m.is_empty())
    }

    pub fn entity_by_id(&self, domain: SyncDomain, id: &str) -> Option<&Entity> {
        self.entities(domain).find(|e| e.id == id)
    }

    pub fn assigned_salesperson(&self, incident: &Incident) -> Option<&Salesperson> {
        incident
            .assigned_salesperson_id
            .and_then(|id| self.salespeople.get(&id))
    }

    pub fn applied_sequence(&self, domain: SyncDomain) -> u64 {
        self.applied_seq.get(&domain).copied().unwrap_or(0)
    }

    fn from_persisted(persisted: PersistedSnapshot, selected_server: Option<ServerSelection>) -> Self {
        let mut domains = BTreeMap::new();
        for (domain, entities) in persisted.domains {
            let mut map = DomainMap::new();
            for mut entity in entities {
                if entity.domain() != domain || entity.source == EntitySource::Sample {
                    tracing::warn!(
                        "Dropping persisted entity '{}' that does not belong in {}",
                        entity.id,
                        domain
                    );
                    continue;
                }
                if entity.source == EntitySource::Remote {
                    entity.source = EntitySource::Cached;
                }
                merge::upsert_entity(&mut map, entity);
            }
            domains.insert(domain, Arc::new(map));
        }

        Self {
            domains,
            salespeople: Arc::new(persisted.salespeople.into_iter().map(|p| (p.id, p)).collect()),
            last_sync: persisted.last_sync,
            selected_server,
            sample: false,
            applied_seq: BTreeMap::new(),
        }
    }

    fn to_persisted(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            version: SNAPSHOT_VERSION,
            domains: self
                .domains
                .iter()
                .map(|(domain, map)| (*domain, map.values().cloned().collect()))
                .collect(),
            salespeople: self.salespeople.values().cloned().collect(),
            last_sync: self.last_sync,
        }
    }
}

/// Result of offering a domain result to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(MergeStats),
    /// A newer fetch for the domain was already applied.
    Stale { latest: u64 },
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Clone)]
struct StorePaths {
    snapshot: PathBuf,
    settings: PathBuf,
}

pub struct LocalStateStore {
    paths: Option<StorePaths>,
    state: watch::Sender<Arc<StateSnapshot>>,
    sample: Arc<StateSnapshot>,
    /// Serializes disk writes; each write serializes the latest snapshot.
    write_gate: Mutex<()>,
}

impl LocalStateStore {
    /// Open the store backed by `data_dir`, loading whatever state survived
    /// the last session. Corrupt files are set aside, never fatal.
    pub async fn open(data_dir: &Path) -> AppResult<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let paths = StorePaths {
            snapshot: data_dir.join(SNAPSHOT_FILE),
            settings: data_dir.join(SETTINGS_FILE),
        };

        let persisted = persist::load_snapshot(&paths.snapshot).await;
        let settings = persist::load_settings(&paths.settings).await;
        let snapshot = StateSnapshot::from_persisted(persisted, settings.selected_server);

        tracing::info!(
            "📦 Loaded cached state: {} contacts, {} incidents, last sync {}",
            snapshot.count(SyncDomain::Contacts),
            snapshot.count(SyncDomain::Incidents),
            snapshot
                .last_sync
                .map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
        );

        Ok(Self::with_state(Some(paths), snapshot))
    }

    /// Store without disk backing.
    pub fn in_memory() -> Self {
        Self::with_state(None, StateSnapshot::default())
    }

    fn with_state(paths: Option<StorePaths>, snapshot: StateSnapshot) -> Self {
        let (state, _) = watch::channel(Arc::new(snapshot));
        Self {
            paths,
            state,
            sample: Arc::new(sample::sample_snapshot()),
            write_gate: Mutex::new(()),
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// What the presentation layer should show: the committed state, or the
    /// sample snapshot when nothing was ever synced or cached.
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        effective(self.committed(), &self.sample)
    }

    /// The committed state, never the sample.
    pub fn committed(&self) -> Arc<StateSnapshot> {
        self.state.borrow().clone()
    }

    /// Stream of [`snapshot`](Self::snapshot) values, starting with the current one.
    pub fn subscribe(&self) -> impl Stream<Item = Arc<StateSnapshot>> + Send + Unpin + 'static {
        let sample = self.sample.clone();
        WatchStream::new(self.state.subscribe()).map(move |snapshot| effective(snapshot, &sample))
    }

    pub fn is_sample(&self) -> bool {
        self.snapshot().sample
    }

    pub fn entities(&self, domain: SyncDomain) -> Vec<Entity> {
        self.snapshot().entities(domain).cloned().collect()
    }

    pub fn contacts(&self) -> Vec<Entity> {
        self.entities(SyncDomain::Contacts)
    }

    pub fn incidents(&self) -> Vec<Entity> {
        self.entities(SyncDomain::Incidents)
    }

    pub fn analytics(&self) -> Option<AnalyticsSnapshot> {
        self.snapshot()
            .entities(SyncDomain::Analytics)
            .find_map(|e| e.as_analytics().cloned())
    }

    /// Weekly sales ordered by week.
    pub fn rolling_sales(&self) -> Vec<SalesWeek> {
        // domain maps are keyed by week start, so map order is week order
        self.snapshot()
            .entities(SyncDomain::RollingSales)
            .filter_map(|e| e.as_sales_week().cloned())
            .collect()
    }

    pub fn entity_by_id(&self, domain: SyncDomain, id: &str) -> Option<Entity> {
        self.snapshot().entity_by_id(domain, id).cloned()
    }

    pub fn assigned_salesperson(&self, incident: &Incident) -> Option<Salesperson> {
        self.snapshot().assigned_salesperson(incident).cloned()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_sync
    }

    pub fn selected_server(&self) -> Option<ServerSelection> {
        self.state.borrow().selected_server.clone()
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Merge the result of fetch `sequence` for `domain`.
    ///
    /// Sequences start at 1. A result whose sequence is not above the last
    /// one applied for the domain is discarded without touching state.
    pub(crate) fn apply_domain(
        &self,
        domain: SyncDomain,
        sequence: u64,
        entities: Vec<Entity>,
        salespeople: Vec<Salesperson>,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::Stale { latest: 0 };

        self.state.send_if_modified(|current| {
            let latest = current.applied_sequence(domain);
            if sequence <= latest {
                outcome = ApplyOutcome::Stale { latest };
                return false;
            }

            let entities: Vec<Entity> = entities
                .into_iter()
                .filter(|e| {
                    let belongs = e.domain() == domain;
                    if !belongs {
                        tracing::warn!("Ignoring {} entity '{}' in {} result", e.domain(), e.id, domain);
                    }
                    belongs
                })
                .collect();

            let existing = current.domains.get(&domain).cloned().unwrap_or_default();
            let (map, stats) = merge::merge_domain(&existing, entities);

            let mut next = StateSnapshot::clone(current);
            next.domains.insert(domain, Arc::new(map));
            // the incidents result owns the salesperson index
            if domain == SyncDomain::Incidents {
                next.salespeople = Arc::new(salespeople.into_iter().map(|p| (p.id, p)).collect());
            }
            next.applied_seq.insert(domain, sequence);
            *current = Arc::new(next);

            outcome = ApplyOutcome::Applied(stats);
            true
        });

        outcome
    }

    /// Insert or replace one entity in its domain (created contacts).
    /// Returns false if the stored value is newer.
    pub(crate) fn upsert(&self, entity: Entity) -> bool {
        let key = entity.natural_key.clone();
        self.replace(&key, entity)
    }

    /// Swap the entity stored under `previous_key` for `entity` in one step,
    /// so an edit that changes the natural key leaves no stale entry behind.
    pub(crate) fn replace(&self, previous_key: &str, entity: Entity) -> bool {
        let mut accepted = false;
        self.state.send_if_modified(|current| {
            let domain = entity.domain();
            let mut map = current
                .domains
                .get(&domain)
                .map(|m| DomainMap::clone(m))
                .unwrap_or_default();
            if !merge::replace_entity(&mut map, previous_key, entity) {
                return false;
            }

            let mut next = StateSnapshot::clone(current);
            next.domains.insert(domain, Arc::new(map));
            *current = Arc::new(next);
            accepted = true;
            true
        });
        accepted
    }

    /// Move `last_sync` forward to `at`; earlier values are ignored.
    pub(crate) fn advance_last_sync(&self, at: DateTime<Utc>) -> bool {
        self.state.send_if_modified(|current| {
            if current.last_sync.is_some_and(|prev| prev >= at) {
                return false;
            }
            let mut next = StateSnapshot::clone(current);
            next.last_sync = Some(at);
            *current = Arc::new(next);
            true
        })
    }

    pub(crate) fn set_selected_server(&self, selection: Option<ServerSelection>) -> bool {
        self.state.send_if_modified(|current| {
            if current.selected_server == selection {
                return false;
            }
            let mut next = StateSnapshot::clone(current);
            next.selected_server = selection;
            *current = Arc::new(next);
            true
        })
    }

    /// Drop every cached entity and reset `last_sync`, on disk as well.
    /// The selected server is kept.
    pub(crate) async fn clear(&self) -> AppResult<()> {
        let _guard = self.write_gate.lock().await;

        self.state.send_modify(|current| {
            *current = Arc::new(StateSnapshot {
                selected_server: current.selected_server.clone(),
                applied_seq: current.applied_seq.clone(),
                ..StateSnapshot::default()
            });
        });

        if let Some(paths) = &self.paths {
            persist::remove_if_exists(&paths.snapshot).await?;
        }
        tracing::info!("🗑️ Local cache cleared");
        Ok(())
    }

    /// Write the current committed snapshot to disk.
    pub(crate) async fn persist(&self) -> AppResult<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        let _guard = self.write_gate.lock().await;
        let persisted = self.committed().to_persisted();
        persist::write_json_atomic(&paths.snapshot, &persisted).await?;
        tracing::debug!("Snapshot saved to {}", paths.snapshot.display());
        Ok(())
    }

    pub(crate) async fn persist_settings(&self) -> AppResult<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        let _guard = self.write_gate.lock().await;
        let settings = PersistedSettings {
            selected_server: self.selected_server(),
        };
        persist::write_json_atomic(&paths.settings, &settings).await
    }
}

fn effective(committed: Arc<StateSnapshot>, sample: &Arc<StateSnapshot>) -> Arc<StateSnapshot> {
    if committed.last_sync.is_none() && committed.is_empty() {
        let mut shown = StateSnapshot::clone(sample);
        shown.selected_server = committed.selected_server.clone();
        return Arc::new(shown);
    }
    committed
}
