//! Ordered list of candidate backend endpoints.

use std::collections::HashSet;

use fieldsync_types::{ServerCandidate, ServerSelection};

use crate::config::SyncConfig;
use crate::error::{AppError, AppResult};

/// Candidates sorted by ascending priority; ties keep configuration order.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    candidates: Vec<ServerCandidate>,
}

impl ServerRegistry {
    pub fn new(candidates: Vec<ServerCandidate>) -> AppResult<Self> {
        let mut names = HashSet::new();
        for candidate in &candidates {
            if candidate.name.trim().is_empty() {
                return Err(AppError::Config("Server candidate with empty name".to_string()));
            }
            if candidate.host.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Server candidate '{}' has no host",
                    candidate.name
                )));
            }
            if candidate.port == 0 {
                return Err(AppError::Config(format!(
                    "Server candidate '{}' has port 0",
                    candidate.name
                )));
            }
            if !names.insert(candidate.name.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate server candidate name '{}'",
                    candidate.name
                )));
            }
        }

        if candidates.is_empty() {
            tracing::warn!("⚠️ Server registry is empty, connection resolution will always fail");
        }

        let mut candidates = candidates;
        // sort_by_key is stable
        candidates.sort_by_key(|c| c.priority);
        Ok(Self { candidates })
    }

    pub fn from_config(config: &SyncConfig) -> AppResult<Self> {
        Self::new(config.candidates.clone())
    }

    pub fn candidates(&self) -> &[ServerCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn position(&self, candidate: &ServerCandidate) -> Option<usize> {
        self.candidates.iter().position(|c| c == candidate)
    }

    /// Find the candidate a persisted selection refers to, if it is still configured.
    pub fn find_selection(&self, selection: &ServerSelection) -> Option<(usize, &ServerCandidate)> {
        self.candidates
            .iter()
            .enumerate()
            .find(|(_, c)| c.matches(selection))
    }

    /// Probe order: optionally a preferred candidate first, then everything
    /// else by priority.
    pub fn probe_order(&self, preferred: Option<usize>) -> Vec<(usize, &ServerCandidate)> {
        let mut order = Vec::with_capacity(self.candidates.len());
        if let Some(first) = preferred.and_then(|i| self.candidates.get(i).map(|c| (i, c))) {
            order.push(first);
        }
        order.extend(
            self.candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != preferred),
        );
        order
    }
}
