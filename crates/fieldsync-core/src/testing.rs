//! Scripted [`RemoteApi`] double for unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

use fieldsync_client::{ClientError, ProbeResponse};
use fieldsync_types::{NewContact, ServerCandidate, SyncDomain, Transport};

use crate::remote::RemoteApi;

pub(crate) fn candidate(name: &str, priority: u32) -> ServerCandidate {
    ServerCandidate::new(name, format!("{}.test", name), 5001, Transport::Http, priority)
}

pub(crate) enum Reply {
    Now(Result<Value, ClientError>),
    /// Completes when the test sends on the paired channel.
    Gated(oneshot::Receiver<Result<Value, ClientError>>),
}

#[derive(Default)]
pub(crate) struct ScriptedRemote {
    healthy: Mutex<HashSet<String>>,
    probed: Mutex<Vec<String>>,
    fetches: Mutex<HashMap<SyncDomain, VecDeque<Reply>>>,
    created: Mutex<VecDeque<Result<Value, ClientError>>>,
    server_syncs: Mutex<usize>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_healthy(&self, names: &[&str]) {
        let mut healthy = self.healthy.lock().unwrap();
        healthy.clear();
        healthy.extend(names.iter().map(|n| n.to_string()));
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }

    pub fn clear_probed(&self) {
        self.probed.lock().unwrap().clear();
    }

    pub fn reply(&self, domain: SyncDomain, result: Result<Value, ClientError>) {
        self.push(domain, Reply::Now(result));
    }

    /// Queue a reply the test releases later; returns the release handle.
    pub fn gated(&self, domain: SyncDomain) -> oneshot::Sender<Result<Value, ClientError>> {
        let (tx, rx) = oneshot::channel();
        self.push(domain, Reply::Gated(rx));
        tx
    }

    pub fn created(&self, result: Result<Value, ClientError>) {
        self.created.lock().unwrap().push_back(result);
    }

    pub fn server_syncs(&self) -> usize {
        *self.server_syncs.lock().unwrap()
    }

    fn push(&self, domain: SyncDomain, reply: Reply) {
        self.fetches
            .lock()
            .unwrap()
            .entry(domain)
            .or_default()
            .push_back(reply);
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn probe(&self, candidate: &ServerCandidate) -> Result<ProbeResponse, ClientError> {
        self.probed.lock().unwrap().push(candidate.name.clone());
        if self.healthy.lock().unwrap().contains(&candidate.name) {
            Ok(ProbeResponse {
                status: 200,
                latency_ms: 3,
            })
        } else {
            Err(ClientError::NetworkUnreachable("connection refused".to_string()))
        }
    }

    async fn fetch_domain(
        &self,
        _candidate: &ServerCandidate,
        domain: SyncDomain,
    ) -> Result<Value, ClientError> {
        let reply = self
            .fetches
            .lock()
            .unwrap()
            .get_mut(&domain)
            .and_then(|queue| queue.pop_front());
        match reply {
            Some(Reply::Now(result)) => result,
            Some(Reply::Gated(rx)) => rx.await.unwrap_or(Err(ClientError::Timeout)),
            None => Err(ClientError::Timeout),
        }
    }

    async fn create_contact(
        &self,
        _candidate: &ServerCandidate,
        _contact: &NewContact,
    ) -> Result<Value, ClientError> {
        self.created
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ClientError::Timeout))
    }

    async fn trigger_server_sync(&self, _candidate: &ServerCandidate) -> Result<(), ClientError> {
        *self.server_syncs.lock().unwrap() += 1;
        Ok(())
    }
}
