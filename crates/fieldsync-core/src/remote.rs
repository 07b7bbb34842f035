//! Backend access trait for resolver and orchestrator.
//!
//! Production code uses [`BackendClient`]; tests substitute scripted doubles
//! to control completion order.

use async_trait::async_trait;
use fieldsync_client::{BackendClient, ClientError, ProbeResponse};
use fieldsync_types::{NewContact, ServerCandidate, SyncDomain};
use serde_json::Value;

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Health probe with a hard timeout.
    async fn probe(&self, candidate: &ServerCandidate) -> Result<ProbeResponse, ClientError>;

    /// Raw JSON payload of one domain's read endpoint.
    async fn fetch_domain(
        &self,
        candidate: &ServerCandidate,
        domain: SyncDomain,
    ) -> Result<Value, ClientError>;

    async fn create_contact(
        &self,
        candidate: &ServerCandidate,
        contact: &NewContact,
    ) -> Result<Value, ClientError>;

    async fn trigger_server_sync(&self, candidate: &ServerCandidate) -> Result<(), ClientError>;
}

#[async_trait]
impl RemoteApi for BackendClient {
    async fn probe(&self, candidate: &ServerCandidate) -> Result<ProbeResponse, ClientError> {
        BackendClient::probe(self, candidate).await
    }

    async fn fetch_domain(
        &self,
        candidate: &ServerCandidate,
        domain: SyncDomain,
    ) -> Result<Value, ClientError> {
        BackendClient::fetch_domain(self, candidate, domain).await
    }

    async fn create_contact(
        &self,
        candidate: &ServerCandidate,
        contact: &NewContact,
    ) -> Result<Value, ClientError> {
        BackendClient::create_contact(self, candidate, contact).await
    }

    async fn trigger_server_sync(&self, candidate: &ServerCandidate) -> Result<(), ClientError> {
        BackendClient::trigger_sync(self, candidate).await.map(|_| ())
    }
}
