use crate::error::ClientError;
use crate::types::*;
use fieldsync_types::{NewContact, ServerCandidate, SyncDomain};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

/// Stateless HTTP client for the sales backend.
///
/// The server to talk to is passed per call, so one client serves every
/// candidate the resolver tries.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: ClientConfig,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `scheme://host:port/<api_base_path>/<path>`
    pub fn endpoint(&self, candidate: &ServerCandidate, path: &str) -> Result<Url, ClientError> {
        let base = self.config.api_base_path.trim_matches('/');
        let path = path.trim_start_matches('/');
        let raw = if base.is_empty() {
            format!("{}/{}", candidate.base_url(), path)
        } else {
            format!("{}/{}/{}", candidate.base_url(), base, path)
        };
        Url::parse(&raw).map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", raw, e)))
    }

    /// Liveness probe with the short probe timeout. Any 2xx is healthy.
    pub async fn probe(&self, candidate: &ServerCandidate) -> Result<ProbeResponse, ClientError> {
        let url = self.endpoint(candidate, HEALTH_PATH)?;
        let started = Instant::now();

        let resp = self
            .authorized(self.client.get(url))
            .timeout(self.config.probe_timeout)
            .send()
            .await?;

        let status = resp.status();
        let latency_ms = elapsed_ms(started.elapsed());
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: format!("Health check failed: {}", status),
            });
        }

        tracing::debug!("Probe {} -> {} in {}ms", candidate.name, status, latency_ms);
        Ok(ProbeResponse {
            status: status.as_u16(),
            latency_ms,
        })
    }

    /// `GET` the read endpoint of one domain and return the raw JSON payload.
    pub async fn fetch_domain(
        &self,
        candidate: &ServerCandidate,
        domain: SyncDomain,
    ) -> Result<Value, ClientError> {
        self.get_json(candidate, domain.path()).await
    }

    pub async fn get_json(
        &self,
        candidate: &ServerCandidate,
        path: &str,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(candidate, path)?;
        let resp = self.authorized(self.client.get(url)).send().await?;
        Self::read_json(resp).await
    }

    /// `POST /contacts`; returns the created record as echoed by the server.
    pub async fn create_contact(
        &self,
        candidate: &ServerCandidate,
        contact: &NewContact,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(candidate, SyncDomain::Contacts.path())?;
        let resp = self
            .authorized(self.client.post(url))
            .json(contact)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    /// `POST /sync`, the optional server-side sync trigger.
    pub async fn trigger_sync(&self, candidate: &ServerCandidate) -> Result<Value, ClientError> {
        let url = self.endpoint(candidate, SYNC_PATH)?;
        let resp = self
            .authorized(self.client.post(url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("Accept", "application/json")
    }

    async fn read_json(resp: Response) -> Result<Value, ClientError> {
        let status = resp.status();

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        resp.json().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Decoding(e.to_string())
            }
        })
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fieldsync_types::{ErrorKind, Transport};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn candidate_for(server: &MockServer) -> ServerCandidate {
        let url = Url::parse(&server.uri()).unwrap();
        ServerCandidate::new(
            "mock",
            url.host_str().unwrap(),
            url.port().unwrap(),
            Transport::Http,
            0,
        )
    }

    fn client() -> BackendClient {
        BackendClient::new(ClientConfig {
            api_key: "test-key".to_string(),
            probe_timeout: Duration::from_millis(300),
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_building() {
        let client = client();
        let cloud = ServerCandidate::new("cloud", "api.example.com", 443, Transport::Https, 0);

        let url = client.endpoint(&cloud, "rolling-sales").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/rolling-sales");

        let bare = BackendClient::new(ClientConfig {
            api_base_path: String::new(),
            ..Default::default()
        })
        .unwrap();
        let local = ServerCandidate::new("local", "192.168.1.50", 5001, Transport::Http, 1);
        assert_eq!(
            bare.endpoint(&local, "/health").unwrap().as_str(),
            "http://192.168.1.50:5001/health"
        );
    }

    #[tokio::test]
    async fn test_probe_success_and_failure() {
        let server = MockServer::start().await;
        let candidate = candidate_for(&server);
        let client = client();

        {
            let _guard = Mock::given(method("GET"))
                .and(path("/api/health"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "status": "healthy"
                })))
                .expect(1)
                .mount_as_scoped(&server)
                .await;

            let probe = client.probe(&candidate).await.unwrap();
            assert_eq!(probe.status, 200);
        }

        {
            let _guard = Mock::given(method("GET"))
                .and(path("/api/health"))
                .respond_with(ResponseTemplate::new(503))
                .mount_as_scoped(&server)
                .await;

            let err = client.probe(&candidate).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::HttpError { status: 503 });
        }
    }

    #[tokio::test]
    async fn test_probe_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = client().probe(&candidate_for(&server)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_sends_api_key_and_classifies_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(header(API_KEY_HEADER, "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "contacts": [], "total": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/analytics"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "Invalid or missing API key"
            })))
            .mount(&server)
            .await;

        let client = client();
        let candidate = candidate_for(&server);

        let payload = client.fetch_domain(&candidate, SyncDomain::Contacts).await.unwrap();
        assert_eq!(payload["total"], 0);

        let err = client.fetch_domain(&candidate, SyncDomain::Analytics).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HttpError { status: 401 });
    }

    #[tokio::test]
    async fn test_malformed_body_is_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/incidents"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>sleeping</html>"))
            .mount(&server)
            .await;

        let err = client()
            .fetch_domain(&candidate_for(&server), SyncDomain::Incidents)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodingError);
    }

    #[tokio::test]
    async fn test_create_contact_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/contacts"))
            .and(body_partial_json(serde_json::json!({
                "address": "123 Test Street",
                "owner_name": "Test Owner"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 7,
                "address": "123 Test Street"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let contact = NewContact {
            address: "123 Test Street".to_string(),
            city: "Test City".to_string(),
            state: "NC".to_string(),
            zip_code: "28401".to_string(),
            owner_name: "Test Owner".to_string(),
            ..Default::default()
        };

        let created = client().create_contact(&candidate_for(&server), &contact).await.unwrap();
        assert_eq!(created["id"], 7);
    }
}
