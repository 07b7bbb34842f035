use std::time::Duration;

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const HEALTH_PATH: &str = "health";
pub const SYNC_PATH: &str = "sync";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    /// Prefix placed between `host:port` and the endpoint path, e.g. `/api`.
    pub api_base_path: String,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_path: "/api".to_string(),
            probe_timeout: Duration::from_secs(4),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// A successful health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub latency_ms: u64,
}
