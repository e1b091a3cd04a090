/// REST client for the monitoring backend.
///
/// Talks to the backend with the synchronous `ureq` HTTP client. Provides:
///
/// - **Snapshot**: `GET /system_data`, body passed through as JSON.
/// - **Simulation trigger**: `GET /simulate_ransomware`, returns `message`.
/// - **Welcome**: `GET /`, used by `sentinel-dash health`.
///
/// Requests are unauthenticated. There is no retry; callers decide what a
/// failure looks like on screen.
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::config::schema::BackendConfig;

/// The two backend calls a dashboard session makes.
///
/// Implemented by [`BackendClient`]; sessions take it as a trait object so
/// they can be driven without a live backend.
pub trait Backend: Send + Sync {
    /// Fetch the current system snapshot.
    fn fetch_system_data(&self) -> Result<Value>;
    /// Trigger the backend's attack simulation and return its message.
    fn simulate_attack(&self) -> Result<String>;
}

/// Response body from `GET /simulate_ransomware` and `GET /`.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: Value,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous backend HTTP client.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    agent: ureq::Agent,
    timeout: Option<Duration>,
}

impl BackendClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &BackendConfig) -> Self {
        let timeout = (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms));
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            agent: builder.build(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `GET /`: the backend's welcome message.
    pub fn welcome(&self) -> Result<String> {
        let parsed: MessageResponse = serde_json::from_value(self.get_json("/")?)
            .context("welcome response has no 'message' field")?;
        Ok(crate::protocol::display_value(&parsed.message))
    }

    /// Issue a GET and decode the body as JSON.
    ///
    /// A non-2xx status with a JSON body is still returned as that body,
    /// the same way a browser `fetch` resolves on HTTP errors. Transport
    /// failures and non-JSON bodies are errors.
    fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let resp = match self.agent.get(&url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                tracing::debug!(%url, code, "backend returned error status");
                resp
            }
            Err(e) => return Err(e).with_context(|| format!("GET {url} failed")),
        };

        resp.into_json::<Value>()
            .with_context(|| format!("GET {url} returned a non-JSON body"))
    }
}

impl Backend for BackendClient {
    fn fetch_system_data(&self) -> Result<Value> {
        self.get_json("/system_data")
    }

    fn simulate_attack(&self) -> Result<String> {
        let parsed: MessageResponse = serde_json::from_value(self.get_json("/simulate_ransomware")?)
            .context("simulation response has no 'message' field")?;
        Ok(crate::protocol::display_value(&parsed.message))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_default_config() {
        let client = BackendClient::from_config(&BackendConfig::default());
        assert_eq!(client.base_url(), "http://127.0.0.1:8001");
        assert_eq!(client.timeout(), None);
    }

    #[test]
    fn client_strips_trailing_slash_and_keeps_timeout() {
        let config = BackendConfig {
            url: "http://monitor:8001/".to_string(),
            timeout_ms: 2500,
            ..BackendConfig::default()
        };
        let client = BackendClient::from_config(&config);
        assert_eq!(client.base_url(), "http://monitor:8001");
        assert_eq!(client.timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn unreachable_backend_is_an_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = BackendConfig {
            url: format!("http://127.0.0.1:{port}"),
            timeout_ms: 1000,
            ..BackendConfig::default()
        };
        let client = BackendClient::from_config(&config);
        assert!(client.fetch_system_data().is_err());
        assert!(client.simulate_attack().is_err());
    }
}
