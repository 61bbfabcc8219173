use std::time::Duration;

use loadsweep_common::{ErrorEnvelope, LoadSweepError, RequestTemplate, Result};

/// Transport configuration for one phase of the sweep.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://127.0.0.1:8000/v1`.
    pub base_url: String,
    /// Sent as a bearer token on every request.
    pub api_key: String,
    /// Bounds each request end to end, including reading the response body.
    pub request_timeout: Duration,
    /// Connection-pool capacity kept per host.
    pub max_connections: usize,
}

/// Client for OpenAI-compatible `/responses` endpoints.
pub struct ResponsesClient {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl ResponsesClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .build()
            .map_err(|e| LoadSweepError::ClientBuild(e.to_string()))?;
        Ok(Self { config, http_client })
    }

    /// Build the URL of the responses endpoint; trailing slashes on the
    /// configured base are tolerated.
    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }

    /// Issue one generation request. Returns the HTTP status for a 2xx
    /// response; every other outcome (timeout, connection failure, non-2xx
    /// status, unreadable body) surfaces as an error.
    pub async fn create_response(&self, payload: &RequestTemplate) -> Result<u16> {
        let response = self
            .http_client
            .post(self.responses_url())
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        // Read the body to completion: the measured latency covers the full
        // response, and the connection can go back to the pool.
        response.bytes().await.map_err(classify_send_error)?;

        Ok(status.as_u16())
    }
}

/// Map a reqwest error onto the transport error taxonomy.
fn classify_send_error(err: reqwest::Error) -> LoadSweepError {
    if err.is_timeout() {
        LoadSweepError::RequestTimeout
    } else if err.is_connect() {
        LoadSweepError::Connection(err.to_string())
    } else {
        LoadSweepError::Network(err.to_string())
    }
}

async fn parse_error_response(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> LoadSweepError {
    let error_msg = response
        .json::<ErrorEnvelope>()
        .await
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    LoadSweepError::HttpStatus(status.as_u16(), error_msg)
}
