use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{ConfigError, ConfigResult, TransportError, TransportResult};

use super::{FeatureTransport, QueryRequest};

/// Longest error body kept in a [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// [`FeatureTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the configured timeouts and user agent.
    pub fn new(config: &HttpConfig) -> ConfigResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeatureTransport for ReqwestTransport {
    async fn query(&self, request: &QueryRequest) -> TransportResult<Value> {
        debug!(url = %request.url, params = request.params.len(), "Sending feature query");

        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(body),
            });
        }

        let bytes = response.bytes().await.map_err(interrupted)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Maps a failure while reading the body. Only `serde_json` produces decode errors.
fn interrupted(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout {
            message: err.to_string(),
        };
    }
    TransportError::Connect {
        message: format!("response body interrupted: {err}"),
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
