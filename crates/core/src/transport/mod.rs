//! Feature service transport.
//!
//! The executor only ever talks to a [`FeatureTransport`]. Production code
//! injects [`ReqwestTransport`]; tests inject scripted fakes.

mod http;

use async_trait::async_trait;
use serde_json::Value;

pub use http::ReqwestTransport;

use crate::error::TransportResult;

/// A GET request against a layer `query` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl QueryRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
        }
    }

    /// Appends a query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Returns the first value of a query parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Issues feature service queries and returns the decoded JSON body.
///
/// Implementations map transport-level failures onto
/// [`crate::error::TransportError`]. ArcGIS in-body error objects are left in
/// the returned value for the executor to inspect.
#[async_trait]
pub trait FeatureTransport: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> TransportResult<Value>;
}
