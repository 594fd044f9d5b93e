//! Fake feature service.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parcelkit_core::{FeatureTransport, QueryRequest, TransportError, TransportResult};
use serde_json::Value;

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(Value),
    Fail(TransportError),
    /// Never answers within any reasonable deadline.
    Hang,
}

#[derive(Debug, Default)]
struct MockState {
    replies: HashMap<String, VecDeque<Reply>>,
    requests: Vec<QueryRequest>,
}

/// Replays scripted replies per layer URL and records every request.
///
/// Jurisdictions run in parallel, so replies are queued per URL rather than
/// globally.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `reply` for the next request to `url`.
    pub fn push(&self, url: &str, reply: Reply) -> &Self {
        let mut state = self.state.lock().unwrap();
        state
            .replies
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn body(&self, url: &str, body: Value) -> &Self {
        self.push(url, Reply::Body(body))
    }

    pub fn fail(&self, url: &str, error: TransportError) -> &Self {
        self.push(url, Reply::Fail(error))
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<QueryRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url == url)
            .collect()
    }

    pub fn pending(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.replies.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl FeatureTransport for MockTransport {
    async fn query(&self, request: &QueryRequest) -> TransportResult<Value> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state
                .replies
                .get_mut(&request.url)
                .and_then(VecDeque::pop_front)
        };

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(TransportError::Timeout {
                    message: "hung".to_string(),
                })
            }
            None => Err(TransportError::Status {
                status: 404,
                body: format!("no reply scripted for {}", request.url),
            }),
        }
    }
}
