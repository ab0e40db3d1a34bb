//! In-process network for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{ConfluenceError, Result};
use crate::gateway::network::Network;
use crate::gateway::request::{Request, Response};

/// Routes keyed by full URL. Unrouted URLs answer 404.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Response>>,
    requests: Mutex<Vec<Request>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: u16, content_type: &str, body: &[u8]) {
        let response = Response::new(status, Some(content_type.to_string()), body.to_vec());
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn send(&self, request: &Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(ConfluenceError::Other(format!(
                "offline: {}",
                request.url
            )));
        }

        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, None, Vec::new())))
    }
}
