use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::base::{CompletionRequest, EventStream, NormalizedEvent, ProviderKind, StreamingProvider};
use crate::errors::{RelayError, RelayResult};

/// A mock provider that replays pre-configured events for testing
pub struct MockProvider {
    kind: ProviderKind,
    events: Vec<NormalizedEvent>,
    /// Fail the stream with this message once every event was delivered
    fail_with: Option<String>,
    /// Refuse to open the stream at all
    reject_with: Option<String>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind, events: Vec<NormalizedEvent>) -> Self {
        Self {
            kind,
            events,
            fail_with: None,
            reject_with: None,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_with<S: Into<String>>(mut self, message: S) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn rejecting_with<S: Into<String>>(mut self, message: S) -> Self {
        self.reject_with = Some(message.into());
        self
    }

    /// Shared counter of `stream` invocations
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared log of the requests received
    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl StreamingProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn stream(&self, request: CompletionRequest) -> RelayResult<EventStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        if let Some(message) = &self.reject_with {
            return Err(RelayError::Stream(message.clone()));
        }

        let mut items: Vec<RelayResult<NormalizedEvent>> =
            self.events.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.fail_with {
            items.push(Err(RelayError::Stream(message.clone())));
        }
        Ok(stream::iter(items).boxed())
    }
}
