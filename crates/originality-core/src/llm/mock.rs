//! Mock text model for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ModelError, ModelRequest, TextModel};

/// A configurable mock reply for [`MockModel`].
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Return this raw text content.
    Text(String),
    /// Fail with this error.
    Error(ModelError),
}

type Router = Box<dyn Fn(&ModelRequest) -> MockReply + Send + Sync>;

/// A hand-rolled mock implementing [`TextModel`] for tests.
///
/// Replies come from a router closure (so one mock can answer each prompt
/// differently), a sequence (last one repeated), or a fixed reply. Every
/// request is recorded.
pub struct MockModel {
    router: Option<Router>,
    replies: Mutex<Vec<MockReply>>,
    fallback: MockReply,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModel {
    /// Create a mock that always replies with `reply`.
    pub fn new(reply: MockReply) -> Self {
        Self {
            router: None,
            replies: Mutex::new(Vec::new()),
            fallback: reply,
            delay: None,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    /// Always fail with `error`.
    pub fn failing(error: ModelError) -> Self {
        Self::new(MockReply::Error(error))
    }

    /// Reply in order, repeating the last reply once exhausted.
    pub fn with_sequence(mut replies: Vec<MockReply>) -> Self {
        let fallback = replies
            .last()
            .cloned()
            .unwrap_or(MockReply::Error(ModelError::EmptyResponse));
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            ..Self::new(fallback)
        }
    }

    /// Choose the reply from the request itself.
    pub fn routed(router: impl Fn(&ModelRequest) -> MockReply + Send + Sync + 'static) -> Self {
        Self {
            router: Some(Box::new(router)),
            ..Self::new(MockReply::Error(ModelError::EmptyResponse))
        }
    }

    /// Set simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `generate()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self, request: &ModelRequest) -> MockReply {
        if let Some(router) = &self.router {
            return router(request);
        }
        match self.replies.lock() {
            Ok(mut seq) => seq.pop().unwrap_or_else(|| self.fallback.clone()),
            Err(_) => self.fallback.clone(),
        }
    }
}

impl TextModel for MockModel {
    fn generate<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        let reply = self.next_reply(request);
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            match reply {
                MockReply::Text(text) => Ok(text),
                MockReply::Error(e) => Err(e),
            }
        })
    }
}
