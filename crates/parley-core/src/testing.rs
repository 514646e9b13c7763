//! Scripted engine doubles for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::engine::{CompletionRequest, CompletionResponse, Engine, EngineBackend, ProgressFn};
use crate::error::{EngineError, EngineResult};
use crate::state::ChatMessage;

enum Reply {
    Content(String),
    Fail(String),
}

/// Engine that answers from a queue of scripted replies and records requests
#[derive(Default)]
pub struct FakeEngine {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, content: &str) {
        self.replies.lock().unwrap().push_back(Reply::Content(content.to_string()));
    }

    pub fn fail(&self, reason: &str) {
        self.replies.lock().unwrap().push_back(Reply::Fail(reason.to_string()));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn create_completion(&self, request: CompletionRequest) -> EngineResult<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Content(content)) => {
                Ok(CompletionResponse::single(ChatMessage::assistant(content)))
            }
            Some(Reply::Fail(reason)) => Err(EngineError::Api(reason)),
            None => Err(EngineError::Api("no scripted reply".to_string())),
        }
    }
}

/// Backend that reports fixed progress steps then hands out a [`FakeEngine`]
pub struct FakeBackend {
    engine: Arc<FakeEngine>,
    steps: Vec<f32>,
    failure: Option<String>,
    loads: AtomicUsize,
}

impl FakeBackend {
    pub fn ok(steps: Vec<f32>) -> Self {
        Self::with_engine(FakeEngine::new(), steps)
    }

    pub fn with_engine(engine: Arc<FakeEngine>, steps: Vec<f32>) -> Self {
        Self {
            engine,
            steps,
            failure: None,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::ok(vec![0.3])
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// A ready handle with no scripted replies
    pub fn engine() -> Arc<dyn Engine> {
        FakeEngine::new()
    }
}

#[async_trait]
impl EngineBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn load(&self, _model_id: &str, progress: ProgressFn) -> EngineResult<Arc<dyn Engine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        for step in &self.steps {
            progress(*step);
        }
        match &self.failure {
            Some(reason) => Err(EngineError::Initialization(reason.clone())),
            None => Ok(self.engine.clone() as Arc<dyn Engine>),
        }
    }
}
