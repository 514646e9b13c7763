//! Engine lifecycle: one load per session, then a busy gate for requests.

use std::sync::Arc;

use tracing::{error, info};

use crate::engine::{Engine, EngineBackend, ProgressFn};
use crate::error::EngineResult;
use crate::state::progress_text;

pub const LOAD_SUCCESS_TEXT: &str = "Model loaded successfully!";
pub const LOAD_FAILURE_TEXT: &str = "Error loading model. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

pub struct EngineSession {
    model_id: String,
    init_text: &'static str,
    status: SessionStatus,
    busy: bool,
    progress: String,
    handle: Option<Arc<dyn Engine>>,
}

impl EngineSession {
    pub fn new(model_id: impl Into<String>, init_text: &'static str) -> Self {
        Self {
            model_id: model_id.into(),
            init_text,
            status: SessionStatus::Uninitialized,
            busy: false,
            progress: String::new(),
            handle: None,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Latest progress or status line
    pub fn progress(&self) -> &str {
        &self.progress
    }

    /// Whether a new request may be submitted right now
    pub fn can_submit(&self) -> bool {
        self.is_ready() && !self.busy
    }

    /// Enter `Loading`. Refused unless the session is still `Uninitialized`.
    pub fn begin_loading(&mut self) -> bool {
        if self.status != SessionStatus::Uninitialized {
            return false;
        }
        self.status = SessionStatus::Loading;
        self.busy = true;
        self.progress = self.init_text.to_string();
        true
    }

    pub fn report_progress(&mut self, fraction: f32) {
        if self.status == SessionStatus::Loading {
            self.progress = progress_text(fraction);
        }
    }

    /// Settle a load started with [`begin_loading`](Self::begin_loading)
    pub fn finish_loading(&mut self, result: EngineResult<Arc<dyn Engine>>) {
        if self.status != SessionStatus::Loading {
            return;
        }
        match result {
            Ok(handle) => {
                info!(model = %self.model_id, "model ready");
                self.handle = Some(handle);
                self.status = SessionStatus::Ready;
                self.progress = LOAD_SUCCESS_TEXT.to_string();
            }
            Err(e) => {
                error!(model = %self.model_id, error = %e, "error initializing engine");
                self.status = SessionStatus::Failed(e.to_string());
                self.progress = LOAD_FAILURE_TEXT.to_string();
            }
        }
        self.busy = false;
    }

    /// Load the session's model through `backend`, forwarding progress to `on_progress`.
    ///
    /// Runs at most once per session; a second call returns without touching
    /// the backend.
    pub async fn initialize<F>(&mut self, backend: &dyn EngineBackend, on_progress: F)
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        if !self.begin_loading() {
            return;
        }
        info!(model = %self.model_id, backend = backend.name(), "initializing engine");

        let progress: ProgressFn = Arc::new(on_progress);
        let result = backend.load(&self.model_id, progress).await;
        self.finish_loading(result);
    }

    /// Acquire the request gate, returning the engine handle to call
    pub fn try_begin_request(&mut self) -> Option<Arc<dyn Engine>> {
        if !self.can_submit() {
            return None;
        }
        let handle = self.handle.clone()?;
        self.busy = true;
        Some(handle)
    }

    pub fn end_request(&mut self) {
        self.busy = false;
    }

    /// Failure reason, if the load failed
    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("model_id", &self.model_id)
            .field("status", &self.status)
            .field("busy", &self.busy)
            .field("progress", &self.progress)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_initialize_success_clears_busy() {
        let backend = FakeBackend::ok(vec![0.25, 0.5, 1.0]);
        let mut session = EngineSession::new("m", "Initializing...");
        session.initialize(&backend, |_| {}).await;

        assert!(session.is_ready());
        assert!(!session.is_busy());
        assert_eq!(session.progress(), LOAD_SUCCESS_TEXT);
    }

    #[tokio::test]
    async fn test_initialize_failure_clears_busy() {
        let backend = FakeBackend::failing("no such model");
        let mut session = EngineSession::new("m", "Initializing...");
        session.initialize(&backend, |_| {}).await;

        assert!(!session.is_busy());
        assert!(!session.can_submit());
        assert_eq!(session.progress(), LOAD_FAILURE_TEXT);
        assert!(session.failure().unwrap().contains("no such model"));
    }

    #[tokio::test]
    async fn test_progress_forwarded() {
        let backend = FakeBackend::ok(vec![0.1, 0.6]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut session = EngineSession::new("m", "Initializing...");
        session
            .initialize(&backend, move |p| sink.lock().unwrap().push(p))
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![0.1, 0.6]);
    }

    #[tokio::test]
    async fn test_ready_is_terminal() {
        let backend = FakeBackend::ok(vec![]);
        let mut session = EngineSession::new("m", "Initializing...");
        session.initialize(&backend, |_| {}).await;
        session.initialize(&backend, |_| {}).await;

        assert_eq!(backend.load_count(), 1);
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_failed_is_terminal_no_retry() {
        let backend = FakeBackend::failing("boom");
        let mut session = EngineSession::new("m", "Initializing...");
        session.initialize(&backend, |_| {}).await;
        session.initialize(&backend, |_| {}).await;

        assert_eq!(backend.load_count(), 1);
        assert!(matches!(session.status(), SessionStatus::Failed(_)));
    }

    #[test]
    fn test_begin_loading_sets_init_text_and_busy() {
        let mut session = EngineSession::new("m", "Initializing Summarizer...");
        assert!(session.begin_loading());
        assert!(session.is_busy());
        assert_eq!(session.progress(), "Initializing Summarizer...");
        assert!(!session.begin_loading());

        session.report_progress(0.5);
        assert_eq!(session.progress(), "Loading model: 50.00%");
    }

    #[test]
    fn test_request_gate_requires_ready() {
        let mut session = EngineSession::new("m", "Initializing...");
        assert!(session.try_begin_request().is_none());

        session.begin_loading();
        assert!(session.try_begin_request().is_none());

        session.finish_loading(Ok(FakeBackend::engine()));
        assert!(session.try_begin_request().is_some());
        assert!(session.is_busy());
        assert!(session.try_begin_request().is_none());

        session.end_request();
        assert!(session.can_submit());
    }

    #[test]
    fn test_finish_without_begin_is_ignored() {
        let mut session = EngineSession::new("m", "Initializing...");
        session.finish_loading(Ok(FakeBackend::engine()));
        assert_eq!(session.status(), &SessionStatus::Uninitialized);
    }
}
