//! Multi-turn chat over one engine session.

use tracing::{debug, error};

use crate::engine::{CompletionRequest, CompletionResponse, EngineBackend, PendingRequest};
use crate::error::EngineResult;
use crate::session::EngineSession;
use crate::state::ChatMessage;

pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 800;
pub const CHAT_INIT_TEXT: &str = "Initializing engine...";
pub const CHAT_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug)]
pub struct ChatView {
    session: EngineSession,
    transcript: Vec<ChatMessage>,
    input: String,
}

impl ChatView {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            session: EngineSession::new(model_id, CHAT_INIT_TEXT),
            transcript: Vec::new(),
            input: String::new(),
        }
    }

    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EngineSession {
        &mut self.session
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    pub async fn initialize<F>(&mut self, backend: &dyn EngineBackend, on_progress: F)
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        self.session.initialize(backend, on_progress).await;
    }

    /// Move the input into the transcript and build the request for it.
    ///
    /// Returns `None`, changing nothing, when the input is blank or the
    /// session cannot take a request.
    pub fn begin_submit(&mut self) -> Option<PendingRequest> {
        if self.input.trim().is_empty() {
            return None;
        }
        let engine = self.session.try_begin_request()?;

        let user_text = std::mem::take(&mut self.input);
        self.transcript.push(ChatMessage::user(user_text));

        let request = CompletionRequest {
            messages: self.transcript.clone(),
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
            response_format: None,
        };
        debug!(
            turns = request.messages.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "sending chat completion"
        );
        Some(PendingRequest { engine, request })
    }

    /// Record the outcome of a request started by [`begin_submit`](Self::begin_submit)
    pub fn complete(&mut self, result: EngineResult<CompletionResponse>) {
        let reply = result.and_then(CompletionResponse::into_first_message);
        match reply {
            Ok(message) => self.transcript.push(message),
            Err(e) => {
                error!(error = %e, "error generating response");
                self.transcript.push(ChatMessage::assistant(CHAT_ERROR_TEXT));
            }
        }
        self.session.end_request();
    }

    /// Submit the current input and wait for the reply. Returns whether a turn was sent.
    pub async fn submit(&mut self) -> bool {
        let Some(pending) = self.begin_submit() else {
            return false;
        };
        let result = pending.send().await;
        self.complete(result);
        true
    }
}
