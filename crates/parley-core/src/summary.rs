//! Single-shot structured summary of a pasted chat export.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{
    CompletionRequest, CompletionResponse, EngineBackend, PendingRequest, ResponseFormat,
};
use crate::error::EngineResult;
use crate::session::EngineSession;
use crate::state::ChatMessage;

pub const SUMMARY_TEMPERATURE: f32 = 0.5;
pub const SUMMARY_MAX_TOKENS: u32 = 500;
pub const SUMMARY_INIT_TEXT: &str = "Initializing Summarizer...";
pub const SUMMARY_ERROR_TEXT: &str = "Error generating summary. Please try again.";
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a JSON summarizer. Given a JSON file containing whatsapp data, provide a concise summary in the following format: { \"total_messages\": , \"total_words\": , \"total_emojis\": }";

/// The shape the system prompt asks the model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub total_messages: i64,
    pub total_words: i64,
    pub total_emojis: i64,
}

#[derive(Debug)]
pub struct SummaryView {
    session: EngineSession,
    input: String,
    summary: String,
}

impl SummaryView {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            session: EngineSession::new(model_id, SUMMARY_INIT_TEXT),
            input: String::new(),
            summary: String::new(),
        }
    }

    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EngineSession {
        &mut self.session
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Text currently shown in the summary pane
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    /// Typed reading of the displayed summary, when it has the expected fields
    pub fn result(&self) -> Option<SummaryResult> {
        serde_json::from_str(&self.summary).ok()
    }

    pub async fn initialize<F>(&mut self, backend: &dyn EngineBackend, on_progress: F)
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        self.session.initialize(backend, on_progress).await;
    }

    pub fn begin_submit(&mut self) -> Option<PendingRequest> {
        if self.input.trim().is_empty() {
            return None;
        }
        let engine = self.session.try_begin_request()?;
        self.summary.clear();

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                ChatMessage::user(self.input.clone()),
            ],
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: SUMMARY_MAX_TOKENS,
            response_format: Some(ResponseFormat::JsonObject),
        };
        debug!(input_len = self.input.len(), "sending summary request");
        Some(PendingRequest { engine, request })
    }

    pub fn complete(&mut self, result: EngineResult<CompletionResponse>) {
        match result.and_then(render_summary) {
            Ok(pretty) => self.summary = pretty,
            Err(e) => {
                warn!(error = %e, "error generating summary");
                self.summary = SUMMARY_ERROR_TEXT.to_string();
            }
        }
        self.session.end_request();
    }

    pub async fn submit(&mut self) -> bool {
        let Some(pending) = self.begin_submit() else {
            return false;
        };
        let result = pending.send().await;
        self.complete(result);
        true
    }
}

/// Parse the reply as JSON and pretty-print it with two-space indentation
fn render_summary(response: CompletionResponse) -> EngineResult<String> {
    let message = response.into_first_message()?;
    let value: serde_json::Value = serde_json::from_str(&message.content)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;
    use crate::testing::{FakeBackend, FakeEngine};
    use std::sync::Arc;

    async fn ready_summary() -> (SummaryView, Arc<FakeEngine>) {
        let engine = FakeEngine::new();
        let backend = FakeBackend::with_engine(engine.clone(), vec![0.5, 1.0]);
        let mut view = SummaryView::new("m");
        view.initialize(&backend, |_| {}).await;
        (view, engine)
    }

    #[tokio::test]
    async fn test_valid_json_is_pretty_printed_in_order() {
        let (mut view, engine) = ready_summary().await;
        engine.reply(r#"{"total_messages":5,"total_words":20,"total_emojis":2}"#);
        *view.input_mut() = "[{\"msg\":\"hi\"}]".to_string();

        assert!(view.submit().await);

        assert_eq!(
            view.summary(),
            "{\n  \"total_messages\": 5,\n  \"total_words\": 20,\n  \"total_emojis\": 2\n}"
        );
        assert_eq!(
            view.result(),
            Some(SummaryResult { total_messages: 5, total_words: 20, total_emojis: 2 })
        );
        assert!(!view.is_busy());
    }

    #[tokio::test]
    async fn test_non_json_reply_shows_error_text() {
        let (mut view, engine) = ready_summary().await;
        engine.reply("Here is your summary: five messages");
        *view.input_mut() = "data".to_string();

        view.submit().await;

        assert_eq!(view.summary(), SUMMARY_ERROR_TEXT);
        assert_eq!(view.result(), None);
        assert!(!view.is_busy());
    }

    #[tokio::test]
    async fn test_engine_failure_shows_error_text() {
        let (mut view, engine) = ready_summary().await;
        engine.fail("timeout");
        *view.input_mut() = "data".to_string();

        view.submit().await;

        assert_eq!(view.summary(), SUMMARY_ERROR_TEXT);
    }

    #[tokio::test]
    async fn test_json_without_expected_fields_still_displayed() {
        let (mut view, engine) = ready_summary().await;
        engine.reply(r#"{"count": 3}"#);
        *view.input_mut() = "data".to_string();

        view.submit().await;

        assert_eq!(view.summary(), "{\n  \"count\": 3\n}");
        assert_eq!(view.result(), None);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let (mut view, engine) = ready_summary().await;
        engine.reply("{}");
        *view.input_mut() = "  raw export  ".to_string();

        view.submit().await;

        let requests = engine.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.temperature, 0.5);
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.response_format, Some(ResponseFormat::JsonObject));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert!(request.messages[0].content.contains("\"total_emojis\""));
        assert_eq!(request.messages[1], ChatMessage::user("  raw export  "));
        // The pasted text stays in the input box
        assert_eq!(view.input(), "  raw export  ");
    }

    #[tokio::test]
    async fn test_begin_submit_clears_previous_summary() {
        let (mut view, engine) = ready_summary().await;
        engine.reply(r#"{"total_messages":1,"total_words":1,"total_emojis":0}"#);
        *view.input_mut() = "data".to_string();
        view.submit().await;
        assert!(!view.summary().is_empty());

        let pending = view.begin_submit();
        assert!(pending.is_some());
        assert_eq!(view.summary(), "");
        assert!(view.is_busy());
    }

    #[tokio::test]
    async fn test_blank_or_not_ready_is_noop() {
        let (mut view, engine) = ready_summary().await;
        *view.input_mut() = "   \n".to_string();
        assert!(!view.submit().await);
        assert!(engine.requests().is_empty());

        let mut cold = SummaryView::new("m");
        *cold.input_mut() = "data".to_string();
        assert!(!cold.submit().await);
        assert_eq!(cold.summary(), "");
        assert_eq!(cold.input(), "data");
    }

    #[tokio::test]
    async fn test_submit_while_busy_keeps_state() {
        let (mut view, _engine) = ready_summary().await;
        *view.input_mut() = "data".to_string();
        let _pending = view.begin_submit();

        assert!(view.begin_submit().is_none());
        assert_eq!(view.summary(), "");
        assert_eq!(view.input(), "data");
    }
}
