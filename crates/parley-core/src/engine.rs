//! The contract with the external inference engine.
//!
//! Everything behind these traits (model weights, tokenization, execution)
//! belongs to the engine. Views only ever see an [`EngineBackend`] that can
//! load a model and the [`Engine`] handle it hands back.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::state::ChatMessage;

/// Callback receiving load progress as a fraction in `[0, 1]`
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// Output constraint hint passed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

impl CompletionResponse {
    /// Wrap a single message the way engines that return one reply do
    pub fn single(message: ChatMessage) -> Self {
        Self { choices: vec![Choice { message }] }
    }

    /// Take the first choice's message
    pub fn into_first_message(self) -> EngineResult<ChatMessage> {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(EngineError::EmptyResponse)
    }
}

/// A loaded model session that can answer completion requests
#[async_trait]
pub trait Engine: Send + Sync {
    async fn create_completion(&self, request: CompletionRequest) -> EngineResult<CompletionResponse>;
}

/// A request bound to the handle that will serve it, ready to be sent
pub struct PendingRequest {
    pub engine: Arc<dyn Engine>,
    pub request: CompletionRequest,
}

impl PendingRequest {
    pub async fn send(self) -> EngineResult<CompletionResponse> {
        self.engine.create_completion(self.request).await
    }
}

/// Something able to bring a model up and hand back an [`Engine`]
#[async_trait]
pub trait EngineBackend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Load `model_id`, reporting progress zero or more times
    async fn load(&self, model_id: &str, progress: ProgressFn) -> EngineResult<Arc<dyn Engine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object_format_wire_shape() {
        let json = serde_json::to_value(ResponseFormat::JsonObject).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "json_object" }));
    }

    #[test]
    fn test_request_omits_missing_format() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: 800,
            response_format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["max_tokens"], 800);
    }

    #[test]
    fn test_response_parses_openai_shape() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"X"}}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_first_message().unwrap(), ChatMessage::assistant("X"));
    }

    #[test]
    fn test_empty_choices_is_error() {
        let response = CompletionResponse { choices: vec![] };
        assert!(matches!(response.into_first_message(), Err(EngineError::EmptyResponse)));
    }
}
