//! UI-agnostic application state types
//!
//! These data structures are shared by every front end and don't depend on
//! any specific UI framework.

use serde::{Deserialize, Serialize};

/// A chat message, as sent to and returned by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// Format an engine-reported load fraction for display
pub fn progress_text(fraction: f32) -> String {
    format!("Loading model: {:.2}%", fraction.clamp(0.0, 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_role_deserializes_lowercase() {
        let msg: ChatMessage = serde_json::from_str(r#"{"role":"system","content":"x"}"#).unwrap();
        assert_eq!(msg.role, ChatRole::System);
    }

    #[test]
    fn test_progress_text_two_decimals() {
        assert_eq!(progress_text(0.123456), "Loading model: 12.35%");
        assert_eq!(progress_text(1.0), "Loading model: 100.00%");
    }

    #[test]
    fn test_progress_text_clamps() {
        assert_eq!(progress_text(-0.5), "Loading model: 0.00%");
        assert_eq!(progress_text(3.0), "Loading model: 100.00%");
    }
}
