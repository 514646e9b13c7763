pub mod ai;
pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod session;
pub mod state;
pub mod summary;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use ai::{OllamaBackend, OpenAIBackend};
pub use chat::ChatView;
pub use config::Config;
pub use engine::{
    CompletionRequest, CompletionResponse, Engine, EngineBackend, PendingRequest, ProgressFn,
    ResponseFormat,
};
pub use error::{EngineError, EngineResult};
pub use provider::Provider;
pub use session::{EngineSession, SessionStatus};
pub use state::{ChatMessage, ChatRole};
pub use summary::{SummaryResult, SummaryView};
pub use view::EngineView;
