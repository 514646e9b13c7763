use std::sync::Arc;

use crate::ai::{OllamaBackend, OpenAIBackend};
use crate::config::Config;
use crate::engine::EngineBackend;
use crate::error::EngineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAI,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAI => "openai",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Provider::Ollama),
            "openai" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Ollama => "Ollama (Local)",
            Provider::OpenAI => "OpenAI-compatible",
        }
    }

    /// Build the engine backend for this provider from `config`
    pub fn backend(&self, config: &Config) -> EngineResult<Arc<dyn EngineBackend>> {
        let timeout = config.connect_timeout();
        let backend: Arc<dyn EngineBackend> = match self {
            Provider::Ollama => Arc::new(OllamaBackend::new(config.ollama_url(), timeout)?),
            Provider::OpenAI => Arc::new(OpenAIBackend::new(
                config.openai_base_url(),
                config.openai_api_key(),
                timeout,
            )?),
        };
        Ok(backend)
    }
}
