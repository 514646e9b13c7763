pub mod ollama;
pub mod openai;

pub use ollama::{OllamaBackend, OllamaEngine};
pub use openai::{OpenAIBackend, OpenAIEngine};
