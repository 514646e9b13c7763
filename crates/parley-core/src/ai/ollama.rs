use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{
    CompletionRequest, CompletionResponse, Engine, EngineBackend, ProgressFn, ResponseFormat,
};
use crate::error::{EngineError, EngineResult};
use crate::state::ChatMessage;

#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

/// One line of the newline-delimited `/api/pull` stream
#[derive(Deserialize, Debug, PartialEq)]
struct PullStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: &str, connect_timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn list_models(&self) -> EngineResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(EngineError::Api(format!(
                "Failed to list models: {}",
                response.status()
            )));
        }

        let models: OllamaModelsResponse = response.json().await?;
        Ok(models.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn has_model(&self, name: &str) -> EngineResult<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| same_model(m, name)))
    }

    /// Pull `model_id` onto the server, streaming byte progress
    async fn pull(&self, model_id: &str, progress: &ProgressFn) -> EngineResult<()> {
        let url = format!("{}/api/pull", self.base_url);
        let mut response = self
            .client
            .post(&url)
            .json(&PullRequest { model: model_id, stream: true })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body, model_id));
        }

        let mut lines = LineBuffer::default();
        let mut layers = PullProgress::default();
        while let Some(chunk) = response.chunk().await? {
            for line in lines.push(&chunk) {
                layers.apply(&line, progress)?;
            }
        }
        if let Some(line) = lines.finish() {
            layers.apply(&line, progress)?;
        }
        Ok(())
    }

    /// An empty chat asks the server to load the model into memory
    async fn warm_up(&self, model_id: &str) -> EngineResult<()> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: model_id,
            messages: &[],
            stream: false,
            options: None,
            format: None,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body, model_id));
        }
        Ok(())
    }
}

#[async_trait]
impl EngineBackend for OllamaBackend {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn load(&self, model_id: &str, progress: ProgressFn) -> EngineResult<Arc<dyn Engine>> {
        if self.has_model(model_id).await? {
            info!(model = model_id, url = %self.base_url, "model already installed");
        } else {
            info!(model = model_id, url = %self.base_url, "pulling model");
            self.pull(model_id, &progress).await?;
        }
        self.warm_up(model_id).await?;
        progress(1.0);

        Ok(Arc::new(OllamaEngine {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: model_id.to_string(),
        }))
    }
}

pub struct OllamaEngine {
    client: Client,
    base_url: String,
    model: String,
}

#[async_trait]
impl Engine for OllamaEngine {
    async fn create_completion(&self, request: CompletionRequest) -> EngineResult<CompletionResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let body = chat_body(&self.model, &request);

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text, &self.model));
        }

        let chat: OllamaChatResponse = response.json().await?;
        Ok(CompletionResponse::single(chat.message))
    }
}

fn chat_body<'a>(model: &'a str, request: &'a CompletionRequest) -> OllamaChatRequest<'a> {
    OllamaChatRequest {
        model,
        messages: &request.messages,
        stream: false,
        options: Some(OllamaOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        }),
        format: match request.response_format {
            Some(ResponseFormat::JsonObject) => Some("json"),
            _ => None,
        },
    }
}

fn api_error(status: reqwest::StatusCode, body: &str, model: &str) -> EngineError {
    if body.contains("not found") {
        return EngineError::ModelNotFound(model.to_string());
    }
    EngineError::Api(format!("Ollama API error ({}): {}", status, body))
}

/// Tags without an explicit version resolve to `:latest`
fn same_model(installed: &str, wanted: &str) -> bool {
    fn full(name: &str) -> std::borrow::Cow<'_, str> {
        if name.contains(':') {
            name.into()
        } else {
            format!("{}:latest", name).into()
        }
    }
    full(installed) == full(wanted)
}

/// Byte counts per layer digest, reported as one fraction for the whole model
#[derive(Default)]
struct PullProgress {
    layers: HashMap<String, (u64, u64)>,
}

impl PullProgress {
    fn apply(&mut self, line: &str, progress: &ProgressFn) -> EngineResult<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let status: PullStatus = serde_json::from_str(line)?;
        if let Some(error) = status.error {
            return Err(EngineError::Initialization(error));
        }
        match (status.completed, status.total) {
            (completed, Some(total)) if total > 0 => {
                let digest = status.digest.unwrap_or(status.status);
                self.layers.insert(digest, (completed.unwrap_or(0).min(total), total));
                progress(self.fraction());
            }
            _ => debug!(status = %status.status, "pull"),
        }
        Ok(())
    }

    fn fraction(&self) -> f32 {
        let (done, total) = self
            .layers
            .values()
            .fold((0u64, 0u64), |(d, t), (c, n)| (d + c, t + n));
        if total == 0 {
            0.0
        } else {
            done as f32 / total as f32
        }
    }
}

/// Reassembles newline-delimited records from arbitrary chunk boundaries
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}
