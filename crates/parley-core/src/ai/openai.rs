use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::info;

use crate::engine::{CompletionRequest, CompletionResponse, Engine, EngineBackend, ProgressFn};
use crate::error::{EngineError, EngineResult};

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

/// Any server speaking the OpenAI `/v1/chat/completions` dialect
#[derive(Clone)]
pub struct OpenAIBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAIBackend {
    pub fn new(base_url: &str, api_key: Option<String>, connect_timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn list_models(&self) -> EngineResult<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let response = authorize(self.client.get(&url), self.api_key.as_deref())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Api(format!("OpenAI API error ({}): {}", status, text)));
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl EngineBackend for OpenAIBackend {
    fn name(&self) -> &str {
        "OpenAI"
    }

    /// Hosted models are already resident, so loading only confirms the model is served
    async fn load(&self, model_id: &str, progress: ProgressFn) -> EngineResult<Arc<dyn Engine>> {
        info!(model = model_id, url = %self.base_url, "checking model availability");
        progress(0.0);

        let models = self.list_models().await?;
        if !models.iter().any(|m| m == model_id) {
            return Err(EngineError::ModelNotFound(model_id.to_string()));
        }
        progress(1.0);

        Ok(Arc::new(OpenAIEngine {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: model_id.to_string(),
        }))
    }
}

pub struct OpenAIEngine {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[async_trait]
impl Engine for OpenAIEngine {
    async fn create_completion(&self, request: CompletionRequest) -> EngineResult<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = chat_body(&self.model, &request)?;

        let response = authorize(self.client.post(&url), self.api_key.as_deref())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Api(format!("OpenAI API error ({}): {}", status, text)));
        }

        Ok(response.json().await?)
    }
}

fn authorize(builder: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}

/// The request body is the engine-neutral request plus the model name
fn chat_body(model: &str, request: &CompletionRequest) -> EngineResult<serde_json::Value> {
    let mut body = serde_json::to_value(request)?;
    if let Some(map) = body.as_object_mut() {
        map.insert("model".to_string(), serde_json::Value::String(model.to_string()));
    }
    Ok(body)
}
