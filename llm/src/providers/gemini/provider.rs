use super::chat::api::ListModelsResponse;
use super::chat::model::GeminiChatModel;
use crate::client::Client;
use crate::{ChatModel, ModelDefinition, ModelProvider};
use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    pub fn default(api_key: &str) -> anyhow::Result<Self> {
        Self::new(DEFAULT_BASE_URL, api_key)
    }

    /// A missing or malformed key is not rejected here; the remote service
    /// refuses the request and the failure surfaces on first use.
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        match HeaderValue::from_str(api_key) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert("x-goog-api-key", value);
            }
            Err(_) => tracing::warn!("GEMINI_API_KEY contains invalid characters, sending requests without it"),
        }
        Ok(GeminiProvider {
            client: Client::with_headers(headers)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn list_models(&self) -> anyhow::Result<Vec<ModelDefinition>> {
        let url = format!("{}/models", self.base_url);
        let response: ListModelsResponse = self.client.get(&url).await?;
        Ok(response
            .models
            .into_iter()
            .filter(|m| m.supports_generation())
            .map(ModelDefinition::from)
            .collect())
    }

    fn create_chat_model(&self, model_name: &str) -> Option<Arc<dyn ChatModel + Send + Sync>> {
        Some(Arc::new(GeminiChatModel::new(
            self.client.clone(),
            self.base_url.clone(),
            model_name.to_string(),
        )))
    }
}
