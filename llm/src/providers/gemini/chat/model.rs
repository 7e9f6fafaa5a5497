use super::api::{GenerateContentRequest, GenerateContentResponse};
use crate::client::Client;
use crate::traffic_log;
use crate::{ChatChunk, ChatModel, ChatRequest, ChatStream};
use async_trait::async_trait;
use futures::StreamExt;

pub struct GeminiChatModel {
    client: Client,
    base_url: String,
    model_name: String,
}

impl GeminiChatModel {
    pub fn new(client: Client, base_url: String, model_name: String) -> Self {
        GeminiChatModel {
            client,
            base_url,
            model_name,
        }
    }

    fn model_path(&self) -> String {
        if self.model_name.starts_with("models/") {
            self.model_name.clone()
        } else {
            format!("models/{}", self.model_name)
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn stream_chat(&self, request: &ChatRequest) -> anyhow::Result<ChatStream> {
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse",
            self.base_url,
            self.model_path()
        );

        let api_request = GenerateContentRequest::from(request);
        traffic_log::log_stream_start(&self.model_name, &api_request);
        tracing::debug!(
            model = %self.model_name,
            messages = api_request.contents.len(),
            "Opening Gemini stream"
        );

        let streamed_response = match self
            .client
            .post_stream(url, &api_request, |line: &str| line.strip_prefix("data: "))
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                traffic_log::log_error(&self.model_name, &e.to_string());
                return Err(e);
            }
        };

        let model_name = self.model_name.clone();
        Ok(Box::pin(streamed_response.map(
            move |event: anyhow::Result<GenerateContentResponse>| {
                let chunk = event.and_then(ChatChunk::try_from);
                if let Err(e) = &chunk {
                    traffic_log::log_error(&model_name, &e.to_string());
                }
                chunk
            },
        )))
    }
}
