use serde::{Deserialize, Serialize};

use crate::{ChatPayload, ChatRequest};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModelDefinition {
    pub(crate) name: String,

    pub(crate) version: Option<String>,

    pub(crate) display_name: Option<String>,

    pub(crate) description: Option<String>,

    pub(crate) input_token_limit: Option<u32>,

    pub(crate) output_token_limit: Option<u32>,

    pub(crate) thinking: Option<bool>,

    pub(crate) supported_generation_methods: Option<Vec<String>>,
}

impl ModelDefinition {
    /// Only models that can serve `generateContent` are useful for analysis
    pub(crate) fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .as_ref()
            .is_some_and(|methods| methods.iter().any(|m| m == "generateContent"))
    }
}

impl From<ModelDefinition> for crate::ModelDefinition {
    fn from(model: ModelDefinition) -> Self {
        let id = model
            .name
            .strip_prefix("models/")
            .unwrap_or(&model.name)
            .to_string();
        match model.display_name {
            Some(display_name) => crate::ModelDefinition::with_display_name(id, display_name),
            None => crate::ModelDefinition::new(id),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListModelsResponse {
    #[serde(default)]
    pub(crate) models: Vec<ModelDefinition>,

    pub(crate) next_page_token: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Model,
}

impl From<crate::api::Role> for Role {
    fn from(value: crate::api::Role) -> Self {
        match value {
            crate::api::Role::User => Role::User,
            crate::api::Role::Assistant => Role::Model,
        }
    }
}

impl From<Role> for crate::api::Role {
    fn from(value: Role) -> Self {
        match value {
            Role::User => crate::api::Role::User,
            Role::Model => crate::api::Role::Assistant,
        }
    }
}

/// Gemini inline data for images
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub(crate) mime_type: String,
    pub(crate) data: String, // base64-encoded
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum PartType {
    Text(String),
    InlineData(InlineData),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) thought: Option<bool>,

    #[serde(flatten)]
    pub(crate) data: PartType,
}

impl Part {
    pub fn new_text(text: String) -> Self {
        Part {
            thought: None,
            data: PartType::Text(text),
        }
    }

    fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

impl From<&Part> for crate::api::ContentBlock {
    fn from(part: &Part) -> Self {
        match &part.data {
            PartType::Text(t) => crate::api::ContentBlock::Text { text: t.clone() },
            PartType::InlineData(data) => crate::api::ContentBlock::Image {
                data: data.data.clone(),
                mime_type: data.mime_type.clone(),
            },
        }
    }
}

impl From<&crate::api::ContentBlock> for Part {
    fn from(block: &crate::api::ContentBlock) -> Self {
        match block {
            crate::api::ContentBlock::Text { text } => Part::new_text(text.clone()),
            crate::api::ContentBlock::Image { data, mime_type } => Part {
                thought: None,
                data: PartType::InlineData(InlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
            },
        }
    }
}

// Gemini representation of messages.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub(crate) role: Role,
    #[serde(default)]
    pub(crate) parts: Vec<Part>,
}

impl From<&Content> for crate::ChatChunk {
    fn from(content: &Content) -> Self {
        // Thought summaries are internal reasoning, not report text.
        let blocks: Vec<crate::api::ContentBlock> = content
            .parts
            .iter()
            .filter(|p| !p.is_thought())
            .map(crate::api::ContentBlock::from)
            .collect();

        crate::ChatChunk::new(content.role.into(), ChatPayload::new(blocks))
    }
}

impl From<&crate::ChatMessage> for Content {
    fn from(msg: &crate::ChatMessage) -> Self {
        Content {
            role: msg.role.into(),
            parts: msg.payload.content.iter().map(Part::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThinkingConfig {
    pub(crate) thinking_budget: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) thinking_config: Option<ThinkingConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) generation_config: Option<GenerationConfig>,
}

impl From<&ChatRequest> for GenerateContentRequest {
    fn from(request: &ChatRequest) -> Self {
        let system_instruction = request.system_instruction.as_ref().map(|text| Content {
            role: Role::User, // Role is ignored for system instructions
            parts: vec![Part::new_text(text.clone())],
        });
        let generation_config = request.thinking_budget.map(|budget| GenerationConfig {
            thinking_config: Some(ThinkingConfig {
                thinking_budget: budget,
            }),
        });

        GenerateContentRequest {
            contents: request.messages.iter().map(Content::from).collect(),
            system_instruction,
            generation_config,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub(crate) content: Option<Content>,

    pub(crate) finish_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct ApiError {
    pub(crate) code: Option<i32>,
    pub(crate) message: String,
    pub(crate) status: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<Candidate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<ApiError>,
}

impl TryFrom<GenerateContentResponse> for crate::ChatChunk {
    type Error = anyhow::Error;

    fn try_from(response: GenerateContentResponse) -> Result<Self, Self::Error> {
        if let Some(error) = response.error {
            return Err(anyhow::anyhow!(
                "Gemini API error {}: {}",
                error.status.as_deref().unwrap_or("UNKNOWN"),
                error.message
            ));
        }

        // Usage-only or finish-only events carry no content.
        Ok(response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| crate::ChatChunk::from(&content))
            .unwrap_or_else(|| crate::ChatChunk::assistant(ChatPayload::default())))
    }
}
