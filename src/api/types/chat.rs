//! OpenAI-compatible chat completion types

use serde::{Deserialize, Serialize};

use crate::domain::llm::{self, LlmRequest, Message, MessageRole, StreamChunk};
use crate::infrastructure::services::Completion;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl From<ChatMessageRole> for MessageRole {
    fn from(role: ChatMessageRole) -> Self {
        match role {
            ChatMessageRole::System => Self::System,
            ChatMessageRole::User => Self::User,
            // Tool output is context, never the query being routed
            ChatMessageRole::Assistant | ChatMessageRole::Tool => Self::Assistant,
        }
    }
}

/// Content part for multimodal messages; only text parts are routed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: serde_json::Value },
}

/// Text content or an array of content parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::Assistant,
            content: Some(MessageContent::Text(content.into())),
            name: None,
        }
    }
}

/// Stop sequence - can be string or array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequence {
    Single(String),
    Multiple(Vec<String>),
}

impl StopSequence {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s.clone()],
            Self::Multiple(v) => v.clone(),
        }
    }
}

/// Chat completion request (OpenAI format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Accepted for client compatibility; the router picks the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default)]
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    /// Validate sampling parameters and convert to the routed request
    pub fn to_llm_request(&self) -> Result<LlmRequest, super::ApiError> {
        use super::ApiError;

        if self.messages.is_empty() {
            return Err(ApiError::bad_request("Messages cannot be empty").with_param("messages"));
        }

        let messages: Vec<Message> = self
            .messages
            .iter()
            .map(|m| {
                Message::new(
                    m.role.into(),
                    m.content.as_ref().map(MessageContent::to_text).unwrap_or_default(),
                )
            })
            .collect();

        let mut builder = LlmRequest::builder();
        for message in messages {
            builder = builder.message(message);
        }

        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(ApiError::bad_request("Temperature must be between 0 and 2")
                    .with_param("temperature"));
            }
            builder = builder.temperature(temp);
        }

        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(
                    ApiError::bad_request("top_p must be between 0 and 1").with_param("top_p")
                );
            }
            builder = builder.top_p(top_p);
        }

        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                return Err(ApiError::bad_request("max_tokens must be positive")
                    .with_param("max_tokens"));
            }
            builder = builder.max_tokens(max_tokens);
        }

        if let Some(stop) = &self.stop {
            builder = builder.stop(stop.to_vec());
        }

        Ok(builder.build())
    }
}

/// Reason for completion finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

impl From<&llm::FinishReason> for FinishReason {
    fn from(reason: &llm::FinishReason) -> Self {
        match reason {
            llm::FinishReason::Length => Self::Length,
            llm::FinishReason::ToolCalls => Self::ToolCalls,
            llm::FinishReason::ContentFilter => Self::ContentFilter,
            llm::FinishReason::Stop | llm::FinishReason::Error => Self::Stop,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<&llm::Usage> for Usage {
    fn from(usage: &llm::Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<FinishReason>,
}

/// Chat completion response (OpenAI format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    pub fn from_completion(completion: &Completion, model: &str, request_id: &str) -> Self {
        Self {
            id: format!("chatcmpl-{}", request_id),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: ChatMessage::assistant(completion.content.clone()),
                finish_reason: Some(
                    completion
                        .finish_reason
                        .as_ref()
                        .map(FinishReason::from)
                        .unwrap_or(FinishReason::Stop),
                ),
            }],
            usage: completion.usage.as_ref().map(Usage::from),
        }
    }
}

/// Delta content for streaming
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatMessageRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamChoice {
    pub index: u32,
    pub delta: DeltaContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Streaming chat completion response chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionStreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionStreamResponse {
    fn with_delta(
        model: &str,
        request_id: &str,
        delta: DeltaContent,
        finish_reason: Option<FinishReason>,
        usage: Option<Usage>,
    ) -> Self {
        Self {
            id: format!("chatcmpl-{}", request_id),
            object: "chat.completion.chunk".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![ChatCompletionStreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
        }
    }

    /// Opening chunk announcing the assistant role
    pub fn initial(model: &str, request_id: &str) -> Self {
        let delta = DeltaContent {
            role: Some(ChatMessageRole::Assistant),
            content: None,
        };
        Self::with_delta(model, request_id, delta, None, None)
    }

    pub fn from_chunk(chunk: &StreamChunk, model: &str, request_id: &str) -> Self {
        let delta = DeltaContent {
            role: None,
            content: chunk.delta.clone(),
        };

        Self::with_delta(
            model,
            request_id,
            delta,
            chunk.finish_reason.as_ref().map(FinishReason::from),
            chunk.usage.as_ref().map(Usage::from),
        )
    }
}
