//! HTTP API types
//!
//! Chat and model types mirror the OpenAI API format for compatibility.

pub mod cache;
pub mod chat;
pub mod error;
pub mod json;
pub mod models;

pub use cache::{CacheErrorResponse, CacheOperationResponse, CacheStatsResponse};
pub use chat::{
    ChatCompletionChoice, ChatCompletionRequest, ChatCompletionResponse,
    ChatCompletionStreamChoice, ChatCompletionStreamResponse, ChatMessage, ChatMessageRole,
    ContentPart, DeltaContent, FinishReason, MessageContent, StopSequence, Usage,
};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use models::{Model as ApiModel, ModelsResponse};
