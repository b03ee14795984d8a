//! Chat model domain types and the adapter seam

mod adapter;
mod message;
mod request;
mod response;

pub use adapter::{LlmStream, ModelAdapter};
pub use message::{Message, MessageRole};
pub use request::{LlmRequest, LlmRequestBuilder};
pub use response::{FinishReason, StreamChunk, Usage};

#[cfg(test)]
pub use adapter::mock::MockModelAdapter;
