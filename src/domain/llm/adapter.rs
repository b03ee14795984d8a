use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::{LlmRequest, StreamChunk};
use crate::domain::routing::ModelProfile;
use crate::domain::DomainError;

/// Stream type for model responses
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, DomainError>> + Send>>;

/// A backend model the router can dispatch to.
///
/// Dropping the returned stream must abort any in-flight upstream call.
#[async_trait]
pub trait ModelAdapter: Send + Sync + Debug {
    /// Static profile used for selection
    fn profile(&self) -> &ModelProfile;

    /// Start a streaming completion
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmStream, DomainError>;

    fn id(&self) -> String {
        self.profile().id()
    }
}
