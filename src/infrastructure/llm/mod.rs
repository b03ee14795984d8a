//! Model adapter implementations

mod factory;
mod http_client;
mod openai;

pub use factory::{resolve_api_key, ModelAdapterFactory, ModelEndpointConfig};
pub use http_client::{ByteStream, HttpClient, HttpClientTrait};
pub use openai::OpenAiAdapter;

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
