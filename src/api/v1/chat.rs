//! Chat completions endpoint handler

use std::convert::Infallible;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse, Json,
};
use crate::domain::RouteDecision;
use crate::infrastructure::services::ResponseStream;

pub const X_ROUTER_TIER: HeaderName = HeaderName::from_static("x-router-tier");
pub const X_ROUTER_CACHE_HIT: HeaderName = HeaderName::from_static("x-router-cache-hit");
pub const X_ROUTER_CACHE_STATUS: HeaderName = HeaderName::from_static("x-router-cache-status");
pub const X_ROUTER_MODEL: HeaderName = HeaderName::from_static("x-router-model");
pub const X_ROUTER_LATENCY_MS: HeaderName = HeaderName::from_static("x-router-latency-ms");
pub const X_ROUTER_ATTEMPTS: HeaderName = HeaderName::from_static("x-router-attempts");

/// POST /v1/chat/completions
pub async fn create_chat_completion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        request_id = %request_id,
        messages = request.messages.len(),
        stream = request.stream,
        "Processing chat completion request"
    );

    if let Some(ref hint) = request.model {
        tracing::debug!(requested_model = %hint, "Ignoring model hint, router selects the model");
    }

    let llm_request = request.to_llm_request()?;

    let routed = state.router.route(llm_request).await.inspect_err(|e| {
        if e.is_configuration() {
            error!(request_id = %request_id, error = %e, "Routing failed");
        } else {
            warn!(request_id = %request_id, error = %e, "Routing failed");
        }
    })?;

    let metadata = decision_headers(&routed.decision);
    let model = routed.decision.model_id.clone();

    if request.stream {
        let events = sse_events(routed.stream, model, request_id);
        let sse = Sse::new(events).keep_alive(KeepAlive::default());

        Ok((metadata, sse).into_response())
    } else {
        let completion = routed.collect().await?;
        let body = ChatCompletionResponse::from_completion(&completion, &model, &request_id);

        Ok((metadata, Json(body)).into_response())
    }
}

/// Routing metadata attached to every routed response
pub fn decision_headers(decision: &RouteDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(X_ROUTER_TIER, HeaderValue::from_static(decision.tier.as_str()));
    headers.insert(
        X_ROUTER_CACHE_HIT,
        HeaderValue::from_static(if decision.cache_hit { "true" } else { "false" }),
    );
    headers.insert(
        X_ROUTER_CACHE_STATUS,
        HeaderValue::from_static(decision.cache_status.as_str()),
    );
    headers.insert(X_ROUTER_LATENCY_MS, HeaderValue::from(decision.latency_ms));
    headers.insert(X_ROUTER_ATTEMPTS, HeaderValue::from(decision.attempts));

    if let Ok(model) = HeaderValue::from_str(&decision.model_id) {
        headers.insert(X_ROUTER_MODEL, model);
    }

    headers
}

/// SSE body: role chunk, one event per model chunk, then `[DONE]`.
///
/// A mid-stream failure ends the body with an `error` event instead of
/// `[DONE]`. Dropping the body cancels the upstream call.
fn sse_events(
    stream: ResponseStream,
    model: String,
    request_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let initial = json_event(
        Event::default(),
        &ChatCompletionStreamResponse::initial(&model, &request_id),
    );

    let chunks = stream::unfold(Some(stream), move |state| {
        let model = model.clone();
        let request_id = request_id.clone();

        async move {
            let mut stream = state?;

            match stream.next().await {
                Some(Ok(chunk)) => {
                    let body = ChatCompletionStreamResponse::from_chunk(&chunk, &model, &request_id);
                    Some((json_event(Event::default(), &body), Some(stream)))
                }
                Some(Err(e)) => {
                    warn!(request_id = %request_id, error = %e, "Stream failed mid-response");
                    let body = ApiError::from(e).response;
                    Some((json_event(Event::default().event("error"), &body), None))
                }
                None => Some((Event::default().data("[DONE]"), None)),
            }
        }
    });

    stream::once(async move { initial })
        .chain(chunks)
        .map(Ok)
}

fn json_event<T: Serialize>(event: Event, body: &T) -> Event {
    event.json_data(body).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize stream event");
        Event::default().event("error").data("serialization failure")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CacheStatus, ComplexityTier};

    #[test]
    fn test_decision_headers_for_model_call() {
        let decision = RouteDecision::model_call(
            ComplexityTier::Complex,
            "openai/gpt-4o",
            CacheStatus::Miss,
            2,
            840,
        );

        let headers = decision_headers(&decision);

        assert_eq!(headers[&X_ROUTER_TIER], "complex");
        assert_eq!(headers[&X_ROUTER_CACHE_HIT], "false");
        assert_eq!(headers[&X_ROUTER_CACHE_STATUS], "miss");
        assert_eq!(headers[&X_ROUTER_MODEL], "openai/gpt-4o");
        assert_eq!(headers[&X_ROUTER_LATENCY_MS], "840");
        assert_eq!(headers[&X_ROUTER_ATTEMPTS], "2");
    }

    #[test]
    fn test_decision_headers_for_cache_hit() {
        let decision = RouteDecision::cache_hit(ComplexityTier::Simple, "local/llama", 7);

        let headers = decision_headers(&decision);

        assert_eq!(headers[&X_ROUTER_CACHE_HIT], "true");
        assert_eq!(headers[&X_ROUTER_CACHE_STATUS], "hit");
        assert_eq!(headers[&X_ROUTER_ATTEMPTS], "0");
    }
}
