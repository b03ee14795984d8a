//! Request router
//!
//! Classifies each query, answers from the semantic cache when a close enough
//! answer exists, and otherwise streams from the cheapest eligible model with
//! fallback to the next candidate. Cache failures never fail a request.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use super::semantic_cache::{CacheHit, SemanticCache};
use crate::domain::{
    CacheStatus, ClassifierConfig, ComplexityClassifier, ComplexityTier, DomainError,
    EmbeddingProvider, FeatureExtractor, Features, FinishReason, LlmRequest, LlmStream,
    ModelAdapter, ModelRegistry, ModelSelector, RouteDecision, StreamChunk, Usage,
};
use crate::infrastructure::observability::{
    record_cache_bypass, record_cache_write, record_fallback, record_route_decision,
    record_upstream_exhausted,
};

const FORWARD_BUFFER: usize = 32;

/// Per-call time budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterTimeouts {
    #[serde(default = "default_embedding_ms")]
    pub embedding_ms: u64,

    /// Applies to lookups and background writes
    #[serde(default = "default_cache_ms")]
    pub cache_ms: u64,

    /// Time allowed for a model to produce its first chunk
    #[serde(default = "default_model_first_chunk_ms")]
    pub model_first_chunk_ms: u64,
}

fn default_embedding_ms() -> u64 {
    2_000
}

fn default_cache_ms() -> u64 {
    500
}

fn default_model_first_chunk_ms() -> u64 {
    30_000
}

impl Default for RouterTimeouts {
    fn default() -> Self {
        Self {
            embedding_ms: default_embedding_ms(),
            cache_ms: default_cache_ms(),
            model_first_chunk_ms: default_model_first_chunk_ms(),
        }
    }
}

impl RouterTimeouts {
    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }

    pub fn cache(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }

    pub fn model_first_chunk(&self) -> Duration {
        Duration::from_millis(self.model_first_chunk_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub timeouts: RouterTimeouts,
}

impl RouterConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.classifier.validate()?;

        if self.timeouts.embedding_ms == 0
            || self.timeouts.cache_ms == 0
            || self.timeouts.model_first_chunk_ms == 0
        {
            return Err(DomainError::configuration("Router timeouts must be positive"));
        }

        Ok(())
    }
}

/// Answer stream returned to the caller.
///
/// Dropping it cancels the upstream model call.
pub struct ResponseStream {
    inner: ReceiverStream<Result<StreamChunk, DomainError>>,
    _cancel_on_drop: Option<DropGuard>,
}

impl ResponseStream {
    fn forwarded(
        rx: mpsc::Receiver<Result<StreamChunk, DomainError>>,
        guard: DropGuard,
    ) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            _cancel_on_drop: Some(guard),
        }
    }

    fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // Capacity covers every chunk
            let _ = tx.try_send(Ok(chunk));
        }

        Self {
            inner: ReceiverStream::new(rx),
            _cancel_on_drop: None,
        }
    }
}

impl Stream for ResponseStream {
    type Item = Result<StreamChunk, DomainError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("cancellable", &self._cancel_on_drop.is_some())
            .finish()
    }
}

/// A buffered answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

/// Routing outcome plus the answer stream
#[derive(Debug)]
pub struct RoutedResponse {
    pub decision: RouteDecision,
    pub stream: ResponseStream,
}

impl RoutedResponse {
    /// Drain the stream into a single answer, failing on the first error
    pub async fn collect(mut self) -> Result<Completion, DomainError> {
        let mut completion = Completion::default();

        while let Some(chunk) = self.stream.next().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.delta {
                completion.content.push_str(&delta);
            }
            if chunk.finish_reason.is_some() {
                completion.finish_reason = chunk.finish_reason;
            }
            if chunk.usage.is_some() {
                completion.usage = chunk.usage;
            }
        }

        Ok(completion)
    }
}

/// What the router would do with a request, without calling anything
#[derive(Debug, Clone, Serialize)]
pub struct RoutePreview {
    pub features: Features,
    pub tier: ComplexityTier,
    pub candidates: Vec<String>,
    pub cache_enabled: bool,
}

enum CacheProbe {
    Hit(CacheHit),
    Miss(Vec<f32>),
    Bypass(CacheStatus),
}

/// Cache insert performed once the answer has fully streamed
struct PendingWrite {
    cache: Arc<SemanticCache>,
    query: String,
    embedding: Vec<f32>,
    model_id: String,
    timeout: Duration,
}

impl PendingWrite {
    async fn store(self, response: String) {
        let ttl = self.cache.ttl();
        let put = self
            .cache
            .put(&self.query, self.embedding, &response, &self.model_id, ttl);

        match timeout(self.timeout, put).await {
            Ok(Ok(())) => record_cache_write(true),
            Ok(Err(e)) => {
                warn!(error = %e, model = %self.model_id, "Semantic cache write failed");
                record_cache_write(false);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Semantic cache write timed out"
                );
                record_cache_write(false);
            }
        }
    }
}

/// Routes queries to a model tier, fronted by the semantic cache
#[derive(Debug)]
pub struct RequestRouter {
    extractor: FeatureExtractor,
    classifier: ComplexityClassifier,
    selector: ModelSelector,
    registry: Arc<ModelRegistry>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    cache: Option<Arc<SemanticCache>>,
    config: RouterConfig,
}

impl RequestRouter {
    pub fn new(
        extractor: FeatureExtractor,
        registry: Arc<ModelRegistry>,
        config: RouterConfig,
    ) -> Self {
        Self {
            extractor,
            classifier: ComplexityClassifier::new(config.classifier.clone()),
            selector: ModelSelector::new(),
            registry,
            embedder: None,
            cache: None,
            config,
        }
    }

    /// Front the router with a semantic cache
    pub fn with_cache(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        cache: Arc<SemanticCache>,
    ) -> Self {
        self.embedder = Some(embedder);
        self.cache = Some(cache);
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> Option<&Arc<SemanticCache>> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Classify a query and list the candidate models in order
    pub fn preview(&self, request: &LlmRequest) -> Result<RoutePreview, DomainError> {
        let query = routable_text(request)?;
        let features = self.extractor.extract(query);
        let tier = self.classifier.classify(&features);

        let candidates = self
            .selector
            .select_within_context(tier, &self.registry, features.token_count)?
            .iter()
            .map(|adapter| adapter.id())
            .collect();

        Ok(RoutePreview {
            features,
            tier,
            candidates,
            cache_enabled: self.cache.is_some() && self.embedder.is_some(),
        })
    }

    /// Route a request and start streaming the answer
    pub async fn route(&self, request: LlmRequest) -> Result<RoutedResponse, DomainError> {
        let started = Instant::now();

        let query = routable_text(&request)?;
        let features = self.extractor.extract(query);
        let tier = self.classifier.classify(&features);

        debug!(
            tier = %tier,
            tokens = features.token_count,
            issue_signals = features.issue_signal_count,
            negativity = features.sentiment_negativity,
            "Query classified"
        );

        let cache_key = request.user_text();

        let (embedding, cache_status) = match self.probe_cache(&cache_key).await {
            CacheProbe::Hit(hit) => return Ok(self.respond_from_cache(tier, hit, started)),
            CacheProbe::Miss(embedding) => (Some(embedding), CacheStatus::Miss),
            CacheProbe::Bypass(status) => (None, status),
        };

        let candidates = self
            .selector
            .select_within_context(tier, &self.registry, features.token_count)
            .inspect_err(|e| error!(tier = %tier, error = %e, "No model can serve tier"))?;

        let mut failures = Vec::with_capacity(candidates.len());

        for (index, adapter) in candidates.iter().enumerate() {
            let model_id = adapter.id();

            match self.open_stream(adapter.as_ref(), &request).await {
                Ok((first, rest)) => {
                    let decision = RouteDecision::model_call(
                        tier,
                        model_id.clone(),
                        cache_status,
                        index + 1,
                        started.elapsed().as_millis() as u64,
                    );

                    record_route_decision(&decision);
                    info!(
                        tier = %tier,
                        model = %model_id,
                        cache_status = %cache_status,
                        attempts = decision.attempts,
                        latency_ms = decision.latency_ms,
                        "Request routed to model"
                    );

                    let write = embedding.and_then(|embedding| {
                        self.cache.as_ref().map(|cache| PendingWrite {
                            cache: Arc::clone(cache),
                            query: cache_key,
                            embedding,
                            model_id,
                            timeout: self.config.timeouts.cache(),
                        })
                    });

                    return Ok(RoutedResponse {
                        decision,
                        stream: spawn_forwarder(first, rest, write),
                    });
                }
                Err(e) => {
                    warn!(
                        model = %model_id,
                        attempt = index + 1,
                        error = %e,
                        "Model invocation failed, trying next candidate"
                    );
                    record_fallback(&model_id);
                    failures.push(format!("{}: {}", model_id, e));
                }
            }
        }

        record_upstream_exhausted(tier.as_str());
        error!(tier = %tier, attempts = candidates.len(), "All candidate models failed");

        Err(DomainError::upstream_exhausted(
            candidates.len(),
            failures.join("; "),
        ))
    }

    async fn probe_cache(&self, key: &str) -> CacheProbe {
        let (Some(embedder), Some(cache)) = (&self.embedder, &self.cache) else {
            return CacheProbe::Bypass(CacheStatus::Disabled);
        };

        let timeouts = &self.config.timeouts;

        let embedding = match timeout(timeouts.embedding(), embedder.embed(key)).await {
            Ok(Ok(embedding)) => embedding,
            Ok(Err(e)) => {
                warn!(error = %e, "Embedding failed, bypassing semantic cache");
                return bypass(CacheStatus::EmbeddingUnavailable);
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeouts.embedding_ms,
                    "Embedding timed out, bypassing semantic cache"
                );
                return bypass(CacheStatus::EmbeddingUnavailable);
            }
        };

        match timeout(timeouts.cache(), cache.lookup(&embedding, cache.threshold())).await {
            Ok(Ok(Some(hit))) => CacheProbe::Hit(hit),
            Ok(Ok(None)) => CacheProbe::Miss(embedding),
            Ok(Err(e)) => {
                warn!(error = %e, "Semantic cache lookup failed, treating as miss");
                bypass(CacheStatus::StoreUnavailable)
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeouts.cache_ms,
                    "Semantic cache lookup timed out, treating as miss"
                );
                bypass(CacheStatus::StoreUnavailable)
            }
        }
    }

    fn respond_from_cache(
        &self,
        tier: ComplexityTier,
        hit: CacheHit,
        started: Instant,
    ) -> RoutedResponse {
        let decision = RouteDecision::cache_hit(
            tier,
            hit.entry.model_id(),
            started.elapsed().as_millis() as u64,
        );

        record_route_decision(&decision);
        info!(
            tier = %tier,
            model = %decision.model_id,
            similarity = hit.similarity,
            latency_ms = decision.latency_ms,
            "Request answered from semantic cache"
        );

        let id = format!("cache-{}", hit.entry.id().chars().take(12).collect::<String>());
        let model = hit.entry.model_id().to_string();

        let chunks = vec![
            StreamChunk::new(id.clone(), model.clone()).with_delta(hit.entry.response()),
            StreamChunk::new(id, model).with_finish_reason(FinishReason::Stop),
        ];

        RoutedResponse {
            decision,
            stream: ResponseStream::from_chunks(chunks),
        }
    }

    /// Invoke a model and wait for its first chunk within the time budget
    async fn open_stream(
        &self,
        adapter: &dyn ModelAdapter,
        request: &LlmRequest,
    ) -> Result<(StreamChunk, LlmStream), DomainError> {
        let budget = self.config.timeouts.model_first_chunk();

        let first_chunk = async {
            let mut stream = adapter.invoke(request).await?;

            loop {
                match stream.next().await {
                    Some(Ok(chunk)) if has_text(&chunk) => return Ok((chunk, stream)),
                    Some(Ok(chunk)) if chunk.is_final() => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }

            Err(DomainError::provider(
                adapter.profile().provider.clone(),
                "Stream ended before producing any output",
            ))
        };

        timeout(budget, first_chunk).await.map_err(|_| {
            DomainError::timeout(format!(
                "No output within {}ms",
                budget.as_millis()
            ))
        })?
    }
}

fn has_text(chunk: &StreamChunk) -> bool {
    chunk.delta.as_deref().is_some_and(|d| !d.is_empty())
}

fn bypass(status: CacheStatus) -> CacheProbe {
    record_cache_bypass(status);
    CacheProbe::Bypass(status)
}

fn routable_text(request: &LlmRequest) -> Result<&str, DomainError> {
    match request.latest_user_text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(DomainError::validation("User message must not be empty")),
        None => Err(DomainError::validation(
            "Request must contain at least one user message",
        )),
    }
}

/// Relay the provider stream to the caller from a background task.
///
/// Events after the finish chunk, such as the usage report, are still relayed.
/// The task stops when the returned stream is dropped. The answer is written
/// to the cache only when the provider finished without error.
fn spawn_forwarder(
    first: StreamChunk,
    mut rest: LlmStream,
    write: Option<PendingWrite>,
) -> ResponseStream {
    let (tx, rx) = mpsc::channel(FORWARD_BUFFER);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    tokio::spawn(async move {
        let mut content = String::new();
        let mut finished = false;
        let mut completed = false;
        let mut failed = false;
        let mut pending = Some(Ok(first));

        loop {
            let item = match pending.take() {
                Some(item) => item,
                None => {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        next = rest.next() => next,
                    };

                    match next {
                        Some(item) => item,
                        None => {
                            completed = true;
                            break;
                        }
                    }
                }
            };

            match item {
                Ok(chunk) => {
                    if let Some(ref delta) = chunk.delta {
                        content.push_str(delta);
                    }
                    if chunk.is_final() {
                        finished = true;
                    }

                    let delivered = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => false,
                        sent = tx.send(Ok(chunk)) => sent.is_ok(),
                    };

                    if !delivered {
                        break;
                    }
                }
                Err(e) if finished => {
                    // Trailing events after the finish chunk carry no answer text.
                    debug!(error = %e, "Model stream failed after finishing");
                    completed = true;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Model stream failed mid-response");
                    failed = true;
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }

        drop(rest);

        if !completed {
            debug!("Response stream closed before completion, provider call cancelled");
        }

        if completed && !failed && !content.is_empty() {
            if let Some(write) = write {
                tokio::spawn(write.store(content));
            }
        }
    });

    ResponseStream::forwarded(rx, guard)
}
