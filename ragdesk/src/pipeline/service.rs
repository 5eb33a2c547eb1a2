//! Cache-aware retrieval and generation, buffered or streamed

use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures::{Stream, StreamExt};
use ragdesk_cache::{CacheStats, TtlCache};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::events::{CachedAnswer, QueryAnswer, SourceSummary, StreamEvent};
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;
use crate::prompt::{build_prompt, format_context};
use crate::search::MultiPartitionRetriever;

/// Partition used when the caller names none; not a configured partition, so
/// retrieval fans out across all of them
pub const DEFAULT_PARTITION: &str = "default";

pub const DEFAULT_TOP_K: usize = 5;

/// Lazy, single-consumer answer stream
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Cache key for a query against a partition
pub fn cache_key(partition: &str, query: &str) -> String {
    format!("{}:{}", partition, query.trim())
}

/// Orchestrates cache lookup, retrieval, prompt composition and generation
pub struct AnswerPipeline {
    retriever: Arc<MultiPartitionRetriever>,
    model: Arc<dyn LanguageModel>,
    cache: Arc<TtlCache<CachedAnswer>>,
    default_top_k: usize,
}

struct Resolved<'a> {
    partition: &'a str,
    top_k: usize,
    key: String,
}

impl AnswerPipeline {
    pub fn new(
        retriever: Arc<MultiPartitionRetriever>,
        model: Arc<dyn LanguageModel>,
        cache: Arc<TtlCache<CachedAnswer>>,
    ) -> Self {
        Self {
            retriever,
            model,
            cache,
            default_top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn cache(&self) -> &TtlCache<CachedAnswer> {
        &self.cache
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    fn resolve<'a>(
        &self,
        query: &str,
        partition: Option<&'a str>,
        top_k: Option<usize>,
    ) -> Result<Resolved<'a>> {
        if query.trim().is_empty() {
            return Err(RagError::Validation("Field 'query' is required.".to_string()));
        }
        let top_k = top_k.unwrap_or(self.default_top_k);
        if top_k == 0 {
            return Err(RagError::Validation("top_k must be positive".to_string()));
        }

        let partition = partition.unwrap_or(DEFAULT_PARTITION);
        Ok(Resolved {
            partition,
            top_k,
            key: cache_key(partition, query),
        })
    }

    /// Answer `query` in one piece.
    ///
    /// Served from the cache when a fresh entry exists; otherwise the answer
    /// is generated and cached before returning.
    pub async fn query(
        &self,
        query: &str,
        partition: Option<&str>,
        top_k: Option<usize>,
    ) -> Result<QueryAnswer> {
        let req = self.resolve(query, partition, top_k)?;
        let span = info_span!(
            "query",
            request_id = %Uuid::new_v4(),
            partition = req.partition,
            top_k = req.top_k
        );

        self.answer(query, req).instrument(span).await
    }

    async fn answer(&self, query: &str, req: Resolved<'_>) -> Result<QueryAnswer> {
        if let Some(cached) = self.cache.get(&req.key).await {
            info!(cache_key = %req.key, "Serving answer from cache");
            return Ok(QueryAnswer {
                answer: cached.answer,
                sources: Some(cached.sources),
                partition: req.partition.to_string(),
            });
        }

        let passages = self
            .retriever
            .get_documents(query, Some(req.partition), req.top_k)
            .await?;
        let prompt = build_prompt(&format_context(&passages), query);

        let started = Instant::now();
        let answer = self.model.complete(&prompt).await?;
        debug!(
            model = self.model.model_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation finished"
        );

        let sources: Vec<SourceSummary> = passages.iter().map(SourceSummary::from).collect();
        self.cache
            .set(
                req.key,
                CachedAnswer {
                    answer: answer.clone(),
                    sources: sources.clone(),
                },
            )
            .await;

        info!(passages = passages.len(), "Answer generated");
        Ok(QueryAnswer {
            answer,
            sources: Some(sources),
            partition: req.partition.to_string(),
        })
    }

    /// Answer `query` as a stream of [`StreamEvent`]s.
    ///
    /// Validation, cache lookup and retrieval happen before this returns, so a
    /// retrieval failure is the `Err` of this call and no events are produced.
    /// A generation failure arrives as the last stream item, after any tokens
    /// already delivered, and nothing is cached for it. Dropping the stream
    /// stops generation and skips the cache write.
    pub async fn query_stream(
        &self,
        query: &str,
        partition: Option<&str>,
        top_k: Option<usize>,
    ) -> Result<AnswerStream> {
        let req = self.resolve(query, partition, top_k)?;
        let span = info_span!(
            "query_stream",
            request_id = %Uuid::new_v4(),
            partition = req.partition,
            top_k = req.top_k
        );
        let partition = req.partition.to_string();

        if let Some(cached) = self.cache.get(&req.key).instrument(span.clone()).await {
            span.in_scope(|| info!(cache_key = %req.key, "Streaming answer from cache"));

            // The whole cached answer goes out as one token, even when empty
            let events: Vec<Result<StreamEvent>> = vec![
                Ok(StreamEvent::Sources {
                    sources: cached.sources,
                    partition,
                }),
                Ok(StreamEvent::Token {
                    text: cached.answer,
                }),
                Ok(StreamEvent::Complete),
            ];
            return Ok(Box::pin(futures::stream::iter(events)));
        }

        let passages = self
            .retriever
            .get_documents(query, Some(req.partition), req.top_k)
            .instrument(span.clone())
            .await?;
        let sources: Vec<SourceSummary> = passages.iter().map(SourceSummary::from).collect();
        let prompt = build_prompt(&format_context(&passages), query);

        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(Ok(StreamEvent::Sources {
            sources: sources.clone(),
            partition,
        }));

        let model = Arc::clone(&self.model);
        let cache = Arc::clone(&self.cache);
        let key = req.key;

        tokio::spawn(
            async move {
                let started = Instant::now();
                let outcome = tokio::select! {
                    _ = tx.closed() => None,
                    result = forward_tokens(model.as_ref(), &prompt, &tx) => result,
                };

                match outcome {
                    None => {
                        debug!("Consumer dropped the stream; generation stopped, nothing cached");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Generation failed mid-stream; answer not cached");
                        let _ = tx.send(Err(e));
                    }
                    Some(Ok(answer)) => {
                        debug!(
                            model = model.model_id(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Generation finished"
                        );
                        if tx.send(Ok(StreamEvent::Complete)).is_err() {
                            debug!("Consumer dropped before completion; answer not cached");
                            return;
                        }
                        cache.set(key, CachedAnswer { answer, sources }).await;
                        info!("Streamed answer cached");
                    }
                }
            }
            .instrument(span),
        );

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// Relay non-empty model fragments as `Token` events.
///
/// Returns `None` once the consumer is gone, otherwise the full answer or the
/// generation error.
async fn forward_tokens(
    model: &dyn LanguageModel,
    prompt: &str,
    tx: &UnboundedSender<Result<StreamEvent>>,
) -> Option<Result<String>> {
    let mut fragments = match model.stream(prompt).await {
        Ok(fragments) => fragments,
        Err(e) => return Some(Err(e)),
    };

    let mut answer = String::new();
    while let Some(fragment) = fragments.next().await {
        let text = match fragment {
            Ok(text) if text.is_empty() => continue,
            Ok(text) => text,
            Err(e) => return Some(Err(e)),
        };

        answer.push_str(&text);
        if tx.send(Ok(StreamEvent::Token { text })).is_err() {
            return None;
        }
    }

    Some(Ok(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_trims_query() {
        assert_eq!(cache_key("a", "  Hello \n"), "a:Hello");
        assert_eq!(cache_key("a", "Hello"), cache_key("a", " Hello "));
        assert_ne!(cache_key("a", "Hello"), cache_key("b", "Hello"));
    }

    #[test]
    fn test_default_partition_is_not_a_real_partition_name() {
        assert_eq!(cache_key(DEFAULT_PARTITION, "q"), "default:q");
    }
}
