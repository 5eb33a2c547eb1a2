//! Fakes shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use ragdesk::error::{RagError, Result};
use ragdesk::llm::{FragmentStream, LanguageModel};
use ragdesk::pipeline::AnswerPipeline;
use ragdesk::search::{
    HashingEmbedder, InMemoryVectorStore, IndexedDocument, MultiPartitionRetriever, Partition,
    VectorStore,
};
use ragdesk_cache::{CacheConfig, TtlCache};

pub const DIM: usize = 64;

/// Model that replays fixed fragments, optionally failing after some of them
pub struct ScriptedModel {
    fragments: Vec<String>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_after: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_after(mut self, fragments: usize) -> Self {
        self.fail_after = Some(fragments);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, prompt: &str) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut items: Vec<Result<String>> = Vec::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            if self.fail_after == Some(i) {
                break;
            }
            items.push(Ok(fragment.clone()));
        }
        if self.fail_after.is_some() {
            items.push(Err(RagError::Generation("upstream reset".to_string())));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Model that yields one fragment and then never finishes
pub struct StallingModel {
    pub released: Arc<AtomicBool>,
}

impl StallingModel {
    pub fn new() -> Self {
        Self {
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl LanguageModel for StallingModel {
    fn model_id(&self) -> &str {
        "stalling"
    }

    async fn stream(&self, _prompt: &str) -> Result<FragmentStream> {
        let guard = DropFlag(Arc::clone(&self.released));
        let stream = futures::stream::iter(vec![Ok::<_, RagError>("first".to_string())])
            .chain(futures::stream::pending::<Result<String>>())
            .map(move |item| {
                let _ = &guard;
                item
            });
        Ok(Box::pin(stream))
    }
}

/// Store that always returns the same documents, truncated to k
pub struct FixedStore {
    docs: Vec<IndexedDocument>,
    pub calls: AtomicUsize,
}

impl FixedStore {
    pub fn new(docs: Vec<IndexedDocument>) -> Self {
        Self {
            docs,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorStore for FixedStore {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn similarity_search(&self, _query: &str, k: usize) -> Result<Vec<IndexedDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.iter().take(k).cloned().collect())
    }
}

/// Store whose index is never reachable
pub struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<IndexedDocument>> {
        Err(RagError::Retrieval("connection refused".to_string()))
    }
}

/// In-memory partition seeded with the given passages
pub async fn seeded_store(passages: &[(&str, &str)]) -> Arc<dyn VectorStore> {
    let store = InMemoryVectorStore::new(Arc::new(HashingEmbedder::new(DIM)));
    for (id, content) in passages {
        store
            .add_document(IndexedDocument::new(*content).with_id(*id))
            .await
            .unwrap();
    }
    Arc::new(store)
}

pub fn retriever(stores: Vec<(&str, Arc<dyn VectorStore>)>) -> MultiPartitionRetriever {
    MultiPartitionRetriever::new(
        stores
            .into_iter()
            .map(|(name, store)| (Partition::new(name, DIM), store))
            .collect(),
    )
    .unwrap()
}

pub fn pipeline(
    stores: Vec<(&str, Arc<dyn VectorStore>)>,
    model: Arc<dyn LanguageModel>,
) -> AnswerPipeline {
    pipeline_with_ttl(stores, model, Duration::from_secs(600))
}

pub fn pipeline_with_ttl(
    stores: Vec<(&str, Arc<dyn VectorStore>)>,
    model: Arc<dyn LanguageModel>,
    ttl: Duration,
) -> AnswerPipeline {
    let cache = TtlCache::new(CacheConfig::builder().ttl(ttl).max_entries(16).build());
    AnswerPipeline::new(Arc::new(retriever(stores)), model, Arc::new(cache))
}

/// Two partitions, `a` about networking and `b` about algorithms
pub async fn two_partitions() -> Vec<(&'static str, Arc<dyn VectorStore>)> {
    vec![
        (
            "a",
            seeded_store(&[("a-1", "TCP uses a three way handshake to open a connection")]).await,
        ),
        (
            "b",
            seeded_store(&[("b-1", "Binary search halves a sorted array on every step")]).await,
        ),
    ]
}
