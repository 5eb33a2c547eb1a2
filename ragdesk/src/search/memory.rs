//! Brute-force in-memory vector store

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::embedding::Embedder;
use super::types::IndexedDocument;
use super::vector::VectorStore;
use crate::error::Result;

/// Exhaustive cosine-similarity search over passages held in memory.
///
/// Fast enough for a few thousand passages; used for local runs and tests.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    rows: RwLock<Vec<(IndexedDocument, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Embed and store a passage
    pub async fn add_document(&self, doc: IndexedDocument) -> Result<()> {
        let vector = self.embedder.embed_document(&doc.content).await?;
        self.rows.write().await.push((doc, vector));
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<IndexedDocument>> {
        let query_vector = self.embedder.embed_query(query).await?;
        let rows = self.rows.read().await;

        let mut scored: Vec<(f32, &IndexedDocument)> = rows
            .iter()
            .map(|(doc, vector)| (cosine_similarity(&query_vector, vector), doc))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
