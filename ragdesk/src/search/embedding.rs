//! Embedding generation for vector search

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use crate::error::{RagError, Result};

/// Converts text into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Output vector dimension
    fn dimension(&self) -> usize;

    /// Embed a user query
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    /// Embed a stored passage
    async fn embed_document(&self, document: &str) -> Result<Vec<f32>>;
}

/// Local ONNX embedding model via fastembed
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
    dimension: usize,
    /// E5 models expect "query: " / "passage: " prefixes
    e5_prefixes: bool,
}

impl FastEmbedder {
    /// Create a new embedder with the multilingual E5 small model
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::MultilingualE5Small)
    }

    /// Resolve a configured model name such as `multilingual-e5-small`
    pub fn from_name(name: &str) -> Result<Self> {
        let model = model_by_name(name).ok_or_else(|| {
            RagError::Configuration(format!("Unsupported embedding model: {}", name))
        })?;
        Self::with_model(model)
    }

    /// Create with a specific model
    pub fn with_model(model_name: EmbeddingModel) -> Result<Self> {
        info!("Initializing embedding model: {:?}", model_name);

        let (dimension, e5_prefixes) = model_traits(&model_name);

        let mut options = InitOptions::default();
        options.model_name = model_name;
        options.show_download_progress = true;

        let model = TextEmbedding::try_new(options).map_err(|e| {
            RagError::Configuration(format!("Failed to initialize embedding model: {}", e))
        })?;

        Ok(Self {
            model: Arc::new(model),
            dimension,
            e5_prefixes,
        })
    }

    /// Run the model on the blocking pool
    async fn embed(&self, text: String) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let embeddings = tokio::task::spawn_blocking(move || model.embed(vec![text], None))
            .await
            .map_err(|e| RagError::Retrieval(format!("Embedding task failed: {}", e)))?
            .map_err(|e| RagError::Retrieval(format!("Failed to generate embedding: {}", e)))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Retrieval("No embedding generated".to_string()))
    }
}

fn model_by_name(name: &str) -> Option<EmbeddingModel> {
    match name.to_ascii_lowercase().as_str() {
        "multilingual-e5-small" => Some(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Some(EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Some(EmbeddingModel::MultilingualE5Large),
        "all-minilm-l6-v2" => Some(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Some(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Some(EmbeddingModel::BGEBaseENV15),
        _ => None,
    }
}

/// (output dimension, uses E5 prefixes)
fn model_traits(model: &EmbeddingModel) -> (usize, bool) {
    match model {
        EmbeddingModel::MultilingualE5Small => (384, true),
        EmbeddingModel::MultilingualE5Base => (768, true),
        EmbeddingModel::MultilingualE5Large => (1024, true),
        EmbeddingModel::AllMiniLML6V2 => (384, false),
        EmbeddingModel::BGESmallENV15 => (384, false),
        EmbeddingModel::BGEBaseENV15 => (768, false),
        _ => (384, false),
    }
}

/// Output dimension of a supported embedding model, without loading it
pub fn embedding_dimension(name: &str) -> Option<usize> {
    model_by_name(name).map(|m| model_traits(&m).0)
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if self.e5_prefixes {
            self.embed(format!("query: {}", query)).await
        } else {
            self.embed(query.to_string()).await
        }
    }

    async fn embed_document(&self, document: &str) -> Result<Vec<f32>> {
        if self.e5_prefixes {
            self.embed(format!("passage: {}", document)).await
        } else {
            self.embed(document.to_string()).await
        }
    }
}

/// Feature-hashing bag-of-words embedder.
///
/// Needs no model download; words sharing a bucket collide. Suitable for local
/// runs and tests, not for production relevance.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimension as u64) as usize
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(&word.to_lowercase())] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(query))
    }

    async fn embed_document(&self, document: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_embedder_is_normalized() {
        let embedder = HashingEmbedder::new(64);
        let vector = embedder.embed_text("The TCP handshake, the SYN packet");

        assert_eq!(vector.len(), 64);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_embedder_is_case_insensitive() {
        let embedder = HashingEmbedder::new(32);
        assert_eq!(embedder.embed_text("Routing"), embedder.embed_text("routing"));
    }

    #[test]
    fn test_hashing_embedder_empty_text() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed_text("  ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_unknown_model_name_is_configuration_error() {
        let result = FastEmbedder::from_name("no-such-model");
        assert!(matches!(result, Err(RagError::Configuration(_))));
    }

    #[test]
    fn test_embedding_dimension_lookup() {
        assert_eq!(embedding_dimension("multilingual-e5-small"), Some(384));
        assert_eq!(embedding_dimension("BGE-Base-EN-v1.5"), Some(768));
        assert_eq!(embedding_dimension("text-embedding-3-small"), None);
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_query_document_embedding() {
        let embedder = FastEmbedder::new().unwrap();

        let query_emb = embedder.embed_query("search query").await.unwrap();
        let doc_emb = embedder.embed_document("document content").await.unwrap();

        assert_eq!(query_emb.len(), 384);
        assert_eq!(doc_emb.len(), 384);
    }
}
