//! Common types for search module

use serde::{Deserialize, Serialize};

/// Arbitrary key/value metadata attached to an indexed passage
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key recording which partition a fanned-out passage came from
pub const SOURCE_PARTITION_KEY: &str = "source_partition";

/// A named logical subdivision of the shared vector index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Partition identifier (one per source document set)
    pub name: String,
    /// Embedding dimension; must match the embedding model's output
    pub dimension: usize,
}

impl Partition {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
        }
    }
}

/// A row returned by a vector store's similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Opaque identifier, if the index stores one
    pub id: Option<String>,
    /// Passage text
    pub content: String,
    /// Stored metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl IndexedDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One unit of retrieved context, tagged with its originating partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: Option<String>,
    pub content: String,
    /// Partition the passage was retrieved from
    pub partition: String,
    pub metadata: Metadata,
}

impl RetrievedPassage {
    pub fn from_document(doc: IndexedDocument, partition: impl Into<String>) -> Self {
        Self {
            id: doc.id,
            content: doc.content,
            partition: partition.into(),
            metadata: doc.metadata,
        }
    }
}
