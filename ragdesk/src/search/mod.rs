//! Search module for ragdesk
//!
//! Vector similarity search over named partitions of a shared index.
//! LanceDB holds one table per partition; an in-memory store covers
//! local runs and tests.

pub mod embedding;
pub mod memory;
pub mod retriever;
pub mod types;
pub mod vector;

pub use embedding::{embedding_dimension, Embedder, FastEmbedder, HashingEmbedder};
pub use memory::InMemoryVectorStore;
pub use retriever::MultiPartitionRetriever;
pub use types::{IndexedDocument, Metadata, Partition, RetrievedPassage, SOURCE_PARTITION_KEY};
pub use vector::{LanceVectorStore, VectorStore};
