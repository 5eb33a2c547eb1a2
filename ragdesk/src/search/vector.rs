//! Vector search using LanceDB

use std::path::Path;
use std::sync::Arc;

use arrow_array::{Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use tracing::{debug, info, warn};

use super::embedding::Embedder;
use super::types::{IndexedDocument, Metadata};
use crate::error::{RagError, Result};

/// A similarity-searchable collection of passages (one per partition)
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimension of the vectors held by this store
    fn dimension(&self) -> usize;

    /// Return up to `k` passages nearest to `query`, most similar first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<IndexedDocument>>;
}

/// Open a LanceDB database shared by all partition tables
pub async fn connect(db_path: impl AsRef<Path>) -> Result<Connection> {
    let db_path = db_path.as_ref();
    info!("Connecting to LanceDB at {:?}", db_path);

    lancedb::connect(db_path.to_string_lossy().as_ref())
        .execute()
        .await
        .map_err(|e| RagError::Configuration(format!("Failed to connect to LanceDB: {}", e)))
}

/// Arrow schema of a partition table
pub fn table_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, true),
        Field::new("content", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, true),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            false,
        ),
    ]))
}

/// One partition backed by a LanceDB table of the same name
pub struct LanceVectorStore {
    connection: Connection,
    table_name: String,
    embedder: Arc<dyn Embedder>,
}

impl LanceVectorStore {
    pub fn new(
        connection: Connection,
        table_name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            connection,
            table_name: table_name.into(),
            embedder,
        }
    }

    /// Open the partition table, or `None` if nothing was ever ingested into it
    async fn open_table(&self) -> Result<Option<Table>> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to list tables: {}", e)))?;

        if !table_names.contains(&self.table_name) {
            debug!("Partition table {} does not exist", self.table_name);
            return Ok(None);
        }

        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map(Some)
            .map_err(|e| RagError::Retrieval(format!("Failed to open table {}: {}", self.table_name, e)))
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<IndexedDocument>> {
        let Some(table) = self.open_table().await? else {
            return Ok(vec![]);
        };

        let query_embedding = self.embedder.embed_query(query).await?;

        let results = table
            .vector_search(query_embedding)
            .map_err(|e| RagError::Retrieval(format!("Invalid vector query: {}", e)))?
            .limit(k)
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Vector search failed: {}", e)))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to read search results: {}", e)))?;

        let mut documents = Vec::new();
        for batch in &batches {
            documents.extend(rows_to_documents(batch));
        }

        debug!(
            table = %self.table_name,
            hits = documents.len(),
            "Vector search complete"
        );
        Ok(documents)
    }
}

/// Convert result rows (already nearest-first) into documents
fn rows_to_documents(batch: &RecordBatch) -> Vec<IndexedDocument> {
    let string_col = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
    };

    let (Some(contents), ids, metadata) = (
        string_col("content"),
        string_col("id"),
        string_col("metadata"),
    ) else {
        warn!("Search result batch has no content column");
        return vec![];
    };

    (0..batch.num_rows())
        .map(|i| {
            let id = ids.filter(|c| !c.is_null(i)).map(|c| c.value(i).to_string());
            let metadata = metadata
                .filter(|c| !c.is_null(i))
                .and_then(|c| match serde_json::from_str::<Metadata>(c.value(i)) {
                    Ok(m) => Some(m),
                    Err(e) => {
                        warn!("Ignoring malformed passage metadata: {}", e);
                        None
                    }
                })
                .unwrap_or_default();

            IndexedDocument {
                id,
                content: contents.value(i).to_string(),
                metadata,
            }
        })
        .collect()
}
