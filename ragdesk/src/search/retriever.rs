//! Retrieval across one or all named partitions of the vector index

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use tracing::{debug, info};

use super::types::{Partition, RetrievedPassage, SOURCE_PARTITION_KEY};
use super::vector::VectorStore;
use crate::error::{RagError, Result};

/// Fetches top-k passages from one partition, or from every partition when
/// the requested one is absent or unknown.
pub struct MultiPartitionRetriever {
    /// In configuration order
    partitions: Vec<(Partition, Arc<dyn VectorStore>)>,
}

impl MultiPartitionRetriever {
    /// Build a retriever over the configured partitions.
    ///
    /// Fails with a configuration error if a name repeats or a store's
    /// dimension differs from its partition's.
    pub fn new(partitions: Vec<(Partition, Arc<dyn VectorStore>)>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (partition, store) in &partitions {
            if !seen.insert(partition.name.as_str()) {
                return Err(RagError::Configuration(format!(
                    "Duplicate partition: {}",
                    partition.name
                )));
            }
            if store.dimension() != partition.dimension {
                return Err(RagError::Configuration(format!(
                    "Partition {} expects dimension {}, store provides {}",
                    partition.name,
                    partition.dimension,
                    store.dimension()
                )));
            }
        }

        info!(
            "Retriever ready with partitions: {:?}",
            partitions.iter().map(|(p, _)| p.name.as_str()).collect::<Vec<_>>()
        );
        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().map(|(p, _)| p)
    }

    pub fn has_partition(&self, name: &str) -> bool {
        self.partitions.iter().any(|(p, _)| p.name == name)
    }

    /// Retrieve passages for `query`.
    ///
    /// With a known `partition`, only that partition is searched and results
    /// keep the store's similarity order. Otherwise every partition is searched
    /// for `top_k` passages each; each passage's metadata is tagged with its
    /// origin and the per-partition lists are concatenated in configuration
    /// order without re-ranking.
    pub async fn get_documents(
        &self,
        query: &str,
        partition: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        if top_k == 0 {
            return Err(RagError::Validation("top_k must be positive".to_string()));
        }

        let started = Instant::now();

        if let Some((target, store)) = partition
            .and_then(|name| self.partitions.iter().find(|(p, _)| p.name == name))
        {
            let docs = store.similarity_search(query, top_k).await?;
            debug!(
                partition = %target.name,
                hits = docs.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Retrieved from single partition"
            );
            return Ok(docs
                .into_iter()
                .map(|doc| RetrievedPassage::from_document(doc, target.name.clone()))
                .collect());
        }

        let searches = self.partitions.iter().map(|(p, store)| async move {
            let docs = store.similarity_search(query, top_k).await?;
            Ok::<_, RagError>(
                docs.into_iter()
                    .map(|mut doc| {
                        doc.metadata
                            .insert(SOURCE_PARTITION_KEY.to_string(), p.name.clone().into());
                        RetrievedPassage::from_document(doc, p.name.clone())
                    })
                    .collect::<Vec<_>>(),
            )
        });

        let passages: Vec<RetrievedPassage> = try_join_all(searches)
            .await?
            .into_iter()
            .flatten()
            .collect();

        debug!(
            partitions = self.partitions.len(),
            hits = passages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieved across all partitions"
        );
        Ok(passages)
    }
}
