//! Value types flowing out of the answer pipeline

use serde::{Deserialize, Serialize};

use crate::search::{Metadata, RetrievedPassage};

/// Citation for one passage used to produce an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub id: Option<String>,
    pub partition: String,
    pub metadata: Metadata,
}

impl From<&RetrievedPassage> for SourceSummary {
    fn from(passage: &RetrievedPassage) -> Self {
        Self {
            id: passage.id.clone(),
            partition: passage.partition.clone(),
            metadata: passage.metadata.clone(),
        }
    }
}

/// What the cache stores per (partition, query) key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub answer: String,
    pub sources: Vec<SourceSummary>,
}

/// Result of a buffered query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Option<Vec<SourceSummary>>,
    pub partition: String,
}

/// One event of a streamed answer.
///
/// A well-formed stream is exactly one `Sources`, then any number of `Token`,
/// then exactly one `Complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Sources {
        sources: Vec<SourceSummary>,
        partition: String,
    },
    Token {
        text: String,
    },
    Complete,
}
