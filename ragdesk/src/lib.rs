pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod search;

pub use api::{ApiServer, ApiServerConfig};
pub use config::{LlmProvider, Settings};
pub use error::{RagError, Result};
pub use llm::{ClaudeCli, ClaudeModel, LanguageModel, OpenAiChat};
pub use pipeline::{AnswerPipeline, AnswerStream, QueryAnswer, SourceSummary, StreamEvent};
pub use search::{
    InMemoryVectorStore, IndexedDocument, LanceVectorStore, MultiPartitionRetriever, Partition,
    RetrievedPassage, VectorStore,
};
