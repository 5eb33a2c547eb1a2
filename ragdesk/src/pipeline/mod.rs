//! Answer generation pipeline
//!
//! ```text
//! caller -> cache? -> retriever -> prompt -> model -> (stream | buffer) -> cache write
//! ```

pub mod events;
pub mod service;

pub use events::{CachedAnswer, QueryAnswer, SourceSummary, StreamEvent};
pub use service::{cache_key, AnswerPipeline, AnswerStream, DEFAULT_PARTITION, DEFAULT_TOP_K};
