//! Language model clients
//!
//! A [`LanguageModel`] produces text either in one piece or as a lazy stream
//! of fragments. Dropping a [`FragmentStream`] releases the underlying
//! connection or process.

pub mod claude_cli;
pub mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::Result;

pub use claude_cli::{ClaudeCli, ClaudeModel};
pub use openai::OpenAiChat;

/// Lazy, single-consumer sequence of generated text fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier of the underlying model
    fn model_id(&self) -> &str;

    /// Generate incrementally
    async fn stream(&self, prompt: &str) -> Result<FragmentStream>;

    /// Generate to completion.
    ///
    /// The default drains [`stream`](Self::stream) into one string.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut fragments = self.stream(prompt).await?;
        let mut answer = String::new();
        while let Some(fragment) = fragments.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    struct Scripted(Vec<&'static str>);

    #[async_trait]
    impl LanguageModel for Scripted {
        fn model_id(&self) -> &str {
            "scripted"
        }

        async fn stream(&self, _prompt: &str) -> Result<FragmentStream> {
            let items: Vec<Result<String>> = self.0.iter().map(|s| Ok(s.to_string())).collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    struct Failing;

    #[async_trait]
    impl LanguageModel for Failing {
        fn model_id(&self) -> &str {
            "failing"
        }

        async fn stream(&self, _prompt: &str) -> Result<FragmentStream> {
            let items = vec![
                Ok("partial".to_string()),
                Err(RagError::Generation("connection reset".to_string())),
            ];
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    #[tokio::test]
    async fn test_default_complete_concatenates_fragments() {
        let model = Scripted(vec!["The ", "answer", "."]);
        assert_eq!(model.complete("prompt").await.unwrap(), "The answer.");
    }

    #[tokio::test]
    async fn test_default_complete_propagates_errors() {
        let result = Failing.complete("prompt").await;
        assert!(matches!(result, Err(RagError::Generation(_))));
    }
}
