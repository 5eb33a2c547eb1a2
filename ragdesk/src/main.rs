use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragdesk::config::{LlmProvider, Settings};
use ragdesk::llm::{ClaudeCli, LanguageModel, OpenAiChat};
use ragdesk::pipeline::{AnswerPipeline, SourceSummary, StreamEvent};
use ragdesk::search::{vector, Embedder, FastEmbedder, LanceVectorStore, Partition, VectorStore};
use ragdesk::{ApiServer, ApiServerConfig, MultiPartitionRetriever};
use ragdesk_cache::TtlCache;

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Retrieval-augmented question answering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start API server
    Serve {
        /// Host to bind to (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,

        /// Partition to search (omit to search all)
        #[arg(short, long)]
        partition: Option<String>,

        /// Passages to retrieve per partition
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env().context("Invalid configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "ragdesk={level},ragdesk_cache={level}",
                    level = settings.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }

            let pipeline = build_pipeline(&settings).await?;
            ApiServer::new(ApiServerConfig::from(&settings), pipeline)
                .start()
                .await?;
        }

        Commands::Ask {
            ref question,
            ref partition,
            top_k,
            stream,
        } => {
            let pipeline = build_pipeline(&settings).await?;

            if stream {
                let mut events = pipeline
                    .query_stream(question, partition.as_deref(), top_k)
                    .await?;
                let mut sources = Vec::new();
                let mut stdout = std::io::stdout();

                while let Some(event) = events.next().await {
                    match event? {
                        StreamEvent::Sources { sources: s, .. } => sources = s,
                        StreamEvent::Token { text } => {
                            write!(stdout, "{}", text)?;
                            stdout.flush()?;
                        }
                        StreamEvent::Complete => println!(),
                    }
                }
                print_sources(&sources);
            } else {
                let answer = pipeline
                    .query(question, partition.as_deref(), top_k)
                    .await?;
                println!("{}", answer.answer);
                print_sources(answer.sources.as_deref().unwrap_or_default());
            }
        }
    }

    Ok(())
}

async fn build_pipeline(settings: &Settings) -> Result<Arc<AnswerPipeline>> {
    let embedder: Arc<dyn Embedder> = Arc::new(
        FastEmbedder::from_name(&settings.embedding_model)
            .context("Failed to load embedding model")?,
    );

    let connection = vector::connect(&settings.vector_db_path)
        .await
        .with_context(|| format!("Failed to open vector index at {:?}", settings.vector_db_path))?;

    let partitions = settings
        .partitions
        .iter()
        .map(|name| {
            let store: Arc<dyn VectorStore> = Arc::new(LanceVectorStore::new(
                connection.clone(),
                name.as_str(),
                Arc::clone(&embedder),
            ));
            (Partition::new(name.as_str(), settings.embedding_dim), store)
        })
        .collect();
    let retriever = MultiPartitionRetriever::new(partitions)?;

    let model: Arc<dyn LanguageModel> = match settings.llm_provider {
        LlmProvider::OpenAi => {
            let api_key = settings
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is required")?;
            Arc::new(
                OpenAiChat::new(api_key, settings.llm_model.as_str())?
                    .with_base_url(settings.openai_base_url.as_str())
                    .with_temperature(settings.llm_temperature),
            )
        }
        LlmProvider::ClaudeCli => {
            let working_dir = std::env::current_dir()?;
            Arc::new(ClaudeCli::new(working_dir, settings.llm_model.parse()?))
        }
    };

    let cache = TtlCache::try_new(settings.cache_config()).context("Invalid cache configuration")?;

    Ok(Arc::new(
        AnswerPipeline::new(Arc::new(retriever), model, Arc::new(cache))
            .with_default_top_k(settings.default_top_k),
    ))
}

fn print_sources(sources: &[SourceSummary]) {
    if sources.is_empty() {
        return;
    }

    println!("\nSources:");
    for source in sources {
        match &source.id {
            Some(id) => println!("  - [{}] {}", source.partition, id),
            None => println!("  - [{}]", source.partition),
        }
    }
}
