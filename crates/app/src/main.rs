use chrono::Utc;
use clap::builder::TypedValueParser as _;
use clap::{Parser, Subcommand};
use pdf_rag_core::{
    connect, connect_or_create, Answer, OllamaEmbedder, OllamaGenerator, QdrantStore, RagConfig,
    RagError, RagPipeline, ServiceError, StoreBackend, StoreStats, VectorStore, DEFAULT_COLLECTION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL, DEFAULT_NUM_RESULTS, DEFAULT_OLLAMA_URL,
    DEFAULT_QDRANT_URL,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-rag", version, about = "Ask questions about your PDF documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Ollama base URL for embeddings and generation
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL, global = true)]
    ollama_url: String,

    /// Embedding model name
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    embedding_model: String,

    /// Generation model name
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL, global = true)]
    llm_model: String,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = DEFAULT_QDRANT_URL, global = true)]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, env = "QDRANT_COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    collection: String,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, split, embed and store a PDF.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,
    },
    /// Answer a question from the stored documents.
    Query {
        /// The question to ask.
        question: String,
        /// Number of chunks to retrieve.
        #[arg(
            short = 'n',
            long,
            default_value_t = DEFAULT_NUM_RESULTS,
            value_parser = clap::value_parser!(u16).range(1..).map(usize::from)
        )]
        num_results: usize,
    },
    /// List ingested documents and the number of stored chunks.
    List,
    /// Delete every stored chunk.
    Clear,
    /// Print instructions for starting the backing services.
    Setup,
}

impl Cli {
    fn config(&self) -> RagConfig {
        RagConfig {
            ollama_url: self.ollama_url.clone(),
            embedding_model: self.embedding_model.clone(),
            llm_model: self.llm_model.clone(),
            qdrant_url: self.qdrant_url.clone(),
            collection: self.collection.clone(),
        }
    }
}

type Pipeline = RagPipeline<OllamaEmbedder, StoreBackend, OllamaGenerator>;

fn pipeline(config: &RagConfig, store: StoreBackend) -> Pipeline {
    RagPipeline::new(
        OllamaEmbedder::new(&config.ollama_url, &config.embedding_model),
        store,
        OllamaGenerator::new(&config.ollama_url, &config.llm_model),
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    let is_clear = matches!(cli.command, Command::Clear);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            let message = format!("{failure:#}");
            error!(error = %message, "command failed");
            eprintln!("Error: {message}");
            if is_clear && is_connection_failure(&failure) {
                eprintln!(
                    "Could not clear the vector store. Make sure Qdrant is running, restart it \
                     manually if needed (for example `docker restart qdrant`) and try again."
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();

    match cli.command {
        Command::Ingest { file } => {
            let pipeline = pipeline(&config, connect_or_create(&config).await);
            warn_if_transient(pipeline.store());

            let report = pipeline.ingest_file(&file).await.map_err(describe)?;
            println!(
                "Ingested {} chunks from {} ({} pages)",
                report.chunks, report.source, report.pages
            );
        }
        Command::Query {
            question,
            num_results,
        } => {
            let pipeline = pipeline(&config, connect(&config).await);
            warn_if_transient(pipeline.store());

            let answer = pipeline
                .query(&question, num_results)
                .await
                .map_err(describe)?;
            print!("{}", render_answer(&answer));
        }
        Command::List => {
            let pipeline = pipeline(&config, connect(&config).await);
            warn_if_transient(pipeline.store());

            let stats = pipeline.list().await.map_err(describe)?;
            print!("{}", render_stats(&stats));
        }
        Command::Clear => {
            clear_collection(&config).await?;
            println!("Cleared collection {}", config.collection);
        }
        Command::Setup => print_setup(&config),
    }

    Ok(())
}

/// Deletes every stored record. A collection that does not exist yet is
/// already empty; only an unreachable service is an error.
async fn clear_collection(config: &RagConfig) -> Result<(), ServiceError> {
    let store = QdrantStore::new(&config.qdrant_url, &config.collection);
    if store.exists().await? {
        store.clear().await?;
    }
    Ok(())
}

fn is_connection_failure(failure: &anyhow::Error) -> bool {
    failure.chain().any(|cause| {
        cause
            .downcast_ref::<ServiceError>()
            .is_some_and(ServiceError::is_connection_failure)
            || cause
                .downcast_ref::<RagError>()
                .is_some_and(RagError::is_connection_failure)
    })
}

fn describe(error: RagError) -> anyhow::Error {
    if error.is_connection_failure() {
        anyhow::Error::new(error).context("a backing service is unreachable, run `pdf-rag setup`")
    } else {
        anyhow::Error::new(error)
    }
}

fn warn_if_transient(store: &StoreBackend) {
    if !store.is_persistent() {
        warn!(store = %store.describe(), "results will not persist after this run");
        eprintln!("Warning: vector store unavailable, using a temporary in-memory store.");
    }
}

fn render_answer(answer: &Answer) -> String {
    let mut out = format!("{}\n\nSources:\n", answer.text);
    for hit in &answer.sources {
        let metadata = &hit.chunk.metadata;
        let page = metadata
            .page
            .map(|page| page.to_string())
            .unwrap_or_else(|| "?".to_string());
        out += &format!(
            "Source: {} (page {}, chunk {}, score {:.4})\n",
            metadata.source, page, metadata.chunk_index, hit.score
        );
    }
    out
}

fn render_stats(stats: &StoreStats) -> String {
    let mut out = String::new();
    for source in &stats.sources {
        out += &format!("  {source}\n");
    }
    out += &format!(
        "Documents: {}\nChunks: {}\n",
        stats.document_count(),
        stats.chunk_count
    );
    out
}

fn print_setup(config: &RagConfig) {
    println!(
        "\
pdf-rag needs two local services.

1. Ollama ({ollama})
   Install from https://ollama.com, then pull the models:
     ollama pull {embedding}
     ollama pull {llm}

2. Qdrant ({qdrant})
     docker run -d --name qdrant -p 6333:6333 qdrant/qdrant

Then:
     pdf-rag ingest path/to/document.pdf
     pdf-rag query \"What does the document say about X?\" -n 4
     pdf-rag list
     pdf-rag clear

Chunks are stored in the `{collection}` collection. If Qdrant is not
reachable, ingest and query still run against a temporary in-memory store.",
        ollama = config.ollama_url,
        embedding = config.embedding_model,
        llm = config.llm_model,
        qdrant = config.qdrant_url,
        collection = config.collection,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdf_rag_core::{Chunk, ChunkMetadata, ScoredChunk};
    use std::collections::BTreeSet;
    use wiremock::matchers::{method, path};
    use clap::CommandFactory;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cited(source: &str, chunk_index: u64, page: Option<u32>) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: format!("{source} text {chunk_index}"),
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    chunk_index,
                    ingested_at: Utc::now(),
                    page,
                },
            },
            score: 0.5,
        }
    }

    fn clear_cli(qdrant_url: &str) -> Cli {
        Cli::parse_from([
            "pdf-rag",
            "--qdrant-url",
            qdrant_url,
            "--collection",
            "pdf_documents",
            "clear",
        ])
    }

    #[test]
    fn answer_cites_one_source_line_per_retrieved_chunk() {
        let answer = Answer {
            question: "X".to_string(),
            text: "The answer.".to_string(),
            sources: vec![cited("a.pdf", 0, Some(1)), cited("a.pdf", 3, None)],
        };

        let rendered = render_answer(&answer);
        let source_lines = rendered
            .lines()
            .filter(|line| line.starts_with("Source:"))
            .collect::<Vec<_>>();

        assert!(rendered.starts_with("The answer.\n\nSources:\n"));
        assert_eq!(
            source_lines,
            vec![
                "Source: a.pdf (page 1, chunk 0, score 0.5000)",
                "Source: a.pdf (page ?, chunk 3, score 0.5000)",
            ]
        );
    }

    #[test]
    fn stats_list_sources_then_totals() {
        let stats = StoreStats {
            sources: BTreeSet::from(["handbook.pdf".to_string()]),
            chunk_count: 5,
        };

        assert_eq!(
            render_stats(&stats),
            "  handbook.pdf\nDocuments: 1\nChunks: 5\n"
        );
        assert_eq!(
            render_stats(&StoreStats::default()),
            "Documents: 0\nChunks: 0\n"
        );
    }

    #[tokio::test]
    async fn clear_succeeds_when_the_collection_does_not_exist() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/pdf_documents"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        run(clear_cli(&server.uri())).await
    }

    #[tokio::test]
    async fn clear_deletes_from_an_existing_collection() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/pdf_documents"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok"}"#))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/pdf_documents/points/delete"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok"}"#))
            .expect(1)
            .mount(&server)
            .await;

        run(clear_cli(&server.uri())).await
    }

    #[tokio::test]
    async fn clear_against_a_dead_service_is_a_connection_failure() {
        let failure = match run(clear_cli("http://127.0.0.1:9")).await {
            Ok(()) => panic!("clear should fail"),
            Err(failure) => failure,
        };
        assert!(is_connection_failure(&failure));
    }

    #[tokio::test]
    async fn clear_server_errors_are_not_connection_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/pdf_documents"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let failure = match run(clear_cli(&server.uri())).await {
            Ok(()) => panic!("clear should fail"),
            Err(failure) => failure,
        };
        assert!(!is_connection_failure(&failure));
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_defaults_to_four_results() {
        let cli = Cli::parse_from(["pdf-rag", "query", "what is X?"]);
        match cli.command {
            Command::Query {
                question,
                num_results,
            } => {
                assert_eq!(question, "what is X?");
                assert_eq!(num_results, 4);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn query_accepts_short_and_long_result_flags() {
        for args in [
            ["pdf-rag", "query", "q", "-n", "2"],
            ["pdf-rag", "query", "q", "--num-results", "2"],
        ] {
            let cli = Cli::parse_from(args);
            assert!(matches!(cli.command, Command::Query { num_results: 2, .. }));
        }
    }

    #[test]
    fn zero_results_is_rejected() {
        assert!(Cli::try_parse_from(["pdf-rag", "query", "q", "-n", "0"]).is_err());
    }

    #[test]
    fn ingest_requires_a_file() {
        assert!(Cli::try_parse_from(["pdf-rag", "ingest"]).is_err());
        let cli = Cli::parse_from(["pdf-rag", "ingest", "doc.pdf"]);
        assert!(matches!(cli.command, Command::Ingest { ref file } if file == &PathBuf::from("doc.pdf")));
    }

    #[test]
    fn service_flags_build_the_config() {
        let cli = Cli::parse_from([
            "pdf-rag",
            "--qdrant-url",
            "http://qdrant:6333",
            "--collection",
            "manuals",
            "list",
        ]);
        let config = cli.config();
        assert_eq!(config.qdrant_url, "http://qdrant:6333");
        assert_eq!(config.collection, "manuals");
    }
}
