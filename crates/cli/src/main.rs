use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use corpus::{parse_where, Corpus};
use rag_vector_store::{
    provider_from_config, EmbeddingConfig, EmbeddingMode, MetadataFilter, SearchHit,
    SearchOptions, VectorStore,
};
use serde::Serialize;
use std::path::PathBuf;

mod corpus;

const DEMO_QUERY: &str = "I think fruit is awesome!";

#[derive(Parser)]
#[command(name = "rag-store")]
#[command(about = "In-memory vector store for RAG demos", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Override embedding backend (RAG_EMBEDDING_MODE)
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Override embedding model id (RAG_EMBEDDING_MODEL)
    #[arg(long, global = true)]
    embed_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the sample corpus and walk through search and filtering
    Demo(DemoArgs),

    /// Load texts from a file and run one similarity search
    Query(QueryArgs),
}

#[derive(Args)]
struct DemoArgs {
    /// Number of results per search
    #[arg(short, default_value_t = 2)]
    k: usize,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// Input file: `.jsonl` records or one text per line
    #[arg(long)]
    input: PathBuf,

    /// Query text
    #[arg(long)]
    query: String,

    /// Number of results
    #[arg(short, default_value_t = 3)]
    k: usize,

    /// Metadata equality filter, repeatable (field=value)
    #[arg(long = "where")]
    filters: Vec<String>,

    /// Include metadata in results
    #[arg(long)]
    with_metadata: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum EmbedMode {
    Stub,
    Openai,
}

impl EmbedMode {
    const fn as_domain(self) -> EmbeddingMode {
        match self {
            Self::Stub => EmbeddingMode::Stub,
            Self::Openai => EmbeddingMode::OpenAi,
        }
    }
}

#[derive(Serialize)]
struct DemoReport {
    query: String,
    closest: Vec<SearchHit>,
    closest_with_metadata: Vec<SearchHit>,
    food_keys: Vec<String>,
    first_metadata: serde_json::Value,
    closest_texts: Vec<String>,
}

#[derive(Serialize)]
struct QueryReport {
    query: String,
    total: usize,
    hits: Vec<SearchHit>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Demo(args) => args.json,
        Commands::Query(args) => args.json,
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet || json_output {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = EmbeddingConfig::from_env().context("Invalid embedding configuration")?;
    if let Some(mode) = cli.embed_mode {
        config.mode = mode.as_domain();
    }
    if let Some(model) = cli.embed_model {
        config.model = model;
    }

    match cli.command {
        Commands::Demo(args) => run_demo(args, &config).await,
        Commands::Query(args) => run_query(args, &config).await,
    }
}

async fn build_store(corpus: Corpus, config: &EmbeddingConfig) -> Result<VectorStore> {
    let provider = provider_from_config(config).context("Failed to create embedding provider")?;
    let mut store = VectorStore::with_embeddings(provider);
    let metadata = (!corpus.metadata.is_empty()).then_some(corpus.metadata);
    store
        .build_from_texts(corpus.texts, metadata)
        .await
        .context("Failed to build vector store")?;
    Ok(store)
}

async fn run_demo(args: DemoArgs, config: &EmbeddingConfig) -> Result<()> {
    let corpus = Corpus::demo();
    let first_text = corpus.texts[0].clone();
    let store = build_store(corpus, config).await?;

    let closest = store
        .search_by_text(DEMO_QUERY, args.k, &SearchOptions::default())
        .await?;
    let closest_with_metadata = store
        .search_by_text(DEMO_QUERY, args.k, &SearchOptions::new().with_metadata(true))
        .await?;
    let food_keys = store.filter_by_metadata(&MetadataFilter::new().equals("category", "food"));
    let first_metadata = serde_json::Value::Object(store.get_metadata(&first_text));
    let closest_texts = store
        .search_texts(DEMO_QUERY, args.k, &SearchOptions::default())
        .await?;

    let report = DemoReport {
        query: DEMO_QUERY.to_string(),
        closest,
        closest_with_metadata,
        food_keys,
        first_metadata,
        closest_texts,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Query: {}", report.query);
    println!("Closest {} vector(s):", args.k);
    print_hits(&report.closest);
    println!("Closest {} vector(s) with metadata:", args.k);
    print_hits(&report.closest_with_metadata);
    println!("Food-related vectors: {:?}", report.food_keys);
    println!("Metadata for first text: {}", report.first_metadata);
    println!("Closest {} text(s): {:?}", args.k, report.closest_texts);
    Ok(())
}

async fn run_query(args: QueryArgs, config: &EmbeddingConfig) -> Result<()> {
    let corpus = Corpus::load(&args.input)?;
    let filter = parse_where(&args.filters)?;
    if corpus.texts.is_empty() {
        log::warn!("No texts found in {}", args.input.display());
    }
    let store = build_store(corpus, config).await?;

    let mut options = SearchOptions::new().with_metadata(args.with_metadata);
    if let Some(filter) = filter {
        options = options.with_filter(filter);
    }
    let hits = store.search_by_text(&args.query, args.k, &options).await?;

    let report = QueryReport {
        query: args.query,
        total: store.len(),
        hits,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} result(s) for '{}' over {} entries:",
            report.hits.len(),
            report.query,
            report.total
        );
        print_hits(&report.hits);
    }
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    for (rank, hit) in hits.iter().enumerate() {
        match &hit.metadata {
            Some(metadata) => println!(
                "  {}. [{:.3}] {} {}",
                rank + 1,
                hit.score,
                hit.key,
                serde_json::Value::Object(metadata.clone())
            ),
            None => println!("  {}. [{:.3}] {}", rank + 1, hit.score, hit.key),
        }
    }
}
