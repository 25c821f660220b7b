use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use planpoker::chunker;
use planpoker::config::Config;
use planpoker::consensus;
use planpoker::db::Db;
use planpoker::embedder::create_provider;
use planpoker::estimator::{self, reasoner::HttpReasoner};
use planpoker::pipeline::{self, ProcessReport};
use planpoker::similarity;

#[derive(Parser)]
#[command(name = "planpoker", about = "Planning poker estimation core", version)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database schema
    Init,
    /// Chunk and embed all archived stories
    Process {
        /// Embedding provider key (mock, openai, ollama)
        #[arg(long)]
        provider: Option<String>,
        /// Chunking strategy key
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Show store statistics
    Stats,
    /// Generate a test embedding and similarity score
    TestProvider {
        #[arg(long)]
        provider: Option<String>,
    },
    /// Delete all derived AI data (chunks, embeddings, estimations)
    Cleanup {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Run an AI estimation for one story
    Estimate { story_id: i64 },
    /// Classify a round of votes
    Consensus {
        #[arg(required = true)]
        points: Vec<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Init => cmd_init(&config),
        Command::Process { provider, strategy } => cmd_process(&config, provider, strategy),
        Command::Stats => cmd_stats(&config),
        Command::TestProvider { provider } => cmd_test_provider(&config, provider),
        Command::Cleanup { yes } => cmd_cleanup(&config, yes),
        Command::Estimate { story_id } => cmd_estimate(&config, story_id),
        Command::Consensus { points } => cmd_consensus(&points),
    }
}

fn open_db(config: &Config) -> Result<Db> {
    Db::open(&config.db_path).context("Failed to open database")
}

fn cmd_init(config: &Config) -> Result<()> {
    open_db(config)?;
    println!("Database initialized: {}", config.db_path);
    Ok(())
}

fn cmd_process(config: &Config, provider: Option<String>, strategy: Option<String>) -> Result<()> {
    let db = open_db(config)?;

    let mut embedding_config = config.embedding.clone();
    if let Some(provider) = provider {
        embedding_config.provider = provider;
    }
    let provider =
        create_provider(&embedding_config).context("Failed to create embedding provider")?;

    let strategy_key = strategy.unwrap_or_else(|| config.chunking.strategy.clone());
    let strategy =
        chunker::strategy_for_key(&strategy_key).context("Failed to resolve chunking strategy")?;

    let stories = db.list_archive_stories_with_points()?;
    println!(
        "Processing {} stories (provider: {}, strategy: {})",
        stories.len(),
        provider.model_id(),
        strategy.name()
    );

    let bar = ProgressBar::new(stories.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );

    let mut report = ProcessReport::default();
    for story in &stories {
        bar.set_message(story.title.chars().take(50).collect::<String>());
        pipeline::process_story(&db, provider.as_ref(), strategy.as_ref(), story, &mut report)?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!(
        "Done: {} processed, {} skipped, {} chunks, {} embeddings, {} failures",
        report.processed, report.skipped, report.chunks, report.embeddings, report.failures
    );
    Ok(())
}

fn cmd_stats(config: &Config) -> Result<()> {
    let db = open_db(config)?;
    let stats = db.stats()?;

    println!("Stories:       {}", stats.stories);
    println!("  archive:     {}", stats.archive_stories);
    println!("Chunks:        {}", stats.chunks);
    println!("Estimations:   {}", stats.estimations);
    println!("Embeddings:");
    if stats.embeddings_by_model.is_empty() {
        println!("  (none)");
    } else {
        for (model, count) in &stats.embeddings_by_model {
            println!("  {model}: {count}");
        }
    }
    Ok(())
}

fn cmd_test_provider(config: &Config, provider: Option<String>) -> Result<()> {
    let mut embedding_config = config.embedding.clone();
    if let Some(provider) = provider {
        embedding_config.provider = provider;
    }
    let provider =
        create_provider(&embedding_config).context("Failed to create embedding provider")?;

    println!("Testing provider: {}", provider.model_id());

    let (a, dimension) = provider
        .generate("The quick brown fox jumps over the lazy dog")
        .context("Test embedding failed")?;
    println!("Embedding generated: dimension {dimension}");
    println!("First values: {:?}", &a[..a.len().min(5)]);

    let (b, _) = provider
        .generate("A fast auburn fox leaps across a sleepy hound")
        .context("Test embedding failed")?;
    let score = similarity::cosine_similarity(&a, &b)?;
    println!("Similarity of related sentences: {score:.4}");

    Ok(())
}

fn cmd_cleanup(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        print!("Delete all chunks, embeddings, and estimations? [y/N] ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let db = open_db(config)?;
    let (chunks, estimations) = db.clear_ai_data()?;
    println!("Deleted {chunks} chunks (embeddings cascade) and {estimations} estimations");
    Ok(())
}

fn cmd_estimate(config: &Config, story_id: i64) -> Result<()> {
    let db = open_db(config)?;
    let provider =
        create_provider(&config.embedding).context("Failed to create embedding provider")?;
    let reasoner =
        HttpReasoner::from_config(&config.reasoning).context("Failed to create reasoner")?;

    let estimation = estimator::estimate_story(
        &db,
        provider.as_ref(),
        &reasoner,
        story_id,
        config.retrieval.top_k,
        config.retrieval.min_similarity,
        config.reasoning.max_tokens,
    )
    .context("Estimation failed")?;

    println!("STORY POINTS: {}", estimation.points);
    println!("\nEvidence:");
    for (i, item) in estimation.evidence.iter().enumerate() {
        println!(
            "  {}. [{} SP] (similarity: {:.2}) - {}",
            i + 1,
            item.points,
            item.similarity,
            item.title
        );
    }
    println!("\n{}", estimation.reasoning);
    Ok(())
}

fn cmd_consensus(points: &[u32]) -> Result<()> {
    for value in points {
        anyhow::ensure!(
            consensus::is_valid_points(*value),
            "{value} is not on the vote scale {:?}",
            consensus::VOTE_SCALE
        );
    }

    let outcome = consensus::classify(points);
    println!("Outcome:     {}", outcome.outcome.as_str());
    match outcome.suggested {
        Some(points) => println!("Suggested:   {points}"),
        None => println!("Suggested:   -"),
    }
    match outcome.alternative {
        Some(points) => println!("Alternative: {points}"),
        None => println!("Alternative: -"),
    }
    Ok(())
}
