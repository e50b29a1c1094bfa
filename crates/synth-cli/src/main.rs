//! synth-dialog - synthetic fast-food ordering dialog generator

mod config;
mod prompt;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use synth_agent::{
    AnalysisLog, BatchEvent, BatchPaths, BatchPlan, BatchRunner, CashierConfig, DialogFactory,
    DialogOptions, DialogSettings, KnowledgeConfig, Menu, Profile, ProviderTransport, RetryConfig,
    RunConfig, dialog::format_duration,
};
use synth_ai::{
    EmbeddingProvider, HashingEmbedder, OpenAIProvider, Provider, RemoteEmbedder, models,
};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// synth-dialog - generate synthetic customer/cashier dialogs
#[derive(Parser, Debug)]
#[command(name = "synth-dialog")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// First order number (negative for random mode)
    #[arg(short, long, allow_negative_numbers = true)]
    start: Option<i64>,

    /// Last order number (defaults to --start)
    #[arg(short, long)]
    end: Option<u32>,

    /// Number of freeform dialogs to generate
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Client profile (regular, friendly, impatient, polite_and_respectful, indecisive)
    #[arg(short, long)]
    profile: Option<Profile>,

    /// Seed for reproducible client behavior
    #[arg(long)]
    seed: Option<u64>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Menu file
    #[arg(long)]
    menu: Option<PathBuf>,

    /// Directory with Order-NNNN.csv files
    #[arg(long)]
    orders_dir: Option<PathBuf>,

    /// Directory for generated transcripts
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Statistics log
    #[arg(long)]
    analysis_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let filter = if args.verbose {
        EnvFilter::new("synth=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);

    // Initialize config and exit
    if args.init_config {
        let path = Config::init(&config_path)
            .with_context(|| format!("Failed to create config at {}", config_path.display()))?;
        println!("Config file created at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    dotenvy::dotenv().ok();
    let cfg = Config::load(&config_path)?;

    let (plan, profile) = match prompt::plan_from_args(args.start, args.end, args.count)? {
        Some(plan) => (plan, args.profile),
        None => {
            let mut input = io::stdin().lock();
            let plan = prompt::ask_plan(&mut input, &mut io::stdout())?;
            let profile = match args.profile {
                Some(profile) => Some(profile),
                None => prompt::ask_profile(&mut input, &mut io::stdout())?,
            };
            (plan, profile)
        }
    };

    run(args, cfg, plan, profile).await
}

async fn run(
    args: Args,
    cfg: Config,
    plan: BatchPlan,
    profile: Option<Profile>,
) -> anyhow::Result<()> {
    let provider_kind = cfg.provider();
    let model = models::resolve_model(
        provider_kind,
        cfg.llm.model.as_deref(),
        cfg.llm.base_url.as_deref(),
    );
    if model.base_url.is_empty() {
        bail!("Provider '{}' needs llm.base_url in the config", cfg.llm.provider);
    }

    let provider = match cfg.get_api_key() {
        Some(key) => OpenAIProvider::new(key),
        None => match cfg.api_key_env() {
            Some(var) => bail!(
                "No API key found for {}. Set it with: export {}=your-key (or in .env)",
                provider_kind.name(),
                var
            ),
            None => OpenAIProvider::anonymous(),
        },
    }
    .with_timeout(Duration::from_secs(cfg.llm.request_timeout_secs))?;

    let transport = Arc::new(
        ProviderTransport::new(Arc::new(provider.clone()))
            .with_retry_config(RetryConfig {
                max_retries: cfg.llm.max_retries,
                ..Default::default()
            })
            .with_streaming(cfg.llm.stream),
    );

    let embedder: Arc<dyn EmbeddingProvider> = match cfg.embedding_provider() {
        "hashing" => Arc::new(HashingEmbedder::new(cfg.embedding.dimensions)),
        "remote" => {
            let base_url = cfg
                .embedding
                .base_url
                .clone()
                .unwrap_or_else(|| model.base_url.clone());
            let embedding_model = models::resolve_model(
                Provider::Custom,
                Some(cfg.embedding.model.as_deref().unwrap_or("text-embedding-3-small")),
                Some(&base_url),
            );
            Arc::new(RemoteEmbedder::new(provider, embedding_model))
        }
        other => bail!("Unknown embedding provider '{}' (expected hashing or remote)", other),
    };

    let menu_path = args.menu.unwrap_or(cfg.paths.menu);
    let menu = Menu::load(&menu_path)
        .with_context(|| format!("Failed to load menu {}", menu_path.display()))?;
    tracing::info!(items = menu.len(), model = %model.id, "Loaded menu");

    let settings = DialogSettings {
        client: RunConfig::new(model.clone())
            .with_temperature(cfg.client.temperature)
            .with_max_tokens(cfg.client.max_tokens),
        cashier: CashierConfig {
            restaurant_name: cfg.cashier.restaurant_name.clone(),
            top_k: cfg.retrieval.top_k,
            ..CashierConfig::new(
                RunConfig::new(model)
                    .with_temperature(cfg.cashier.temperature)
                    .with_max_tokens(cfg.cashier.max_tokens),
            )
        },
        knowledge: KnowledgeConfig {
            chunk_size: cfg.retrieval.chunk_size,
            chunk_overlap: cfg.retrieval.chunk_overlap,
            include_category_summaries: cfg.retrieval.include_category_summaries,
        },
        dialog: DialogOptions {
            max_exchanges: cfg.dialog.max_exchanges,
            ..Default::default()
        },
        profile,
    };

    let factory = DialogFactory::new(Arc::new(menu), transport, embedder, settings, args.seed);
    let paths = BatchPaths {
        orders_dir: args.orders_dir.unwrap_or(cfg.paths.orders_dir),
        results_dir: args.results_dir.unwrap_or(cfg.paths.results_dir),
    };
    let analysis_path = args.analysis_file.unwrap_or(cfg.paths.analysis_file);
    let analysis = AnalysisLog::open(&analysis_path)
        .with_context(|| format!("Failed to open {}", analysis_path.display()))?;

    let mut runner = BatchRunner::new(factory, paths, analysis);
    let summary = runner.run(plan, print_event).await?;

    println!(
        "\nDone: {} written, {} skipped, {} failed",
        summary.completed, summary.skipped, summary.failed
    );
    Ok(())
}

fn print_event(event: BatchEvent) {
    match event {
        BatchEvent::DialogWritten { order, path, stats } => {
            println!(
                "Dialog for order {} written to {} ({} tokens, {})",
                order,
                path.display(),
                stats.token_count,
                format_duration(stats.duration)
            );
        }
        BatchEvent::OrderMissing { path, .. } => {
            println!("File {} not found.", path.display());
        }
        BatchEvent::OrderFailed { path, error, .. } => {
            eprintln!("Error processing file {}: {}", path.display(), error);
        }
        BatchEvent::RandomDialogWritten { index, path, .. } => {
            println!("Dialog #{} written to {}", index, path.display());
        }
    }
}
