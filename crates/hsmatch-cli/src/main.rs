mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hsmatch_ai::memo::DEFAULT_MEMO_CAPACITY;
use hsmatch_ai::{
    BatchOrchestrator, DualClassifier, EngineConfig, MemoClassifier, OpenAiClient, OpenAiConfig,
    SimilarityCache,
};
use hsmatch_core::{StopRule, codes, taxonomy};
use hsmatch_store::{IsicTable, TaxonomyStore};
use hsmatch_sync::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES, FetchConfig, LeafClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hsmatch", version, about = "Classify business descriptions into HS tariff codes")]
struct Cli {
    /// Directory holding headings.json, hs10.json, and isic.json
    #[arg(long, env = "HSMATCH_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract items from a description and resolve their HS10 codes
    Classify {
        /// Free-text business description
        #[arg(long)]
        desc: String,
        /// ISIC industry code; omit to resolve without it
        #[arg(long, default_value = "")]
        isic: String,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        api: ApiArgs,
        #[command(flatten)]
        engine: EngineArgs,
        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// List the tariff lines under a 4-digit heading, fetching on a miss
    Leaves {
        hs4: String,
        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// List the 15 section labels
    Sections,
    /// List chapters of a section label, or headings of a 2-digit chapter
    Chapters { key: String },
    /// Show the HS prefixes implied by an ISIC code
    Isic { code: String },
}

#[derive(Args)]
struct ApiArgs {
    /// OpenAI-compatible API root
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    api_base: String,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, default_value = "gpt-4o-2024-05-13")]
    chat_model: String,
    #[arg(long, default_value = "text-embedding-3-small")]
    embedding_model: String,
    #[arg(long, default_value_t = 60)]
    request_timeout_secs: u64,
}

#[derive(Args)]
struct EngineArgs {
    /// Items classified at the same time
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    /// Give up on an item after this many seconds
    #[arg(long)]
    item_timeout_secs: Option<u64>,
    /// Keep loosening consensus until every item contributed a code
    #[arg(long)]
    every_item: bool,
    /// Remembered LLM answers
    #[arg(long, default_value_t = DEFAULT_MEMO_CAPACITY)]
    memo_capacity: usize,
}

#[derive(Args)]
struct FetchArgs {
    /// HS code search endpoint used for tariff line misses
    #[arg(long, env = "HSMATCH_LEAF_SOURCE_URL", default_value = DEFAULT_BASE_URL)]
    leaf_source_url: String,
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,
    #[arg(long, default_value_t = 10)]
    fetch_timeout_secs: u64,
}

impl FetchArgs {
    /// Settings for commands that only read cached tables.
    fn offline() -> Self {
        Self {
            leaf_source_url: DEFAULT_BASE_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            fetch_timeout_secs: 10,
        }
    }

    fn config(&self) -> FetchConfig {
        FetchConfig {
            base_url: self.leaf_source_url.clone(),
            max_pages: self.max_pages,
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

impl ApiArgs {
    fn config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.api_base.clone(),
            api_key: self.api_key.clone(),
            chat_model: self.chat_model.clone(),
            embedding_model: self.embedding_model.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            concurrency: self.concurrency,
            item_timeout: self.item_timeout_secs.map(Duration::from_secs),
            stop_rule: if self.every_item {
                StopRule::EveryItem
            } else {
                StopRule::CodeCount
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    info!("hsmatch v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Classify {
            desc,
            isic,
            json,
            api,
            engine,
            fetch,
        } => {
            let store = open_store(&cli.data_dir, &fetch)?;
            let isic_table = IsicTable::load(&cli.data_dir)
                .with_context(|| format!("loading ISIC table from {}", cli.data_dir.display()))?;

            let client = Arc::new(OpenAiClient::new(api.config())?);
            let similarity = Arc::new(SimilarityCache::new(client.clone()));
            let llm = Arc::new(MemoClassifier::new(client.clone(), engine.memo_capacity));
            let orchestrator = BatchOrchestrator::new(
                client,
                DualClassifier::new(store, similarity, llm),
                Arc::new(isic_table),
                engine.config(),
            );

            let report = orchestrator.run_batch(&desc, &isic).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", display::render_report(&report));
            }
        }
        Command::Leaves { hs4, fetch } => {
            let code = codes::digits_only(&hs4);
            anyhow::ensure!(codes::is_heading_code(&code), "not a 4-digit heading code: {hs4}");
            let store = open_store(&cli.data_dir, &fetch)?;
            let lines = store.hs10_leaves_of(&code).await;
            print!("{}", display::render_leaves(&code, &lines));
        }
        Command::Sections => {
            for (i, label) in taxonomy::section_candidates().iter().enumerate() {
                println!("{:>2}  {label}", i + 1);
            }
        }
        Command::Chapters { key } => {
            if let Some(label) = taxonomy::chapter_label(&key) {
                let store = open_store(&cli.data_dir, &FetchArgs::offline())?;
                let headings = store
                    .chapter_headings(&key)
                    .with_context(|| format!("no headings loaded for chapter {key}"))?;
                println!("{key}  {label}");
                for heading in headings {
                    println!("  {}  {}", heading.code, heading.label);
                }
            } else {
                let chapters = taxonomy::chapters_of(&key);
                anyhow::ensure!(!chapters.is_empty(), "unknown section or chapter: {key}");
                for label in chapters {
                    println!("{}  {label}", taxonomy::code_to_two_digit(label));
                }
            }
        }
        Command::Isic { code } => {
            let table = IsicTable::load(&cli.data_dir)?;
            print!("{}", display::render_constraint(&table.constraint(&code)));
        }
    }

    Ok(())
}

fn open_store(data_dir: &Path, fetch: &FetchArgs) -> anyhow::Result<Arc<TaxonomyStore>> {
    let client = LeafClient::http(&fetch.config())?;
    let store = TaxonomyStore::open(data_dir, Arc::new(client))
        .with_context(|| format!("opening reference tables in {}", data_dir.display()))?;
    Ok(Arc::new(store))
}

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` wins over
/// `--log-level`.
fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set subscriber: {e}"))?;
    Ok(())
}
