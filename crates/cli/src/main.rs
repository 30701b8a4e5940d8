mod operator;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use prometheus::{Encoder, Registry, TextEncoder};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easyapply_core::ai::LlmClient;
use easyapply_core::metrics::register_metrics;
use easyapply_core::{
    create_llm_client, create_outcome_log, load_config, validate_config, AnswerCache, Config,
    DiscardingOperator, LlmAnswerer, Operator, OutcomeFilter, OutcomeStatus, OutcomeStore,
    QuestionEngine, ReplayPage, RunContext, SearchOrchestrator, SessionSummary,
    SqliteOutcomeStore,
};

use operator::ConsoleOperator;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "easyapply", version, about = "Search job boards and fill Easy Apply forms")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every search group once.
    Run {
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
        /// Replay fixture describing search results and forms.
        #[arg(long)]
        replay: PathBuf,
        /// Write the session summary as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write Prometheus metrics in text format.
        #[arg(long)]
        metrics_out: Option<PathBuf>,
        /// Discard instead of asking when a form needs a human.
        #[arg(long)]
        unattended: bool,
    },
    /// Inspect or maintain the answer cache.
    Cache {
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
        #[command(subcommand)]
        action: CacheAction,
    },
    /// List recorded outcomes.
    Outcomes {
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        run: Option<String>,
        /// applied, skipped, failed or discarded
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
enum CacheAction {
    /// Entry counts per source.
    Stats,
    /// Every cached question and answer.
    Show,
    /// Drop expired AI answers.
    Prune,
    /// Remove every entry.
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli.command).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Run {
            config,
            replay,
            report,
            metrics_out,
            unattended,
        } => {
            run_search(
                &config,
                &replay,
                report.as_deref(),
                metrics_out.as_deref(),
                unattended,
            )
            .await
        }
        Command::Cache { config, action } => cache_command(&config, action),
        Command::Outcomes {
            config,
            run,
            status,
            limit,
        } => outcomes_command(&config, run, status, limit),
    }
}

fn load_validated(path: &Path) -> Result<Config> {
    info!("Loading configuration from {:?}", path);
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn open_cache(config: &Config) -> Result<AnswerCache> {
    let path = &config.storage.answer_cache_path;
    let cache = AnswerCache::load(path)
        .with_context(|| format!("Failed to load answer cache from {:?}", path))?
        .with_ai_max_age_days(config.answers.ai_answer_max_age_days);
    Ok(cache)
}

fn open_outcome_store(config: &Config) -> Result<Arc<dyn OutcomeStore>> {
    let path = &config.storage.outcome_db_path;
    let store = SqliteOutcomeStore::new(path)
        .with_context(|| format!("Failed to open outcome log at {:?}", path))?;
    Ok(Arc::new(store))
}

/// Local midnight, for the daily application limit.
fn start_of_today() -> DateTime<Utc> {
    Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

async fn run_search(
    config_path: &Path,
    replay_path: &Path,
    report_path: Option<&Path>,
    metrics_path: Option<&Path>,
    unattended: bool,
) -> Result<()> {
    let config = load_validated(config_path)?;
    info!(version = VERSION, groups = config.search.groups.len(), "Configuration loaded");

    // Compute config hash for the session report
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    let registry = Registry::new();
    register_metrics(&registry).context("Failed to register metrics")?;

    let store = open_outcome_store(&config)?;
    let applied = store.applied_ids().context("Failed to read applied listings")?;
    let applied_today = store
        .count_applied_since(start_of_today())
        .context("Failed to count today's applications")?;
    info!(
        applied = applied.len(),
        applied_today,
        daily_limit = config.run.daily_application_limit,
        "Outcome log opened"
    );

    let mut cache = open_cache(&config)?;
    info!(entries = cache.len(), "Answer cache loaded");

    let mut engine = QuestionEngine::new(config.answers.clone());
    if let Some(ai) = config.enabled_ai() {
        let client = create_llm_client(ai).context("Failed to create LLM client")?;
        info!(provider = client.provider(), model = client.model(), "AI answers enabled");
        let answerer = LlmAnswerer::new(client)
            .with_max_tokens(ai.max_tokens)
            .with_temperature(ai.temperature);
        engine = engine.with_ai(Arc::new(answerer));
    } else {
        info!("AI answers disabled");
    }

    let page = Arc::new(
        ReplayPage::from_file(replay_path)
            .with_context(|| format!("Failed to load replay fixture from {:?}", replay_path))?,
    );
    let operator: Arc<dyn Operator> = if unattended {
        Arc::new(DiscardingOperator)
    } else {
        Arc::new(ConsoleOperator::new())
    };

    let (outcome_handle, outcome_writer) =
        create_outcome_log(Arc::clone(&store), config.storage.outcome_buffer);
    let writer_handle = tokio::spawn(outcome_writer.run());

    let orchestrator = SearchOrchestrator::new(&config, page, engine, operator)
        .with_outcome_log(outcome_handle)
        .with_config_hash(config_hash_short);

    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current listing");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let ctx = RunContext::new(applied).with_applied_today(applied_today);
    let report = orchestrator.run(&mut cache, ctx).await;

    // Dropping the orchestrator closes the outcome channel
    drop(orchestrator);
    let written = writer_handle.await.context("Outcome writer task failed")?;
    info!(written, "Outcome log flushed");

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report.summary)
            .context("Failed to serialize session summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write session report to {:?}", path))?;
        info!("Session report written to {:?}", path);
    }

    if let Some(path) = metrics_path {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        std::fs::write(path, buffer)
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
    }

    print_summary(&report.summary);
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Run {}", summary.run_id);
    println!(
        "  applied {}  skipped {}  failed {}  discarded {}",
        summary.counts.applied,
        summary.counts.skipped,
        summary.counts.failed,
        summary.counts.discarded
    );
    for (reason, count) in &summary.skip_reasons {
        println!("  {:<22} {}", reason.as_str(), count);
    }
    for (group_id, group) in &summary.groups {
        let filter = group
            .final_time_filter
            .map(|f| f.as_str())
            .unwrap_or("-");
        println!(
            "  [{}] applied {} / {} listings, reached {}{}",
            group_id,
            group.counts.applied,
            group.counts.total(),
            filter,
            group
                .abandoned
                .as_deref()
                .map(|r| format!(", abandoned: {}", r))
                .unwrap_or_default()
        );
    }
    if !summary.recruiters.is_empty() {
        println!("  Recruiters:");
        for contact in &summary.recruiters {
            println!("    {} ({})", contact.name, contact.company);
        }
    }
    if let Some(reason) = &summary.halted {
        println!("  Halted: {}", reason);
    }
    if summary.cancelled {
        println!("  Cancelled by operator");
    }
}

fn cache_command(config_path: &Path, action: CacheAction) -> Result<()> {
    let config = load_validated(config_path)?;
    let mut cache = open_cache(&config)?;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("{} entries ({} expired)", stats.total, stats.expired);
            for (source, count) in &stats.by_source {
                println!("  {:<12} {}", source.as_str(), count);
            }
        }
        CacheAction::Show => {
            for (question, entry) in cache.iter() {
                println!(
                    "{} [{}] => {} ({}, {})",
                    question,
                    entry.field_type,
                    entry.answer,
                    entry.source.as_str(),
                    entry.updated_at.to_rfc3339()
                );
            }
        }
        CacheAction::Prune => {
            let removed = cache.prune_expired();
            cache.flush().context("Failed to write answer cache")?;
            println!("Removed {} expired answers", removed);
        }
        CacheAction::Clear => {
            let count = cache.len();
            cache.clear();
            cache.flush().context("Failed to write answer cache")?;
            println!("Removed {} answers", count);
        }
    }
    Ok(())
}

fn outcomes_command(
    config_path: &Path,
    run_id: Option<String>,
    status: Option<String>,
    limit: usize,
) -> Result<()> {
    let config = load_validated(config_path)?;
    let store = open_outcome_store(&config)?;

    let mut filter = OutcomeFilter::new().with_limit(limit);
    if let Some(run_id) = run_id {
        filter = filter.with_run(run_id);
    }
    if let Some(status) = status {
        let Some(status) = OutcomeStatus::parse(&status) else {
            bail!("Unknown status '{}'", status);
        };
        filter = filter.with_status(status);
    }

    let outcomes = store.query(&filter).context("Failed to query outcomes")?;
    for outcome in &outcomes {
        println!(
            "{}  {:<9} {:<20} {} @ {} [{}]{}",
            outcome.recorded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            outcome.status.as_str(),
            outcome.reason.map(|r| r.as_str()).unwrap_or("-"),
            outcome.title,
            outcome.company,
            outcome.group_id,
            outcome
                .detail
                .as_deref()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default()
        );
    }
    println!("{} outcomes", outcomes.len());
    Ok(())
}
