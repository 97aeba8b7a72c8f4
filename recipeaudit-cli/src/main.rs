//! Recipeaudit CLI — run a recipe quality audit from the terminal.
//!
//! Decodes the given JSON/CSV file, sends the configured slice to the
//! selected LLM backend, and writes the PDF report next to the input
//! (or to `--output`).

use clap::Parser;
use recipeaudit_core::{AuditPipeline, EntryLimit};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Recipeaudit: LLM-backed quality audits for recipe batch files
#[derive(Parser, Debug)]
#[command(name = "recipeaudit", version, about, long_about = None)]
struct Cli {
    /// Recipe file to audit (.json or .csv)
    file: PathBuf,

    /// Audit at most this many entries
    #[arg(short, long, conflicts_with = "full")]
    limit: Option<usize>,

    /// Audit the whole file
    #[arg(long)]
    full: bool,

    /// LLM model to use (defaults to the configured model)
    #[arg(short, long)]
    model: Option<String>,

    /// Output path for the PDF report (defaults to the generated name in the
    /// current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// File containing a custom system prompt
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// File containing a custom user prompt
    #[arg(long)]
    user_prompt: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "recipeaudit", "recipeaudit")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "recipeaudit.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Load and validate configuration; an unusable backend is fatal here,
    // not at request time.
    let workspace = std::env::current_dir().ok();
    let config = recipeaudit_core::load_config(workspace.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config.validate()?;

    let limit = if cli.full {
        EntryLimit::Full
    } else {
        EntryLimit::Count(cli.limit.unwrap_or(config.audit.default_entry_limit))
    };

    let system_prompt = match &cli.system_prompt {
        Some(path) => std::fs::read_to_string(path)?,
        None => recipeaudit_core::DEFAULT_SYSTEM_PROMPT.to_string(),
    };
    let user_prompt = match &cli.user_prompt {
        Some(path) => std::fs::read_to_string(path)?,
        None => recipeaudit_core::DEFAULT_USER_PROMPT.to_string(),
    };

    let filename = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("Input path has no filename: {}", cli.file.display()))?;
    let bytes = std::fs::read(&cli.file)?;

    let pipeline = AuditPipeline::from_config(config)?;
    let outcome = pipeline
        .run(
            &bytes,
            &filename,
            limit,
            cli.model.as_deref(),
            &system_prompt,
            &user_prompt,
        )
        .await?;

    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&outcome.filename));
    std::fs::write(&output, &outcome.pdf)?;
    info!(
        report = %output.display(),
        bytes = outcome.pdf.len(),
        compliance_rate = outcome.stats.compliance_rate,
        "Report written"
    );

    if !cli.quiet {
        let stats = &outcome.stats;
        println!("Audit complete: {}", output.display());
        println!("  Data quality score:       {}/10", stats.data_quality_score);
        println!("  Records audited:          {}", stats.total_records);
        println!("  With deviations:          {}", stats.records_with_deviations);
        println!(
            "  With multiple deviations: {}",
            stats.records_with_multiple_deviations
        );
        println!("  Fully compliant:          {}", stats.records_fully_compliant);
        println!("  Compliance rate:          {:.1}%", stats.compliance_rate);
        println!("  Critical deviations:      {}", stats.critical);
        println!("  Moderate deviations:      {}", stats.moderate);
        println!("  Minor deviations:         {}", stats.minor);
    }

    Ok(())
}
