//! CLI binary for running the stagechain sales analytics pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use stagechain::analytics::{self, AnalyticsConfig, APP_NAME};
use stagechain::prelude::*;
use tracing_subscriber::EnvFilter;

const MAX_VALUE_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "stagechain", version, about = "Sequential stage pipeline runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sales analytics pipeline once
    Run {
        /// Source CSV (default: data/sample_sales_data.csv, or STAGECHAIN_DATA_PATH)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory for rendered reports (default: results, or STAGECHAIN_RESULTS_DIR)
        #[arg(short, long)]
        results: Option<PathBuf>,

        /// User the session belongs to
        #[arg(long, default_value = "tutorial_user")]
        user: String,

        /// Session id to create and run
        #[arg(long, default_value = "demo-session-001")]
        session: String,

        /// Leave out the two model-backed analyst stages
        #[arg(long)]
        skip_analysis: bool,

        /// Write the sample dataset before running, even if the file exists
        #[arg(long)]
        seed_sample: bool,
    },
}

/// Prints each event as it is relayed.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: &Event) {
        println!("[{}]: {}", event.author(), event.text());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if cli.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Run {
            data,
            results,
            user,
            session,
            skip_analysis,
            seed_sample,
        } => {
            let mut config = AnalyticsConfig::from_env();
            if let Some(path) = data {
                config = config.with_data_path(path);
            }
            if let Some(dir) = results {
                config = config.with_results_dir(dir);
            }
            cmd_run(&config, &user, &session, skip_analysis, seed_sample).await?;
        }
    }

    Ok(())
}

async fn cmd_run(
    config: &AnalyticsConfig,
    user: &str,
    session: &str,
    skip_analysis: bool,
    seed_sample: bool,
) -> anyhow::Result<()> {
    if seed_sample || !config.data_path.exists() {
        analytics::write_sample_data(&config.data_path)
            .with_context(|| format!("writing sample data to {}", config.data_path.display()))?;
    }

    let pipeline = analytics::sales_pipeline(config, skip_analysis);
    tracing::info!(stages = ?pipeline.stage_names(), "Pipeline built");

    let sessions = Arc::new(InMemorySessionService::new());
    let key = sessions.create_session(APP_NAME, user, Some(session));
    tracing::info!(session = %key, "Session created");

    let runner = Runner::new(APP_NAME, Arc::new(pipeline), sessions)
        .with_event_sink(Arc::new(ConsoleSink));

    println!("\n--- Running pipeline ---");
    let report = runner.run_to_completion(user, session).await?;

    println!("\n--- {} ---", report.summary());
    println!("\n--- Final state ---");
    for (key, value) in &report.final_state {
        println!("{key}: {}", render_value(value));
    }

    Ok(())
}

fn render_value(value: &serde_json::Value) -> String {
    let rendered = match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if rendered.chars().count() > MAX_VALUE_CHARS {
        let head: String = rendered.chars().take(MAX_VALUE_CHARS).collect();
        format!("{head}... (truncated)")
    } else {
        rendered
    }
}
