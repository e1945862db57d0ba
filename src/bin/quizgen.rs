//! quizgen CLI
//!
//! Generates study material for a topic, or exam questions for a syllabus,
//! and prints the result as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quizgen::{init_logging, LoggingOptions, PipelineConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Study material and exam question generator
#[derive(Parser)]
#[command(name = "quizgen", version)]
#[command(about = "Generate information, a flowchart and a quiz for a topic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model backend (ollama, openai). Overrides QUIZGEN_BACKEND
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Backend base URL. Overrides QUIZGEN_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name. Overrides QUIZGEN_MODEL
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format (json, text)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Per-attempt stage timeout in seconds
    #[arg(long, global = true)]
    stage_timeout_secs: Option<u64>,

    /// Retry preset (none, standard, aggressive, interactive)
    #[arg(long, global = true)]
    retry: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Information, flowchart and quiz for one topic
    Topic {
        /// Subject to study, e.g. "Binary Search Trees"
        topic: String,

        /// Also print per-stage statuses
        #[arg(long)]
        report: bool,
    },
    /// Exam questions from a syllabus and past papers
    Syllabus {
        /// Syllabus text file
        #[arg(long)]
        syllabus: PathBuf,

        /// Past exam questions text file
        #[arg(long)]
        past_questions: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingOptions {
        level: cli.log_level.clone(),
        format: cli.log_format.parse()?,
    })
    .context("Failed to initialize logging")?;

    let config = build_config(&cli)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Topic { ref topic, report } => {
            let pipeline = config.quiz_pipeline()?;
            let run = pipeline.run(topic).await;
            let output = if report {
                serde_json::to_string_pretty(&run)?
            } else {
                serde_json::to_string_pretty(&run.result)?
            };
            println!("{}", output);
        }
        Commands::Syllabus {
            ref syllabus,
            ref past_questions,
        } => {
            let syllabus_text = std::fs::read_to_string(syllabus)
                .with_context(|| format!("Failed to read syllabus {}", syllabus.display()))?;
            let past_text = match past_questions {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read past questions {}", path.display()))?,
                None => String::new(),
            };

            let pipeline = config.syllabus_pipeline()?;
            let questions = pipeline
                .generate_syllabus_questions(&syllabus_text, &past_text)
                .await
                .context("Syllabus question generation failed")?;
            println!("{}", serde_json::to_string_pretty(&questions)?);
        }
    }
    Ok(())
}

/// Environment first, then command-line flags on top.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;

    if let Some(ref backend) = cli.backend {
        config.backend = backend.parse()?;
        if cli.base_url.is_none() {
            config.base_url = config.backend.default_base_url().to_string();
        }
    }
    if let Some(ref url) = cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(ref model) = cli.model {
        config.model = model.clone();
    }
    if let Some(secs) = cli.stage_timeout_secs {
        config.stage_timeout = Some(Duration::from_secs(secs));
    }
    if let Some(ref retry) = cli.retry {
        config.retry = retry.parse()?;
    }
    Ok(config)
}
