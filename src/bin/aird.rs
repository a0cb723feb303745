//! AIRD - AI-Ready Dataset ingestion CLI
//!
//! Usage:
//!   aird <COMMAND> [OPTIONS]
//!
//! Commands:
//!   preprocess   Normalize and chunk raw files
//!   score        Score chunks into AI_Trust_Score metrics
//!   fingerprint  Aggregate metrics into a readiness fingerprint
//!   policy       Evaluate the fingerprint against policy thresholds
//!   index        Embed and upsert chunks into the vector store
//!   validate     Check chunk scores against a pass/fail threshold
//!   report       Render the PDF trust report
//!   run          Run every stage in order
//!
//! Options (all commands):
//!   --config <PATH>       Path to aird.toml/json/yaml (default: aird.toml)
//!   --workspace <NAME>    Workspace id (required)
//!   --product <NAME>      Product id (required)
//!   --version <N>         Dataset version (required)
//!   --playbook <ID>       Playbook id (default: from config)
//!   --file <STEM>         Raw file stem to ingest; repeatable (required for preprocess/run)

use aird_core::config::RuntimeConfig;
use aird_core::pipeline::{PipelineRunner, Stage};
use aird_core::runtime::Runtime;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Default)]
struct Args {
    config_path: String,
    workspace: Option<String>,
    product: Option<String>,
    version: Option<u32>,
    playbook: Option<String>,
    files: Vec<String>,
}

fn parse_args(raw: impl Iterator<Item = String>) -> (Option<String>, Args) {
    let mut raw = raw.peekable();
    let command = raw.next();
    let mut args = Args {
        config_path: "aird.toml".to_string(),
        ..Default::default()
    };

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(v) = raw.next() {
                    args.config_path = v;
                }
            }
            "--workspace" => args.workspace = raw.next(),
            "--product" => args.product = raw.next(),
            "--version" => {
                if let Some(v) = raw.next() {
                    args.version = v.parse().ok();
                }
            }
            "--playbook" => args.playbook = raw.next(),
            "--file" => {
                if let Some(v) = raw.next() {
                    args.files.push(v);
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
    }

    (command, args)
}

fn print_help() {
    println!("AIRD - AI-Ready Dataset ingestion CLI");
    println!();
    println!("USAGE:");
    println!("    aird <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    preprocess   Normalize and chunk raw files");
    println!("    score        Score chunks into AI_Trust_Score metrics");
    println!("    fingerprint  Aggregate metrics into a readiness fingerprint");
    println!("    policy       Evaluate the fingerprint against policy thresholds");
    println!("    index        Embed and upsert chunks into the vector store");
    println!("    validate     Check chunk scores against a pass/fail threshold");
    println!("    report       Render the PDF trust report");
    println!("    run          Run every stage in order");
    println!();
    println!("OPTIONS:");
    println!("    --config <PATH>       Path to aird.toml/json/yaml (default: aird.toml)");
    println!("    --workspace <NAME>    Workspace id (required)");
    println!("    --product <NAME>      Product id (required)");
    println!("    --version <N>         Dataset version (required)");
    println!("    --playbook <ID>       Playbook id (default: from config)");
    println!("    --file <STEM>         Raw file stem to ingest; repeatable");
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,aird_core=debug"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}

fn stage_for_command(command: &str) -> Option<Stage> {
    match command {
        "preprocess" => Some(Stage::Preprocess),
        "score" => Some(Stage::Score),
        "fingerprint" => Some(Stage::Fingerprint),
        "policy" => Some(Stage::Policy),
        "index" => Some(Stage::Indexing),
        "validate" => Some(Stage::Validation),
        "report" => Some(Stage::Reporting),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (command, args) = parse_args(std::env::args().skip(1));
    setup_logging();

    let Some(command) = command else {
        print_help();
        std::process::exit(1);
    };

    if command != "run" && stage_for_command(&command).is_none() {
        eprintln!("Unknown command: {command}");
        print_help();
        std::process::exit(1);
    }

    let workspace = args.workspace.ok_or_else(|| anyhow::anyhow!("--workspace is required"))?;
    let product = args.product.ok_or_else(|| anyhow::anyhow!("--product is required"))?;
    let version = args.version.ok_or_else(|| anyhow::anyhow!("--version is required"))?;

    info!(command = %command, workspace = %workspace, product = %product, version, "starting aird");

    let config = RuntimeConfig::load(Some(&args.config_path))?;
    let runtime = Arc::new(Runtime::from_config(&config).await?);
    let runner = PipelineRunner::new(runtime, config);

    let run = if command == "run" {
        runner.run_all(&workspace, &product, version, &args.files, args.playbook.as_deref()).await?
    } else {
        let until = stage_for_command(&command).expect("validated above");
        runner
            .run_until(&workspace, &product, version, &args.files, args.playbook.as_deref(), until)
            .await?
    };

    println!("{}", serde_json::to_string_pretty(&run)?);
    if matches!(run.status, aird_core::models::PipelineRunStatus::Failed | aird_core::models::PipelineRunStatus::FailedPolicy) {
        std::process::exit(1);
    }
    Ok(())
}
