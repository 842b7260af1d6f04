use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use integrity_guard::advisory::GeminiClient;
use integrity_guard::audit::{AuditLog, AuditRecord};
use integrity_guard::config::GuardConfig;
use integrity_guard::{analyze_with_advisory, AdvisoryModel, PostInput};

#[derive(Parser)]
#[command(
    name = "integrity-guard",
    about = "Score social posts under Remove/Reduce/Inform and suggest safer copy",
    version
)]
struct Cli {
    /// JSON post files to analyze (reads one post from stdin if none provided)
    files: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append an audit record per analysis to this JSONL file
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Never call the advisory model, even when configured
    #[arg(long)]
    offline: bool,

    /// Print the last N audit records instead of analyzing
    #[arg(long, value_name = "N")]
    history: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = GuardConfig::load(cli.config.as_deref()).context("loading config")?;
    if cli.audit_log.is_some() {
        config.audit_log = cli.audit_log;
    }
    let audit_log = config.audit_log.as_ref().map(AuditLog::new);

    if let Some(limit) = cli.history {
        let log = audit_log.context("--history needs an audit log")?;
        let records = log.read_all()?;
        let start = records.len().saturating_sub(limit);
        println!("{}", serde_json::to_string_pretty(&records[start..])?);
        return Ok(());
    }

    let client = if cli.offline {
        None
    } else {
        GeminiClient::from_config(&config.advisory)
    };
    let advisory = client.as_ref().map(|c| c as &dyn AdvisoryModel);

    let inputs = if cli.files.is_empty() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("reading stdin")?;
        vec![("<stdin>".to_string(), input)]
    } else {
        cli.files
            .iter()
            .map(|path| {
                std::fs::read_to_string(path)
                    .map(|text| (path.display().to_string(), text))
                    .with_context(|| format!("reading {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?
    };

    for (source, text) in inputs {
        let post = PostInput::from_json(&text).with_context(|| format!("invalid post in {source}"))?;
        let result = analyze_with_advisory(&post, advisory)?;
        if let Some(log) = &audit_log {
            log.append(&AuditRecord::new(&post, &result)?)
                .with_context(|| format!("writing audit log {}", log.path().display()))?;
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}
