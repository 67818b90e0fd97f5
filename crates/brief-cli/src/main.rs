use std::path::PathBuf;

use analysis_core::AppConfig;
use analysis_orchestrator::AnalysisOrchestrator;
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

mod bundle;

use bundle::InputBundle;

#[derive(Parser)]
#[command(name = "brief")]
#[command(about = "Daily news sentiment, market signal and trade plan per instrument")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one day of collected inputs and print the JSON report
    Analyze {
        /// JSON input bundle (instruments, news, bars, fundamentals, history)
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,

        /// JSON config file; built-in defaults when omitted
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Reference date (YYYY-MM-DD); defaults to the bundle date, then today
        #[arg(short, long)]
        date: Option<String>,

        /// Write the report here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Ignore the configured LLM provider and use heuristics only
        #[arg(long)]
        heuristic: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            date,
            output,
            heuristic,
        } => {
            let config = match config {
                Some(path) => AppConfig::from_file(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => AppConfig::default(),
            };
            let bundle = InputBundle::from_file(&input)?;
            let date = resolve_date(date.or_else(|| bundle.date.clone()), &config.data.timezone)?;

            let mut orchestrator = AnalysisOrchestrator::new(config);
            if heuristic {
                orchestrator = orchestrator.without_llm();
            }
            tracing::info!(
                "Analyzing {} instruments for {} ({:?} agents)",
                bundle.instruments.len(),
                date,
                orchestrator.agent_mode()
            );

            let brief = orchestrator
                .run(&bundle, bundle.instruments.clone(), &date)
                .await;
            let json = serde_json::to_string_pretty(&brief)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write report {}", path.display()))?;
                    tracing::info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so the report on stdout stays machine-readable.
fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Explicit date if given, otherwise today in `timezone`.
fn resolve_date(explicit: Option<String>, timezone: &str) -> Result<String> {
    if let Some(date) = explicit {
        let date = date.trim();
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            bail!("invalid date '{}', expected YYYY-MM-DD", date);
        }
        return Ok(date.to_string());
    }

    let tz: chrono_tz::Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(e) => bail!("invalid data.timezone '{}': {}", timezone, e),
    };
    Ok(Utc::now().with_timezone(&tz).date_naive().format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_date_is_validated() {
        assert_eq!(resolve_date(Some(" 2026-02-23 ".to_string()), "Asia/Shanghai").unwrap(), "2026-02-23");
        assert!(resolve_date(Some("23/02/2026".to_string()), "Asia/Shanghai").is_err());
    }

    #[test]
    fn test_today_in_timezone() {
        let today = resolve_date(None, "Asia/Shanghai").unwrap();
        assert!(NaiveDate::parse_from_str(&today, "%Y-%m-%d").is_ok());
        assert!(resolve_date(None, "Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from(["brief", "analyze", "--input", "in.json", "--date", "2026-02-23", "--heuristic"]).unwrap();
        match cli.command {
            Commands::Analyze { input, config, date, output, heuristic } => {
                assert_eq!(input, PathBuf::from("in.json"));
                assert!(config.is_none());
                assert_eq!(date.as_deref(), Some("2026-02-23"));
                assert!(output.is_none());
                assert!(heuristic);
            }
        }
    }
}
