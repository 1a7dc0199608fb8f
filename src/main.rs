//! Leakhound CLI entry point.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use leakhound::app::Config;
use leakhound::bucket::{self, BucketProber};
use leakhound::error::UserHint;
use leakhound::http::{ReplayRequestDescriptor, RequestEdits};
use leakhound::probes::run_security_probes;
use leakhound::replay::{ReplayController, TargetHandle};
use leakhound::reporting::{LeakReport, ReportFormat, ReportMetadata};
use leakhound::scanner::{CancelFlag, ScanMode, Scanner};

/// Credential leak scanner with authenticated request replay
#[derive(Parser, Debug)]
#[command(name = "leakhound")]
#[command(author, version, about = "Credential leak scanner with authenticated request replay", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LEAKHOUND_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LEAKHOUND_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan page content for leaked credentials
    Scan {
        /// Content file to scan; "-" or omitted reads stdin
        #[arg(short, long)]
        file: Option<String>,

        /// Origin URL of the content, used for whitelisting and report metadata
        #[arg(short, long)]
        url: Option<String>,

        /// Run the full two-phase scan instead of the priority pass only
        #[arg(long)]
        full: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Probe a cloud-storage bucket URL for public reachability
    Bucket {
        /// Bucket URL (virtual-hosted, path-style, or s3://)
        url: String,
    },

    /// Replay a captured request under the target's credential context
    Replay {
        /// JSON file holding a captured request descriptor
        captured: PathBuf,

        /// Target page URL; relative request URLs resolve against it
        #[arg(short, long)]
        target: String,

        /// Replace the request URL before dispatch
        #[arg(long)]
        url_override: Option<String>,

        /// Replace the request body before dispatch
        #[arg(long)]
        body_override: Option<String>,
    },

    /// Run the access-control probe suite against a captured endpoint
    Probe {
        /// JSON file holding a captured request descriptor
        captured: PathBuf,

        /// Target page URL; relative request URLs resolve against it
        #[arg(short, long)]
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting leakhound");

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Scan { file, url, full, format } => {
            run_scan(config, file, url, full, &format).await
        }
        Command::Bucket { url } => run_bucket(config, &url).await,
        Command::Replay { captured, target, url_override, body_override } => {
            run_replay(config, &captured, &target, url_override, body_override).await
        }
        Command::Probe { captured, target } => run_probe(config, &captured, &target).await,
    }
}

fn init_logging(cli: &Cli) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_content(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) if path != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
        }
        _ => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            Ok(content)
        }
    }
}

fn read_descriptor(path: &PathBuf) -> Result<ReplayRequestDescriptor> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid capture in {}", path.display()))
}

async fn run_scan(
    config: Config,
    file: Option<String>,
    url: Option<String>,
    full: bool,
    format: &str,
) -> Result<()> {
    let format = ReportFormat::parse(format)
        .ok_or_else(|| anyhow::anyhow!("Unknown format '{}'", format))?;
    let content = read_content(file.as_deref())?;

    let origin = url.as_deref().unwrap_or("");
    let domain = Url::parse(origin)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));

    let scanner = Scanner::new(config.scanner);
    let mode = if full { ScanMode::Full } else { ScanMode::Priority };
    let findings = scanner
        .scan(&content, domain.as_deref(), mode, &CancelFlag::new())
        .await;

    tracing::info!(count = findings.len(), "Scan complete");

    let report = LeakReport::new(findings, ReportMetadata::for_target(origin));
    match format {
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Csv => print!("{}", report.to_csv()?),
        ReportFormat::Text => {
            for finding in &report.findings {
                println!(
                    "[{}] {} ({}) at offset {}: {}",
                    finding.risk.name(),
                    finding.rule_id,
                    finding.category,
                    finding.source_offset,
                    leakhound::scanner::rules::mask_secret(&finding.matched_text),
                );
            }
            println!("{} finding(s)", report.summary.total_findings);
        }
    }

    Ok(())
}

async fn run_bucket(config: Config, url: &str) -> Result<()> {
    let candidate = match bucket::parse(url) {
        Ok(candidate) => candidate,
        Err(e) => {
            eprintln!("{} ({})", e, e.user_hint());
            std::process::exit(1);
        }
    };

    let prober = BucketProber::new(config.buckets)?;
    let result = prober.test_access(&candidate).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_replay(
    config: Config,
    captured: &PathBuf,
    target: &str,
    url_override: Option<String>,
    body_override: Option<String>,
) -> Result<()> {
    let descriptor = read_descriptor(captured)?;
    let location = Url::parse(target).with_context(|| format!("Invalid target URL {}", target))?;

    let controller = ReplayController::new(config.replay);
    let id = controller.register_target(TargetHandle {
        location,
        bridge: None,
    });

    let edits = if url_override.is_some() || body_override.is_some() {
        Some(RequestEdits {
            url: url_override,
            body: body_override,
        })
    } else {
        None
    };

    match controller.replay(id, &descriptor, edits.as_ref()).await {
        Ok(response) => {
            tracing::info!(status = response.status, "Replay resolved");
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Err(e) => {
            eprintln!("{}: {} ({})", e.kind(), e, e.user_hint());
            std::process::exit(1);
        }
    }

    controller.detach_target(id);
    Ok(())
}

async fn run_probe(config: Config, captured: &PathBuf, target: &str) -> Result<()> {
    let descriptor = read_descriptor(captured)?;
    let location = Url::parse(target).with_context(|| format!("Invalid target URL {}", target))?;

    let controller = ReplayController::new(config.replay);
    let id = controller.register_target(TargetHandle {
        location,
        bridge: None,
    });

    let mediator = controller
        .mediator(id)
        .ok_or_else(|| anyhow::anyhow!("Target vanished before probing"))?;

    let findings = run_security_probes(&descriptor, mediator.as_ref()).await;
    tracing::info!(count = findings.len(), "Probe suite complete");
    println!("{}", serde_json::to_string_pretty(&findings)?);

    controller.detach_target(id);
    Ok(())
}
