use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use arxiv_digest::channels::{
    EmailConfig, FileSource, ImapSource, MailSink, MailSource, SmtpSink, StdoutSink,
};
use arxiv_digest::config::{DigestConfig, parse_interval};
use arxiv_digest::pipeline::filter::parse_keywords;
use arxiv_digest::pipeline::types::PaperRecord;
use arxiv_digest::pipeline::{DigestPipeline, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "arxiv-digest")]
#[command(about = "Filter today's arXiv digest email by keyword and mail the matches")]
#[command(version)]
struct Cli {
    /// Read the digest from a saved file (.eml or plain text) instead of IMAP
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Print the report to stdout instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// Comma-separated keywords
    #[arg(long, short = 'k', env = "KEYWORDS")]
    keywords: Option<String>,

    /// Report recipient
    #[arg(long, env = "RECIPIENT_EMAIL")]
    recipient: Option<String>,

    /// Repeat every SECS seconds until Ctrl-C (0 = once)
    #[arg(long, value_name = "SECS", env = "POLL_INTERVAL_SECS")]
    watch: Option<String>,

    /// Print the matched papers as JSON to stdout (the dry-run report also goes to stdout)
    #[arg(long, conflicts_with = "dry_run")]
    json: bool,
}

/// Stderr output plus a plain-text log file. The returned guard flushes
/// the file writer on drop.
fn init_tracing(log_file: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "arxiv_filter.log".into());

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        );
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env values win over the inherited environment
    let _ = dotenvy::dotenv_override();

    let cli = Cli::parse();

    let mut config = DigestConfig::from_env()?;
    if let Some(raw) = &cli.keywords {
        config.keywords = parse_keywords(raw);
    }
    if let Some(recipient) = cli.recipient.clone() {
        config.recipient = Some(recipient);
    }
    if let Some(raw) = &cli.watch {
        config.poll_interval = parse_interval(raw)?;
    }

    let _log_guard = init_tracing(&config.log_file);

    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        keywords = config.keywords.len(),
        dry_run = cli.dry_run,
        "Starting arxiv-digest"
    );

    let source: Box<dyn MailSource> = match &cli.input {
        Some(path) => Box::new(FileSource::new(path.clone())),
        None => Box::new(ImapSource::new(EmailConfig::from_env()?)),
    };

    let (sink, recipient): (Box<dyn MailSink>, String) = if cli.dry_run {
        (
            Box::new(StdoutSink::new()),
            config.recipient.clone().unwrap_or_else(|| "(dry run)".to_string()),
        )
    } else {
        (
            Box::new(SmtpSink::new(EmailConfig::from_env()?)),
            config.require_recipient()?.to_string(),
        )
    };

    let pipeline = DigestPipeline::new(
        source,
        sink,
        recipient,
        config.keywords.clone(),
        config.preview_chars,
    );

    match config.poll_interval {
        None => {
            let outcome = pipeline.run().await?;
            report_outcome(&outcome, cli.json)?;
        }
        Some(interval) => {
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            watch(&pipeline, interval, cli.json, shutdown).await;
        }
    }

    Ok(())
}

/// Run once per tick until `shutdown` resolves, including mid-run. A failed
/// run is logged and the loop continues.
async fn watch(
    pipeline: &DigestPipeline,
    interval: Duration,
    json: bool,
    shutdown: impl Future<Output = ()>,
) {
    tracing::info!("Polling every {}s", interval.as_secs());
    let mut tick = tokio::time::interval(interval);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => break,
        }
        tokio::select! {
            result = pipeline.run() => match result {
                Ok(outcome) => {
                    if let Err(e) = report_outcome(&outcome, json) {
                        tracing::error!("Failed to print results: {e}");
                    }
                }
                Err(e) => tracing::error!("Digest run failed: {e}"),
            },
            _ = &mut shutdown => break,
        }
    }
    tracing::info!("Shutting down");
}

fn report_outcome(outcome: &RunOutcome, json: bool) -> anyhow::Result<()> {
    tracing::info!(outcome = outcome.label(), "Run finished");
    if json {
        let matched: &[PaperRecord] = match outcome {
            RunOutcome::Sent { matched, .. } => matched.as_slice(),
            _ => &[],
        };
        println!("{}", serde_json::to_string_pretty(matched)?);
    }
    Ok(())
}
