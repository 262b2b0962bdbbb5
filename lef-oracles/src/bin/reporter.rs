use anyhow::{bail, Context, Result};
use clap::Parser;
use lef_crypto::signatures::keypair_from_hex;
use lef_oracles::{ReporterClient, ScoreSet};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Submits subindex scores to a LefCoin node")]
struct Args {
    #[arg(short, long, default_value = "http://localhost:3000")]
    node_url: String,
    #[arg(short, long, default_value = "reporter.json")]
    wallet_path: PathBuf,
    /// Inline scores, e.g. `0=620,1=540,2=700`
    #[arg(long, conflicts_with = "scores_file")]
    scores: Option<String>,
    /// JSON object of id -> score or {"text", "numeric"} signals, re-read every cycle
    #[arg(long)]
    scores_file: Option<PathBuf>,
    /// Log the scores without submitting
    #[arg(long)]
    dry_run: bool,
    /// Keep running and resubmit every `--interval-hours`
    #[arg(long)]
    daemon: bool,
    #[arg(long, default_value_t = 6)]
    interval_hours: u64,
}

#[derive(Deserialize)]
struct Wallet {
    secret_key: String,
}

fn load_scores(args: &Args) -> Result<ScoreSet> {
    match (&args.scores, &args.scores_file) {
        (Some(inline), _) => ScoreSet::parse_inline(inline),
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            ScoreSet::parse_json(&raw)
        }
        (None, None) => bail!("pass --scores or --scores-file"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args = Args::parse();
    let wallet: Wallet = serde_json::from_str(
        &std::fs::read_to_string(&args.wallet_path)
            .with_context(|| format!("reading wallet {}", args.wallet_path.display()))?,
    )?;
    let reporter = ReporterClient::new(&args.node_url, keypair_from_hex(&wallet.secret_key)?, args.dry_run);
    info!(reporter = %hex::encode(reporter.address()), dry_run = args.dry_run, "reporter ready");

    if !args.daemon {
        reporter.submit(&load_scores(&args)?).await?;
        return Ok(());
    }

    info!(interval_hours = args.interval_hours, "Starting daemon mode");
    let mut interval = tokio::time::interval(Duration::from_secs(args.interval_hours.max(1) * 3600));
    loop {
        interval.tick().await;
        let result = match load_scores(&args) {
            Ok(scores) => reporter.submit(&scores).await.map(drop),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("cycle failed: {:#}", e);
        }
    }
}
