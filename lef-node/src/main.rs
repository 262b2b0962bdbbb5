use anyhow::{bail, Context, Result};
use clap::Parser;
use lef_api::AppState;
use lef_genesis::{create_genesis_state, GenesisConfig};
use lef_sequencer::SequencerService;
use lef_storage::{KvBackend, Storage};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "LefCoin ledger node", long_about = None)]
struct Args {
    /// RocksDB directory. Without it state lives in memory only.
    #[arg(short, long)]
    data_dir: Option<String>,
    /// Genesis config, required when the store holds no state yet.
    #[arg(short, long)]
    genesis: Option<PathBuf>,
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: SocketAddr,
    #[arg(long, default_value_t = 1000)]
    batch_interval_ms: u64,
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Setup Logging
    let level = Level::from_str(&args.log_level).context("invalid --log-level")?;
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    info!("Starting LefCoin node...");

    // 2. Init Storage
    match &args.data_dir {
        None => {
            info!("No data directory; state is kept in memory");
            run(Storage::in_memory(), &args).await
        }
        Some(dir) => open_persistent(dir, &args).await,
    }
}

#[cfg(feature = "rocksdb")]
async fn open_persistent(dir: &str, args: &Args) -> Result<()> {
    let storage = Storage::open(dir).context("Failed to initialize storage")?;
    info!("Storage initialized at {}", dir);
    run(storage, args).await
}

#[cfg(not(feature = "rocksdb"))]
async fn open_persistent(_dir: &str, _args: &Args) -> Result<()> {
    bail!("--data-dir requires a build with the `rocksdb` feature")
}

async fn run<B: KvBackend + 'static>(storage: Storage<B>, args: &Args) -> Result<()> {
    let storage = Arc::new(storage);

    // 3. Load or Create State
    let state = match storage.load_state()? {
        Some(state) => {
            info!(tip = storage.tip()?, "Loaded existing state");
            state
        }
        None => {
            let Some(path) = &args.genesis else {
                bail!("empty store and no --genesis given");
            };
            info!("State is empty, building genesis from {}", path.display());
            let config = GenesisConfig::from_file(path)?;
            let genesis = create_genesis_state(&config)?;
            storage.save_state(&genesis).context("Failed to save genesis state")?;
            genesis
        }
    };
    let shared_state = Arc::new(RwLock::new(state));

    // 4. Init Sequencer
    let (tx_sender, tx_receiver) = mpsc::channel(1000);
    let sequencer = SequencerService::new(
        shared_state.clone(),
        storage.clone(),
        tx_receiver,
        Duration::from_millis(args.batch_interval_ms),
    )?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sequencer_handle = tokio::spawn(sequencer.run(shutdown_rx));

    // 5. Init API
    let api_state = AppState {
        global_state: shared_state,
        storage,
        tx_sender,
    };
    let listen = args.listen;
    tokio::spawn(async move {
        if let Err(e) = lef_api::start_server(listen, api_state).await {
            error!("API server stopped: {}", e);
        }
    });

    info!("Node running. Press Ctrl+C to stop.");
    signal::ctrl_c().await?;
    info!("Shutting down, sealing queued transactions");
    shutdown_tx.send(true).context("sequencer already stopped")?;
    sequencer_handle.await.context("sequencer task panicked")?;
    info!("Shutdown complete");
    Ok(())
}
