use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use directories::UserDirs;
use tracing::{error, info, warn, Level};

use clock::Clock;
use engine::{Engine, EngineInit};
use pubsub::PubSub;
use storage::{PersistentStorage, RocksStore};
use types::config::{AppVersion, EngineConfig, MIN_DB_VERSION};
use types::events::topics;

const APPVERSION_KEY: &str = "appversion";

/// Run the aggregating parent chain's block engine.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Overrides `EngineConfig.data_dir` and `BC_DATA_DIR`.
    #[clap(short, long)]
    datadir: Option<PathBuf>,
    /// Path to a JSON `EngineConfig` file, read before environment overlay.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Miner key attached to any block this node mines.
    #[clap(short, long)]
    miner: Option<String>,
    /// Run against an in-memory store instead of opening `datadir`. For
    /// local experimentation only; nothing persists across restarts.
    #[clap(long)]
    memory: bool,
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::open(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env();

    if let Some(datadir) = &args.datadir {
        config.data_dir = datadir.clone();
    }
    if let Some(miner) = &args.miner {
        config.miner_key = miner.clone();
    }
    Ok(config)
}

fn default_datadir() -> PathBuf {
    let mut dir = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir);
    dir.push(".bcdata");
    dir
}

/// Loads `appversion`, bailing with exit 8 if its `db_version` predates
/// `MIN_DB_VERSION`; writes a fresh record on first run.
fn check_appversion(store: &PersistentStorage) -> anyhow::Result<()> {
    use storage::TypedStore;

    match store.get_typed::<AppVersion>(APPVERSION_KEY)? {
        Some(v) if v.db_version_too_old() => {
            error!(db_version = %v.db_version, min = ?MIN_DB_VERSION, "db_version too old");
            std::process::exit(8);
        }
        Some(_) => Ok(()),
        None => {
            let version = AppVersion {
                version: env!("CARGO_PKG_VERSION").to_string(),
                commit: "unknown".to_string(),
                db_version: format!(
                    "{}.{}.{}",
                    MIN_DB_VERSION.0, MIN_DB_VERSION.1, MIN_DB_VERSION.2
                ),
            };
            store.put_typed(APPVERSION_KEY, &version)?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();
    let mut config = load_config(&args)?;
    if config.data_dir == PathBuf::from(".bcdata") && args.datadir.is_none() {
        config.data_dir = default_datadir();
    }

    info!(datadir = ?config.data_dir, miner = %config.miner_key, "starting");

    let store = if args.memory {
        PersistentStorage::memory()
    } else {
        std::fs::create_dir_all(&config.data_dir)?;
        PersistentStorage::rocks(RocksStore::open(&config.data_dir)?)
    };

    if let Err(e) = check_appversion(&store) {
        error!(error = %e, "appversion check failed");
        std::process::exit(1);
    }

    let clock = Arc::new(Clock::new());
    let pubsub = Arc::new(PubSub::new());
    pubsub.subscribe(topics::BLOCK_MINED, "node-log", |event| {
        info!(height = event.data.height, hash = %event.data.hash, "block mined");
    });
    pubsub.subscribe(topics::STATE_RESYNC_FAILED, "node-log", |_| {
        warn!("resync failed, purging block pool");
    });
    pubsub.subscribe(topics::STATE_CHECKPOINT_END, "node-log", |_| {
        info!("backward sync reached genesis, checkpoint closed");
    });

    // No `rover`/`peer` adapter is wired into this core (spec's explicit
    // out-of-scope declaration); a deployment that needs live mining or
    // cross-node sync links one in by constructing `EngineInit.peer` and
    // feeding `Engine::on_rover_tip` itself.
    if config.p2p_passive {
        info!("BC_P2P_PASSIVE set, no peer adapter would be dialed in this build anyway");
    }

    let mut engine = Engine::new(EngineInit {
        store: store.clone(),
        pubsub: pubsub.clone(),
        clock,
        peer: None,
        worker_path: worker_path(),
        miner_key: config.miner_key.clone(),
        known_rovers: config.known_rovers.clone(),
    })?;

    if let Err(e) = engine.bootstrap() {
        error!(error = %e, "genesis bootstrap failed");
        std::process::exit(1);
    }

    info!("ready, waiting for rover tips and worker solutions");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                engine.stop_mining().await;
                break;
            }
            solution = engine.wait_for_solution() => {
                match solution {
                    Some(Ok(solution)) => {
                        if let Err(e) = engine.on_worker_solution(solution).await {
                            warn!(error = %e, "on_worker_solution failed");
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "mining worker errored"),
                    None => warn!("mining worker exited without a solution"),
                }
            }
        }
    }

    Ok(())
}

/// The worker binary is expected next to this one, matching how `cargo
/// install`/packaging places `[[bin]]` targets from the same workspace.
fn worker_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("miner-worker")))
        .unwrap_or_else(|| PathBuf::from("miner-worker"))
}
