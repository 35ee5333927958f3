//! Gridbrain Daemon - Background learning service
//!
//! Runs the auto-grader continuously in the background, managing:
//! - Network state and graded cycling
//! - Persistent grader images
//! - IPC server for display clients
//!
//! Storage locations:
//! - Linux: ~/.local/share/gridbrain/
//! - Windows: %APPDATA%\gridbrain\
//! - MacOS: ~/Library/Application Support/gridbrain/
//!
//! The protocol is one JSON request per line, one JSON response per line.
//! Displays may only observe state and issue "run one cycle" or
//! "reward"/"punish"; the latter two are rejected while auto-cycling
//! drives the grader.

use std::fs::File;
use std::io::{BufReader as StdBufReader, BufWriter, Write as _};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock};
use tokio::time;
use tracing::{error, info, warn};

use gridbrain::engine::CycleEngine;
use gridbrain::grader::{AutoGrader, GraderConfig};
use gridbrain::network::{CellDelta, Network, NetworkConfig};
use gridbrain::observer::{GraderAdapter, GraderSnapshot};

mod paths;

use paths::AppPaths;

const DEFAULT_PORT: u16 = 4790;
const SAVE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
enum DaemonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Paths(String),
    #[error("config error: {0}")]
    Config(#[from] gridbrain::network::ConfigError),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Request {
    /// Full grader snapshot.
    Status,
    /// Per-cell activation deltas since the last drain.
    Deltas,
    /// Run exactly one graded cycle.
    Cycle,
    /// Manual positive reinforcement; rejected while auto-cycling.
    Reward,
    /// Manual negative reinforcement; rejected while auto-cycling.
    Punish,
    AutoStart,
    AutoStop,
    Save,
    Shutdown,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Response {
    Ok,
    Status {
        auto_cycling: bool,
        snapshot: GraderSnapshot,
    },
    Deltas {
        cells: Vec<CellDelta>,
    },
    Outcome {
        matched: bool,
        symbol: String,
        target: String,
        distance: u32,
        grew: bool,
    },
    Error {
        message: String,
    },
}

struct DaemonState {
    grader: AutoGrader,
    auto_cycling: bool,
}

type Shared = Arc<RwLock<DaemonState>>;

fn load_or_create_grader(path: &Path) -> Result<AutoGrader, DaemonError> {
    if path.exists() {
        let file = File::open(path)?;
        let mut reader = StdBufReader::new(file);
        match AutoGrader::load_image_from(&mut reader) {
            Ok(grader) => {
                info!(path = %path.display(), "restored grader image");
                return Ok(grader);
            }
            Err(e) => {
                warn!(error = %e, "grader image unreadable, starting fresh");
            }
        }
    }

    let network = Network::new(NetworkConfig::with_size(7, 2, 2))?;
    let grader = AutoGrader::new(CycleEngine::new(network), GraderConfig::default())?;
    info!("created fresh 7x2 grader");
    Ok(grader)
}

fn save_grader(path: &Path, grader: &AutoGrader) -> Result<(), DaemonError> {
    let tmp = path.with_extension("gbi.tmp");
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        grader.save_image_to(&mut writer)?;
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

async fn handle_request(state: &Shared, req: Request, shutdown: &watch::Sender<bool>,
    grader_path: &Path) -> Response {
    match req {
        Request::Status => {
            let st = state.read().await;
            Response::Status {
                auto_cycling: st.auto_cycling,
                snapshot: GraderAdapter::new(&st.grader).snapshot(),
            }
        }
        Request::Deltas => {
            let mut st = state.write().await;
            Response::Deltas {
                cells: st.grader.engine_mut().network_mut().drain_changes(),
            }
        }
        Request::Cycle => {
            let mut st = state.write().await;
            if st.auto_cycling {
                return Response::Error {
                    message: "auto-cycling owns the grader; stop it first".into(),
                };
            }
            let outcome = tokio::task::block_in_place(|| st.grader.run_graded_cycle());
            Response::Outcome {
                matched: outcome.matched,
                symbol: gridbrain::codec::printable(outcome.symbol).to_string(),
                target: gridbrain::codec::printable(outcome.target).to_string(),
                distance: outcome.distance,
                grew: outcome.grew,
            }
        }
        Request::Reward | Request::Punish => {
            let reward = matches!(req, Request::Reward);
            let mut st = state.write().await;
            if st.auto_cycling {
                return Response::Error {
                    message: "manual reinforcement is disabled while auto-cycling".into(),
                };
            }
            st.grader.engine_mut().network_mut().stimulate(reward);
            Response::Ok
        }
        Request::AutoStart => {
            state.write().await.auto_cycling = true;
            info!("auto-cycling started");
            Response::Ok
        }
        Request::AutoStop => {
            state.write().await.auto_cycling = false;
            info!("auto-cycling stopped");
            Response::Ok
        }
        Request::Save => {
            let st = state.read().await;
            match save_grader(grader_path, &st.grader) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }
        Request::Shutdown => {
            let _ = shutdown.send(true);
            Response::Ok
        }
    }
}

async fn handle_client(
    state: Shared,
    stream: TcpStream,
    shutdown: watch::Sender<bool>,
    grader_path: std::path::PathBuf,
) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "?".into());
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(peer = %peer, error = %e, "client read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(req) => handle_request(&state, req, &shutdown, &grader_path).await,
            Err(e) => Response::Error {
                message: format!("bad request: {e}"),
            },
        };

        let mut payload = match serde_json::to_string(&response) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "response serialization failed");
                break;
            }
        };
        payload.push('\n');
        if let Err(e) = write_half.write_all(payload.as_bytes()).await {
            warn!(peer = %peer, error = %e, "client write failed");
            break;
        }
        if *shutdown.borrow() {
            break;
        }
    }
}

/// Drives graded cycles whenever auto-cycling is enabled. The write lock is
/// taken per cycle and released between cycles, so IPC requests and the stop
/// request are honored at cycle boundaries, never mid-sweep.
async fn auto_cycle_loop(state: Shared, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        let enabled = state.read().await.auto_cycling;
        if !enabled {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = time::sleep(Duration::from_millis(50)) => continue,
            }
        }

        let mut st = state.write().await;
        if !st.auto_cycling {
            continue;
        }
        let outcome = tokio::task::block_in_place(|| st.grader.run_graded_cycle());
        if outcome.grew {
            let net = st.grader.engine().network();
            info!(
                width = net.width(),
                height = net.height(),
                generation = st.grader.generation(),
                "network grew after stagnation"
            );
        }
        drop(st);

        tokio::task::yield_now().await;
    }
}

async fn periodic_save_loop(
    state: Shared,
    grader_path: std::path::PathBuf,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(SAVE_INTERVAL);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = ticker.tick() => {}
        }
        let st = state.read().await;
        if let Err(e) = save_grader(&grader_path, &st.grader) {
            warn!(error = %e, "periodic save failed");
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        error!(error = %e, "daemon failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DaemonError> {
    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let app_paths = AppPaths::new().map_err(DaemonError::Paths)?;
    let grader_path = app_paths.grader_file();

    let grader = load_or_create_grader(&grader_path)?;
    let state: Shared = Arc::new(RwLock::new(DaemonState {
        grader,
        auto_cycling: false,
    }));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let cycler = tokio::spawn(auto_cycle_loop(Arc::clone(&state), shutdown_rx.clone()));
    let saver = tokio::spawn(periodic_save_loop(
        Arc::clone(&state),
        grader_path.clone(),
        shutdown_rx.clone(),
    ));

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, data_dir = %app_paths.data_dir().display(), "gridbraind listening");

    let mut shutdown = shutdown_rx;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        info!(client = %addr, "display connected");
                        tokio::spawn(handle_client(
                            Arc::clone(&state),
                            stream,
                            shutdown_tx.clone(),
                            grader_path.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
        }
    }

    info!("shutting down");
    let _ = cycler.await;
    let _ = saver.await;

    let st = state.read().await;
    save_grader(&grader_path, &st.grader)?;
    info!(path = %grader_path.display(), "final grader image saved");
    Ok(())
}
