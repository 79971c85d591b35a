//! Game Server
//!
//! Wires the session store to its front ends and background loops: the
//! HTTP/SSE listener, the optional WebSocket gateway, periodic snapshots and
//! the idle sweep. Shutdown closes every stream and writes a final snapshot.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::network::http::create_router;
use crate::network::persist::{FileSnapshotStore, PersistError, SnapshotFormat, SnapshotStore};
use crate::network::session::{SessionStore, StoreConfig};
use crate::network::ws::run_gateway;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP/SSE bind address.
    pub bind_addr: SocketAddr,
    /// WebSocket gateway bind address; disabled when `None`.
    pub ws_addr: Option<SocketAddr>,
    /// Snapshot file.
    pub data_path: PathBuf,
    pub snapshot_format: SnapshotFormat,
    pub snapshot_interval: Duration,
    pub sweep_interval: Duration,
    pub idle_timeout: Duration,
    pub queue_ttl: Duration,
    pub ai_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8008)),
            ws_addr: None,
            data_path: PathBuf::from("data/tab-snapshot.json"),
            snapshot_format: SnapshotFormat::Json,
            snapshot_interval: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
            queue_ttl: Duration::from_secs(120),
            ai_delay: Duration::from_millis(600),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `TAB_*` environment variables.
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GameServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("TAB_BIND_ADDR") {
            config.bind_addr = parse_var("TAB_BIND_ADDR", &v)?;
        }
        if let Some(v) = lookup("TAB_WS_ADDR") {
            if !v.trim().is_empty() {
                config.ws_addr = Some(parse_var("TAB_WS_ADDR", &v)?);
            }
        }
        if let Some(v) = lookup("TAB_DATA_PATH") {
            config.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TAB_SNAPSHOT_FORMAT") {
            config.snapshot_format = SnapshotFormat::parse(&v)?;
        }
        if let Some(v) = lookup("TAB_SNAPSHOT_INTERVAL_SECS") {
            config.snapshot_interval = parse_period("TAB_SNAPSHOT_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("TAB_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = parse_period("TAB_SWEEP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("TAB_IDLE_TIMEOUT_SECS") {
            config.idle_timeout = Duration::from_secs(parse_var("TAB_IDLE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("TAB_QUEUE_TTL_SECS") {
            config.queue_ttl = Duration::from_secs(parse_var("TAB_QUEUE_TTL_SECS", &v)?);
        }
        if let Some(v) = lookup("TAB_AI_DELAY_MS") {
            config.ai_delay = Duration::from_millis(parse_var("TAB_AI_DELAY_MS", &v)?);
        }

        Ok(config)
    }

    /// Subset handed to the session store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            idle_timeout: self.idle_timeout,
            queue_ttl: self.queue_ttl,
            ai_delay: self.ai_delay,
            ..StoreConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, GameServerError> {
    value.trim().parse().map_err(|_| GameServerError::Config {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Whole seconds for a timer period; zero is refused.
fn parse_period(key: &str, value: &str) -> Result<Duration, GameServerError> {
    match parse_var::<u64>(key, value)? {
        0 => Err(GameServerError::Config {
            key: key.to_string(),
            value: value.to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Listener or socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad environment value.
    #[error("invalid value '{value}' for {key}")]
    Config { key: String, value: String },

    /// Snapshot load/save failure.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The game server.
pub struct GameServer {
    config: ServerConfig,
    store: Arc<SessionStore>,
    snapshots: Arc<dyn SnapshotStore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Server backed by the snapshot file in `config`, restoring it if present.
    pub fn new(config: ServerConfig) -> Result<Self, GameServerError> {
        let snapshots: Arc<dyn SnapshotStore> =
            Arc::new(FileSnapshotStore::new(config.data_path.clone(), config.snapshot_format));
        Self::with_snapshots(config, snapshots, Arc::new(SystemClock))
    }

    /// Server over an arbitrary snapshot store and clock.
    pub fn with_snapshots(
        config: ServerConfig,
        snapshots: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GameServerError> {
        let store = match snapshots.load()? {
            Some(snapshot) => {
                info!(
                    sessions = snapshot.sessions.len(),
                    saved_at = %snapshot.saved_at,
                    "restoring from snapshot"
                );
                SessionStore::restore(config.store_config(), clock, snapshot)
            }
            None => SessionStore::new(config.store_config(), clock),
        };
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self { config, store, snapshots, shutdown_tx })
    }

    /// The session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Sender that stops [`GameServer::run`] when signalled.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        self.store.resume_ai().await;

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);

        let ws_handle = match self.config.ws_addr {
            Some(addr) => {
                let ws_listener = TcpListener::bind(addr).await?;
                let store = Arc::clone(&self.store);
                let shutdown_tx = self.shutdown_tx.clone();
                Some(tokio::spawn(async move {
                    run_gateway(ws_listener, store, shutdown_tx).await;
                }))
            }
            None => None,
        };

        let snapshot_handle = {
            let store = Arc::clone(&self.store);
            let snapshots = Arc::clone(&self.snapshots);
            let period = self.config.snapshot_interval;
            tokio::spawn(async move {
                Self::run_snapshot_loop(store, snapshots, period).await;
            })
        };

        let sweep_handle = {
            let store = Arc::clone(&self.store);
            let period = self.config.sweep_interval;
            tokio::spawn(async move {
                Self::run_sweep_loop(store, period).await;
            })
        };

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let store = Arc::clone(&self.store);
        let served = axum::serve(listener, create_router(Arc::clone(&self.store)))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Shutdown signal received");
                let closed = store.broadcaster().close_all().await;
                debug!(streams = closed, "closed event streams");
            })
            .await;

        snapshot_handle.abort();
        sweep_handle.abort();
        if let Some(handle) = ws_handle {
            if let Err(e) = handle.await {
                warn!("WebSocket gateway ended abnormally: {}", e);
            }
        }

        let saved = self.save_snapshot().await;
        served?;
        saved
    }

    /// Write a snapshot now.
    pub async fn save_snapshot(&self) -> Result<(), GameServerError> {
        save(&self.store, &self.snapshots).await
    }

    /// Periodic snapshot.
    async fn run_snapshot_loop(store: Arc<SessionStore>, snapshots: Arc<dyn SnapshotStore>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = save(&store, &snapshots).await {
                error!("Snapshot save failed: {}", e);
            }
        }
    }

    /// Periodic idle sweep.
    async fn run_sweep_loop(store: Arc<SessionStore>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = store.sweep().await;
            if !report.forfeited.is_empty() || !report.expired.is_empty() {
                debug!(
                    forfeited = report.forfeited.len(),
                    expired = report.expired.len(),
                    "sweep complete"
                );
            }
        }
    }

    /// Stop the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn save(store: &Arc<SessionStore>, snapshots: &Arc<dyn SnapshotStore>) -> Result<(), GameServerError> {
    let snapshot = store.snapshot().await;
    let sessions = snapshot.sessions.len();
    let snapshots = Arc::clone(snapshots);
    tokio::task::spawn_blocking(move || snapshots.save(&snapshot))
        .await
        .map_err(|e| GameServerError::Internal(format!("snapshot task failed: {}", e)))??;
    debug!(sessions, "snapshot saved");
    Ok(())
}
