//! the `serve` subcommand - runs the control-plane server.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use hue_db::{ActiveDb, HistoryDb, MetaDb};
use hue_engine::{
    EventStore, PenaltyManager, QuotaEngine, ReceiverHub, SessionTracker, UsageEngine,
};
use hue_state::{LockRegistry, MemoryState};
use hue_types::{Config, EnforcementMode, EventStoreKind, parse_duration};

use crate::rpc::pb::admin_service_server::AdminServiceServer;
use crate::rpc::pb::node_service_server::NodeServiceServer;
use crate::rpc::pb::usage_service_server::UsageServiceServer;
use crate::rpc::{AdminServiceImpl, NodeServiceImpl, UsageServiceImpl};
use crate::{AppState, create_app};

/// run the hue control-plane server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// base database url; the active and history stores derive from it
    #[arg(long, default_value = "sqlite://./hue.db", env = "HUE_DB_URL")]
    db_url: String,

    /// grpc listen port
    #[arg(long, default_value_t = 50051, env = "HUE_PORT")]
    port: u16,

    /// http listen port
    #[arg(long, default_value_t = 50052, env = "HUE_HTTP_PORT")]
    http_port: u16,

    /// log level
    #[arg(long, default_value = "info", env = "HUE_LOG_LEVEL")]
    log_level: String,

    /// shared admin secret
    #[arg(long, env = "HUE_AUTH_SECRET")]
    auth_secret: String,

    /// active-buffer flush interval (e.g. 5m, 90s)
    #[arg(long, default_value = "5m", env = "HUE_DB_FLUSH_INTERVAL")]
    db_flush_interval: String,

    /// sliding window for concurrent-session counting
    #[arg(long, default_value = "5m", env = "HUE_CONCURRENT_WINDOW")]
    concurrent_window: String,

    /// penalty duration
    #[arg(long, default_value = "10m", env = "HUE_PENALTY_DURATION")]
    penalty_duration: String,

    /// path to a maxmind database; geo features disabled when empty
    #[arg(long, default_value = "", env = "HUE_MAXMIND_DB_PATH")]
    maxmind_db_path: String,

    /// event persistence backend: db, file, none
    #[arg(long, default_value = "db", env = "HUE_EVENT_STORE_TYPE")]
    event_store_type: String,

    /// comma-separated CIDRs allowed to call node/usage services
    #[arg(long, default_value = "", env = "HUE_ALLOWED_NODE_IPS")]
    allowed_node_ips: String,

    /// manager enforcement mode: soft, default, hard
    #[arg(long, default_value = "default", env = "HUE_ENFORCEMENT_MODE")]
    enforcement_mode: String,
}

impl ServeCommand {
    /// convert cli arguments into a Config struct
    fn into_config(self) -> Result<Config> {
        if self.auth_secret.is_empty() {
            bail!("HUE_AUTH_SECRET is required");
        }

        Ok(Config {
            db_url: self.db_url,
            grpc_port: self.port,
            http_port: self.http_port,
            log_level: self.log_level,
            auth_secret: self.auth_secret,
            flush_interval: parse_duration(&self.db_flush_interval)
                .context("invalid HUE_DB_FLUSH_INTERVAL")?,
            concurrent_window: parse_duration(&self.concurrent_window)
                .context("invalid HUE_CONCURRENT_WINDOW")?,
            penalty_duration: parse_duration(&self.penalty_duration)
                .context("invalid HUE_PENALTY_DURATION")?,
            usage_retention: Config::default().usage_retention,
            maxmind_db_path: self.maxmind_db_path,
            event_store: EventStoreKind::parse(&self.event_store_type),
            allowed_node_ips: Config::parse_allowed_ips(&self.allowed_node_ips)
                .context("invalid HUE_ALLOWED_NODE_IPS")?,
        })
    }

    /// run the serve command
    pub async fn run(self) -> Result<()> {
        // initialize logging
        let log_level = match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
        tracing::subscriber::set_global_default(subscriber)?;

        let enforcement = EnforcementMode::parse(&self.enforcement_mode);
        let config = Arc::new(self.into_config()?);

        info!(
            grpc_port = config.grpc_port,
            http_port = config.http_port,
            "starting hue"
        );

        // the three stores, in construction order
        let meta = MetaDb::new(&config.db_url)
            .await
            .context("failed to initialize metadata store")?;
        let active = Arc::new(
            ActiveDb::new(&config.db_url)
                .await
                .context("failed to initialize active store")?,
        );
        let history = HistoryDb::new(&config.db_url)
            .await
            .context("failed to initialize history store")?;
        info!(db_url = %config.db_url, "stores initialized");

        // shared in-memory state and the engine
        let state = Arc::new(MemoryState::new());
        let locks = Arc::new(LockRegistry::new());

        let quota = Arc::new(QuotaEngine::new(
            meta.clone(),
            Arc::clone(&state),
            Arc::clone(&locks),
        ));
        quota.set_enforcement_mode(enforcement);

        let session = Arc::new(SessionTracker::new(
            Arc::clone(&state),
            config.concurrent_window,
        ));
        let penalty = Arc::new(PenaltyManager::new(
            Arc::clone(&state),
            config.penalty_duration,
        ));

        let geo = load_geo_resolver(&config.maxmind_db_path);
        let events = EventStore::new(config.event_store, history.clone())
            .context("failed to initialize event store")?;
        let hub = Arc::new(ReceiverHub::new());

        let engine = Arc::new(UsageEngine::new(
            quota,
            session,
            penalty,
            geo,
            events,
            hub,
            Arc::clone(&state),
            meta.clone(),
            Arc::clone(&active),
            history.clone(),
        ));

        let app_state = AppState {
            engine: Arc::clone(&engine),
            meta: meta.clone(),
            active: Arc::clone(&active),
            state: Arc::clone(&state),
            config: Arc::clone(&config),
        };

        // background loops observe the shutdown signal
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let flush_active = Arc::clone(&active);
        let mut flush_shutdown = shutdown_rx.clone();
        let flush_interval = config.flush_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(flush_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = flush_active.flush().await {
                            error!(error = %e, "periodic flush failed");
                        }
                    }
                    _ = flush_shutdown.changed() => break,
                }
            }
        });

        let cleanup_engine = Arc::clone(&engine);
        let cleanup_active = Arc::clone(&active);
        let mut cleanup_shutdown = shutdown_rx.clone();
        let cleanup_interval = config.concurrent_window;
        let retention = chrono::Duration::from_std(config.usage_retention)
            .unwrap_or_else(|_| chrono::Duration::days(30));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        cleanup_engine.cleanup();
                        let cutoff = chrono::Utc::now() - retention;
                        if let Err(e) = cleanup_active.delete_old_processed(cutoff).await {
                            error!(error = %e, "usage retention sweep failed");
                        }
                    }
                    _ = cleanup_shutdown.changed() => break,
                }
            }
        });

        // http server
        let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port)
            .parse()
            .context("invalid http listen address")?;
        let app = create_app(app_state.clone());
        let listener = TcpListener::bind(http_addr)
            .await
            .with_context(|| format!("failed to bind {http_addr}"))?;
        info!(addr = %http_addr, "http server listening");

        let mut http_shutdown = shutdown_rx.clone();
        let http_server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = http_shutdown.changed().await;
                })
                .await
        });

        // grpc server
        let grpc_addr: SocketAddr = format!("0.0.0.0:{}", config.grpc_port)
            .parse()
            .context("invalid grpc listen address")?;
        info!(addr = %grpc_addr, "grpc server listening");

        let mut grpc_shutdown = shutdown_rx.clone();
        let grpc_state = app_state.clone();
        let grpc_server = tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(UsageServiceServer::new(UsageServiceImpl::new(
                    grpc_state.clone(),
                )))
                .add_service(NodeServiceServer::new(NodeServiceImpl::new(
                    grpc_state.clone(),
                )))
                .add_service(AdminServiceServer::new(AdminServiceImpl::new(grpc_state)))
                .serve_with_shutdown(grpc_addr, async move {
                    let _ = grpc_shutdown.changed().await;
                })
                .await
        });

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        info!("shutting down hue...");
        let _ = shutdown_tx.send(true);

        // final flush before the stores go away
        if let Err(e) = active.flush().await {
            error!(error = %e, "final flush failed");
        }

        let _ = http_server.await;
        let _ = grpc_server.await;

        // close in reverse construction order
        let _ = history.close().await;
        let _ = active.close().await;
        let _ = meta.close().await;

        info!("hue shutdown complete");
        Ok(())
    }
}

#[cfg(feature = "maxminddb")]
fn load_geo_resolver(path: &str) -> Option<Arc<dyn hue_engine::GeoIpResolver>> {
    if path.is_empty() {
        warn!("no maxmind database configured, geo features disabled");
        return None;
    }
    match hue_engine::MaxmindGeoIpResolver::from_path(path) {
        Some(resolver) => Some(Arc::new(resolver)),
        None => {
            warn!(path = %path, "failed to open maxmind database, geo features disabled");
            None
        }
    }
}

#[cfg(not(feature = "maxminddb"))]
fn load_geo_resolver(path: &str) -> Option<Arc<dyn hue_engine::GeoIpResolver>> {
    if !path.is_empty() {
        warn!("maxmind support not compiled in, geo features disabled");
    }
    None
}
