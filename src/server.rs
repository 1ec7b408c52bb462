use crate::config::{Config, ConfigError};
use crate::core_fs::{FileAdapter, NativeFileAdapter};
use crate::core_ftpcommand::CommandRegistry;
use crate::core_network::pasv::DataPortListenerSet;
use crate::core_network::{network, ConnectionId, ConnectionPool, ControlConnection, DataConnection};
use crate::core_permissions::PermissionsManager;
use crate::core_server::CoreStatus;
use crate::users::UserRegistry;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// How long a shutdown waits for connections to say goodbye.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the connections and commands share, built once at startup.
pub struct ServerContext {
    pub config: Config,
    pub users: UserRegistry,
    pub permissions: PermissionsManager,
    pub file_adapter: Arc<dyn FileAdapter>,
    pub listeners: DataPortListenerSet,
    pub commands: CommandRegistry,
    pub core: Arc<CoreStatus>,
    next_connection_id: AtomicU64,
}

impl ServerContext {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let file_adapter: Arc<dyn FileAdapter> = Arc::new(NativeFileAdapter);
        let users = UserRegistry::load(&config, file_adapter.as_ref())?;
        let bind_address: IpAddr = config.server.data_bind_address.parse().map_err(|_| {
            ConfigError::invalid("server/data_bind_address", "must be an IP address")
        })?;
        let listeners = DataPortListenerSet::new(bind_address, &config.server.data_ports);

        Ok(Self {
            permissions: PermissionsManager::new(Arc::clone(&file_adapter)),
            file_adapter,
            users,
            listeners,
            commands: CommandRegistry::new(),
            core: Arc::new(CoreStatus::new()),
            next_connection_id: AtomicU64::new(1),
            config,
        })
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Runs the FTP server until Ctrl-C, then drains every connection.
pub async fn run(config: Config) -> Result<()> {
    info!(
        "Starting server on port {} ({} data ports)",
        config.server.listen_port,
        config.server.data_ports.len()
    );
    let context = Arc::new(ServerContext::new(config).context("Invalid configuration")?);
    let period = Duration::from_millis(context.config.server.service_interval_ms);

    let control_pool = Arc::new(ConnectionPool::<ControlConnection>::new(
        "control",
        Arc::clone(&context.core),
    ));
    let data_pool = Arc::new(ConnectionPool::<DataConnection>::new(
        "data",
        Arc::clone(&context.core),
    ));
    control_pool.initialize()?;
    data_pool.initialize()?;
    let control_service = control_pool.spawn_service(period);
    let data_service = data_pool.spawn_service(period);

    if context.listeners.bind() == 0 {
        warn!("No data port could be bound, PASV will retry on demand");
    }

    let port = context.config.server.listen_port;
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind control port {}", port))?;
    info!("Server listening on port {}", port);

    tokio::select! {
        result = network::start_server(listener, Arc::clone(&context), Arc::clone(&control_pool), Arc::clone(&data_pool)) => {
            result.context("Control listener failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
        }
    }

    context.core.poison();
    let started = Instant::now();
    while control_pool.size() + data_pool.size() > 0 && started.elapsed() < DRAIN_TIMEOUT {
        tokio::time::sleep(period).await;
    }
    debug!(
        "Pools drained in {:?}, {} connections left",
        started.elapsed(),
        control_pool.size() + data_pool.size()
    );

    control_pool.destroy().await;
    data_pool.destroy().await;
    context.listeners.unbind();
    let _ = tokio::join!(control_service, data_service);

    info!("Server stopped");
    Ok(())
}
