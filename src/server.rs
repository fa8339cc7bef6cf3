//! Reusable server runtime.
//!
//! Provides [`ServerHandle`] that encapsulates the full server lifecycle:
//! database init, migrations, REST API and manager sockets, pending expiry,
//! metrics, and graceful shutdown. The binary and the integration tests both
//! start the service through it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    create_manager_registry, start_pending_expiry_task, BookingService, PaymentCallbackProcessor,
    SharedManagerRegistry,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::{JwtConfig, WebhookVerifier};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
use crate::interfaces::http::middleware::{IdentityProvider, JwtIdentityProvider};
use crate::interfaces::http::modules::metrics::describe_metrics;
use crate::interfaces::http::{create_api_router, ApiContext};
use crate::shared::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the service.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running service.
///
/// # Examples
///
/// ```rust,no_run
/// use cinema_booker::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Live manager sockets.
    pub registry: SharedManagerRegistry,
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the listener is bound to (resolves port 0).
    pub local_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    expiry_task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Start the service with the given options.
    ///
    /// This will:
    /// 1. Install Prometheus metrics recorder
    /// 2. Connect to database and run migrations
    /// 3. Start the pending expiry task
    /// 4. Start REST API server (with Swagger UI and manager sockets)
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;

        info!("Starting cinema booker...");

        let prometheus_handle = prometheus_handle();

        if app_cfg.uses_default_jwt_secret() {
            warn!("security.jwt_secret is the built-in default; set JWT_SECRET in production");
        }
        if app_cfg.payment.webhook_secret.is_empty() {
            warn!("payment.webhook_secret is empty; every webhook will fail verification");
        }

        // ── Database ───────────────────────────────────────────
        let db_config = DatabaseConfig {
            url: app_cfg.database.url.clone(),
            max_connections: app_cfg.database.max_connections,
        };
        let db = init_database(&db_config).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        // ── Repositories & Services ────────────────────────────
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let registry = create_manager_registry();
        let booking_service = Arc::new(BookingService::new(repos.clone()));

        let verifier = WebhookVerifier::new(
            app_cfg.payment.webhook_secret.clone(),
            app_cfg.payment.signature_tolerance_secs,
        );
        let processor = Arc::new(PaymentCallbackProcessor::new(
            repos.clone(),
            registry.clone(),
            verifier,
            app_cfg.payment.max_payload_bytes,
        ));

        let jwt_config = JwtConfig::new(
            app_cfg.security.jwt_secret.clone(),
            app_cfg.security.jwt_expiration_hours,
        );
        info!(
            "JWT configured with {}h token expiration",
            jwt_config.expiration_hours
        );
        let identity: Arc<dyn IdentityProvider> = Arc::new(JwtIdentityProvider::new(jwt_config));

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        let expiry_task = start_pending_expiry_task(
            repos.clone(),
            shutdown_signal.clone(),
            app_cfg.booking.pending_ttl_minutes,
            app_cfg.booking.expiry_check_interval_secs,
        );

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(ApiContext {
            booking_service,
            processor,
            registry: registry.clone(),
            identity,
            db: db.clone(),
            metrics: prometheus_handle,
            started_at: Instant::now(),
            ws_write_timeout: Duration::from_millis(app_cfg.notifications.write_timeout_ms),
            ws_channel_capacity: app_cfg.notifications.channel_capacity,
            shutdown: shutdown_signal.clone(),
        });

        let api_addr = format!("{}:{}", app_cfg.server.host, app_cfg.server.port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        });

        let failure_signal = shutdown_signal;
        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
                failure_signal.trigger();
            }
        });

        info!("Server started.");

        Ok(Self {
            registry,
            repos,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
            expiry_task,
        })
    }

    /// Port the API listener is bound to.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Shared database connection.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then for every task to stop.
    ///
    /// Tasks still running after `server.shutdown_timeout` seconds are aborted.
    pub async fn wait(self) {
        let Self {
            shutdown,
            api_task,
            expiry_task,
            db,
            ..
        } = self;

        let api_abort = api_task.abort_handle();
        let finished = shutdown
            .shutdown_with_cleanup(|| async move {
                info!("Waiting for server tasks to complete...");
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task panicked: {}", e),
                }
                if let Some(task) = expiry_task {
                    if let Err(e) = task.await {
                        error!("Pending expiry task panicked: {}", e);
                    }
                }
            })
            .await;

        if !finished {
            api_abort.abort();
        }

        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }

        info!("Cinema booker shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down cinema booker...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Check if the server is still running.
    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global metrics recorder can only be installed once per process, so a
/// restart within the same process reuses the first handle.
fn prometheus_handle() -> PrometheusHandle {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                describe_metrics();
                info!("Prometheus metrics recorder installed");
                handle
            }
            Err(e) => {
                warn!("Prometheus recorder not installed ({}); /metrics will be empty", e);
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
