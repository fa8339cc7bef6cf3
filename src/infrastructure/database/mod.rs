pub mod entities;
pub mod migrator;
pub mod repositories;

use std::time::Duration;

use sea_orm::sqlx::sqlite::SqliteJournalMode;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use migrator::Migrator;

const DEFAULT_DATABASE_URL: &str = "sqlite://./cinema-booker.db?mode=rwc";

/// How long a SQLite writer waits for the database lock before failing
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://./cinema-booker.db?mode=rwc")
    pub url: String,
    /// Upper bound on pooled connections. In-memory SQLite always uses one.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// Create config for SQLite
    pub fn sqlite(path: &str) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path),
            ..Self::default()
        }
    }

    /// Private in-memory database, used by tests
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Initialize database connection
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    info!("Connecting to database: {}", config.url);

    let mut options = ConnectOptions::new(config.url.clone());
    // Every pooled connection to `sqlite::memory:` would open its own empty
    // database, so the pool is pinned to a single connection.
    let max_connections = if config.is_in_memory() {
        1
    } else {
        config.max_connections.max(1)
    };
    options
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let in_memory = config.is_in_memory();
    options.map_sqlx_sqlite_opts(move |opts| {
        let opts = opts.busy_timeout(SQLITE_BUSY_TIMEOUT);
        if in_memory {
            opts
        } else {
            // Readers keep working while one pooled connection writes.
            opts.journal_mode(SqliteJournalMode::Wal)
        }
    });

    let db = Database::connect(options).await?;
    info!(max_connections, "Database connected successfully");
    Ok(db)
}

/// Connect and bring the schema up to date
pub async fn init_database_with_migrations(
    config: &DatabaseConfig,
) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let db = init_database(config).await?;
    info!("Running database migrations...");
    Migrator::up(&db, None).await?;
    info!("Migrations completed");
    Ok(db)
}
