//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;

pub use database::repositories::SeaOrmRepositoryProvider;
pub use database::{init_database, init_database_with_migrations, DatabaseConfig};
