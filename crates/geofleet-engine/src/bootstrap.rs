//! Store selection at startup.
//!
//! `PostgreSQL` is opened and migrated eagerly so connectivity problems
//! surface before the first tick. When it cannot be reached and
//! `store.fallback_to_memory` is set, the engine continues on the
//! in-memory store instead of exiting.

use geofleet_core::config::{BackendKind, StoreConfig};
use geofleet_db::{DbError, MemoryStore, PostgresConfig, PostgresPool, PostgresStore, StoreBackend};
use tracing::{info, warn};

/// Open the store selected by `config`.
///
/// # Errors
///
/// Returns [`DbError::Unavailable`] when `PostgreSQL` cannot be reached and
/// fallback is disabled, or any migration error.
pub async fn open_store(config: &StoreConfig) -> Result<StoreBackend, DbError> {
    match config.backend {
        BackendKind::Memory => {
            info!("Using in-memory store");
            Ok(StoreBackend::Memory(MemoryStore::new()))
        }
        BackendKind::Postgres => match open_postgres(config).await {
            Ok(store) => Ok(StoreBackend::Postgres(store)),
            Err(e) if e.is_unavailable() && config.fallback_to_memory => {
                warn!(error = %e, "PostgreSQL unreachable, falling back to in-memory store");
                Ok(StoreBackend::Memory(MemoryStore::new()))
            }
            Err(e) => Err(e),
        },
    }
}

async fn open_postgres(config: &StoreConfig) -> Result<PostgresStore, DbError> {
    let pg_config = PostgresConfig::new(&config.database_url, config.max_connections);
    let pool = PostgresPool::connect(&pg_config).await?;
    pool.run_migrations().await?;
    Ok(PostgresStore::new(pool))
}
