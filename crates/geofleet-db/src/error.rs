//! Error types for the entity store.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors and the geometry rejections shared by every backend.

use geofleet_types::GeometryError;

/// Errors that can occur in the entity store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record was rejected because of out-of-range geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value could not be mapped back onto a domain type.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether this error means the store itself is unreachable, as
    /// opposed to a single record being rejected.
    ///
    /// The simulator skips the whole tick for unavailability and only the
    /// affected record for everything else.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Postgres(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(DbError::Postgres(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(DbError::Postgres(sqlx::Error::PoolClosed).is_unavailable());
        assert!(DbError::Unavailable(String::from("down")).is_unavailable());
    }

    #[test]
    fn record_errors_are_not_unavailable() {
        assert!(!DbError::NotFound(String::from("vehicle")).is_unavailable());
        assert!(!DbError::Postgres(sqlx::Error::RowNotFound).is_unavailable());
        let geo = DbError::from(GeometryError::NonPositiveRadius { value: 0.0 });
        assert!(!geo.is_unavailable());
    }
}
