//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and shutdown.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `run` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: geofleet_core::ConfigError,
    },

    /// The entity store could not be opened, migrated, or seeded.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: geofleet_db::DbError,
    },

    /// The observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: geofleet_observer::ServerError,
    },

    /// The scheduler task failed.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: geofleet_core::SchedulerError,
    },
}
