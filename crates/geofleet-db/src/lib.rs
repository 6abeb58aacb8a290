//! Entity store for the Geofleet simulator.
//!
//! The store is the durable record of vehicles, geofences, and alerts and
//! the only path through which any of them is mutated. The simulation
//! core is written against the [`EntityStore`] trait; this crate provides
//! two backends and a runtime selector.
//!
//! ```text
//! PositionSimulator --(positions)--+
//!                                  +--> EntityStore --> PostgresStore (PostgresPool)
//! AlertEmitter ------(alerts)------+                \-> MemoryStore
//!                                  |
//! Observer API ------(reads)-------+
//! ```
//!
//! # Modules
//!
//! - [`store`] -- the [`EntityStore`] trait
//! - [`memory`] -- in-memory backend (tests, fallback)
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`pg_store`] -- `PostgreSQL` backend
//! - [`backend`] -- [`StoreBackend`], the runtime backend selector
//! - [`error`] -- Shared error types

pub mod backend;
pub mod error;
pub mod memory;
pub mod pg_store;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use backend::StoreBackend;
pub use error::DbError;
pub use memory::MemoryStore;
pub use pg_store::PostgresStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::EntityStore;
