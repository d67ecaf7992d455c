//! Storage implementations.
//!
//! [`MemoryStore`] backs tests and development; the Postgres store (behind
//! the `postgres` feature) is the production backend.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
