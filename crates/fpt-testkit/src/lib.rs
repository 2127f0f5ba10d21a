//! fpt-testkit
//!
//! In-memory store and fixtures for exercising the reconciliation engine
//! without Postgres. Cross-crate scenarios live under `tests/`.

pub mod fixtures;
mod memory;

pub use memory::MemoryStore;
