//! Storage layer for the catalog graph.
//!
//! This module provides a sled-based property graph store: records keyed by
//! id, an ordered type index, outgoing/incoming edge trees, and per-slot
//! target manifests, all kept in sync by transactions.

mod config;
mod engine;

pub mod key;

pub use config::StorageConfig;
pub use engine::CatalogStore;
pub use key::{EdgeKey, SlotKey, TypeIndexKey};
