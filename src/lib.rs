//! Archetype Similarity Index (ASI) scoring service.
//!
//! Ranks the known archetypes of a card-game format by how strongly
//! their characteristic card-pair co-occurrences overlap with a
//! submitted decklist:
//! - Hypergeometric opening-hand odds per card pair
//! - Two-pass global/local weighting with candidate selection
//! - Pluggable bigram store (SQLite, in-memory snapshot, remote HTTP)
//! - JSON API with per-request store timing metadata

pub mod deck;
pub mod engine;
pub mod hypergeom;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use deck::{Bigram, Deck};
pub use server::{router, AppState};
pub use store::{BigramRecord, BigramStore, StoreSnapshot};
