//! Bigram store interface and backends.
//!
//! The store is read-only at serve time; an offline pipeline rebuilds it
//! periodically and hands over a [`StoreSnapshot`]. The engine only ever
//! issues one query shape: all records for a format whose bigram lies in
//! the candidate set extracted from the submitted deck.

pub mod http;
pub mod memory;
pub mod sqlite;

pub use http::HttpBigramStore;
pub use memory::MemoryBigramStore;
pub use sqlite::SqliteBigramStore;

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::deck::Bigram;

/// Copy counts a legal decklist allows for a single card.
pub const MIN_COPIES: u8 = 1;
pub const MAX_COPIES: u8 = 4;

/// One stored record: an archetype's copy counts for a card pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigramRecord {
    pub archetype: String,
    pub card1: String,
    pub card2: String,
    pub k1: u8,
    pub k2: u8,
}

impl BigramRecord {
    pub fn bigram(&self) -> Bigram {
        Bigram::new(self.card1.clone(), self.card2.clone())
    }

    /// Rejects copy counts the build pipeline can never emit.
    pub fn validate(&self) -> Result<()> {
        for k in [self.k1, self.k2] {
            if !(MIN_COPIES..=MAX_COPIES).contains(&k) {
                bail!(
                    "schema mismatch: copy count {} out of range for ({}, {}, {})",
                    k,
                    self.archetype,
                    self.card1,
                    self.card2
                );
            }
        }
        Ok(())
    }
}

/// Query metadata the store reports alongside its rows.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LookupMeta {
    /// Rows the backend scanned to answer the query.
    pub read_count: u64,
    /// Query wall time in milliseconds.
    pub exec_ms: f64,
}

/// Result of a store lookup.
#[derive(Debug, Default)]
pub struct Lookup {
    pub rows: Vec<BigramRecord>,
    pub meta: LookupMeta,
}

/// Read interface every bigram store backend provides.
#[async_trait]
pub trait BigramStore: Send + Sync {
    /// Name of the database product, for response metadata.
    fn database(&self) -> &str;

    /// Identifier of the concrete backend instance.
    fn backend(&self) -> String;

    /// All records for `format` whose bigram lies in `bigrams`.
    ///
    /// Row order is unspecified; the engine groups internally. Cost must
    /// scale with the candidate set, not the archetype corpus.
    async fn lookup(&self, format: &str, bigrams: &[Bigram]) -> Result<Lookup>;
}

/// Output schema of the offline build pipeline: per format, the full
/// list of (archetype, bigram) records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub formats: BTreeMap<String, Vec<BigramRecord>>,
}

impl StoreSnapshot {
    /// Validates every record's copy counts; a violation is fatal.
    pub fn validate(&self) -> Result<()> {
        for records in self.formats.values() {
            for record in records {
                record.validate()?;
            }
        }
        Ok(())
    }
}
