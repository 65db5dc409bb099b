//! In-memory bigram store backed by a snapshot file.
//!
//! Serves as the test double behind [`BigramStore`] and as a small
//! deployment mode where the snapshot fits in memory.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{BigramRecord, BigramStore, Lookup, LookupMeta, StoreSnapshot};
use crate::deck::Bigram;

type PairIndex = HashMap<Bigram, Vec<BigramRecord>>;

pub struct MemoryBigramStore {
    formats: HashMap<String, PairIndex>,
}

impl MemoryBigramStore {
    /// Builds the probe index from a snapshot. Fails on records that
    /// violate the copy-count schema.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        snapshot.validate()?;

        let mut formats: HashMap<String, PairIndex> = HashMap::new();
        for (format, records) in snapshot.formats {
            let index: &mut PairIndex = formats.entry(format).or_default();
            for record in records {
                index.entry(record.bigram()).or_default().push(record);
            }
        }
        Ok(Self { formats })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("snapshot {} does not match the store schema", path.display()))?;
        Self::from_snapshot(snapshot)
    }
}

#[async_trait]
impl BigramStore for MemoryBigramStore {
    fn database(&self) -> &str {
        "memory"
    }

    fn backend(&self) -> String {
        "in-process".to_string()
    }

    async fn lookup(&self, format: &str, bigrams: &[Bigram]) -> Result<Lookup> {
        let started = Instant::now();
        let mut rows = Vec::new();

        if let Some(index) = self.formats.get(format) {
            for bigram in bigrams {
                if let Some(records) = index.get(bigram) {
                    rows.extend(records.iter().cloned());
                }
            }
        }

        let meta = LookupMeta {
            read_count: rows.len() as u64,
            exec_ms: started.elapsed().as_secs_f64() * 1_000.0,
        };
        Ok(Lookup { rows, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(archetype: &str, a: &str, b: &str, k1: u8, k2: u8) -> BigramRecord {
        let pair = Bigram::new(a, b);
        BigramRecord {
            archetype: archetype.to_string(),
            card1: pair.card1,
            card2: pair.card2,
            k1,
            k2,
        }
    }

    fn snapshot() -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::default();
        snapshot.formats.insert(
            "modern".to_string(),
            vec![
                record("Burn", "Lava Spike", "Lightning Bolt", 4, 4),
                record("Burn", "Goblin Guide", "Lightning Bolt", 4, 4),
                record("Prowess", "Lava Spike", "Lightning Bolt", 2, 4),
            ],
        );
        snapshot
    }

    #[tokio::test]
    async fn test_lookup_restricted_to_candidates() -> Result<()> {
        let store = MemoryBigramStore::from_snapshot(snapshot())?;
        let wanted = [Bigram::new("Lava Spike", "Lightning Bolt")];

        let lookup = store.lookup("modern", &wanted).await?;
        assert_eq!(lookup.rows.len(), 2);
        assert!(lookup.rows.iter().all(|r| r.bigram() == wanted[0]));
        assert_eq!(lookup.meta.read_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_unknown_format_is_empty() -> Result<()> {
        let store = MemoryBigramStore::from_snapshot(snapshot())?;
        let wanted = [Bigram::new("Lava Spike", "Lightning Bolt")];

        let lookup = store.lookup("vintage", &wanted).await?;
        assert!(lookup.rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_snapshot_copy_count_schema_is_fatal() {
        let mut snapshot = StoreSnapshot::default();
        snapshot
            .formats
            .insert("modern".to_string(), vec![record("Burn", "a", "b", 0, 4)]);
        assert!(MemoryBigramStore::from_snapshot(snapshot).is_err());
    }
}
