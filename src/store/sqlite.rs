//! SQLite bigram store.
//!
//! The serving query only ever filters by format and card pair, so the
//! table carries a dedicated `(format, card1, card2)` index and the
//! lookup narrows by the deck's card set before post-filtering to the
//! exact candidate bigrams.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::task;

use super::{BigramRecord, BigramStore, Lookup, LookupMeta, StoreSnapshot};
use crate::deck::Bigram;

#[derive(Clone)]
pub struct SqliteBigramStore {
    db_path: PathBuf,
}

impl SqliteBigramStore {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let path_clone = path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone)?;

            conn.execute(
                r#"
                CREATE TABLE IF NOT EXISTS bigrams (
                    format TEXT NOT NULL,
                    archetype TEXT NOT NULL,
                    card1 TEXT NOT NULL,
                    card2 TEXT NOT NULL,
                    k1 INTEGER NOT NULL,
                    k2 INTEGER NOT NULL,
                    PRIMARY KEY (format, archetype, card1, card2)
                );
                "#,
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_bigrams_pair ON bigrams(format, card1, card2);",
                [],
            )?;

            Ok::<_, anyhow::Error>(())
        })
        .await??;

        Ok(Self { db_path: path })
    }

    /// Replaces or inserts every record of a pipeline snapshot.
    pub async fn seed_snapshot(&self, snapshot: StoreSnapshot) -> Result<u64> {
        snapshot.validate()?;
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            let tx = conn.transaction()?;
            let mut written = 0u64;

            for (format, records) in &snapshot.formats {
                for record in records {
                    tx.execute(
                        "INSERT OR REPLACE INTO bigrams (format, archetype, card1, card2, k1, k2)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            format,
                            &record.archetype,
                            &record.card1,
                            &record.card2,
                            record.k1,
                            record.k2
                        ],
                    )?;
                    written += 1;
                }
            }

            tx.commit()?;
            Ok::<_, anyhow::Error>(written)
        })
        .await?
    }
}

#[async_trait]
impl BigramStore for SqliteBigramStore {
    fn database(&self) -> &str {
        "sqlite"
    }

    fn backend(&self) -> String {
        self.db_path.display().to_string()
    }

    async fn lookup(&self, format: &str, bigrams: &[Bigram]) -> Result<Lookup> {
        if bigrams.is_empty() {
            return Ok(Lookup::default());
        }

        // Both cards of every candidate bigram come from the deck, so
        // narrowing each card column to the deck's card set covers the
        // candidate set with O(|deck|) bound parameters.
        let mut cards: Vec<&str> = bigrams
            .iter()
            .flat_map(|b| [b.card1.as_str(), b.card2.as_str()])
            .collect();
        cards.sort_unstable();
        cards.dedup();

        let wanted: HashSet<Bigram> = bigrams.iter().cloned().collect();
        let format = format.to_string();
        let owned_cards: Vec<String> = cards.into_iter().map(String::from).collect();
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let started = Instant::now();
            let conn = Connection::open(&path)?;

            let placeholders = vec!["?"; owned_cards.len()].join(", ");
            let sql = format!(
                "SELECT archetype, card1, card2, k1, k2 FROM bigrams
                 WHERE format = ? AND card1 IN ({placeholders}) AND card2 IN ({placeholders})"
            );

            let mut values: Vec<&str> = Vec::with_capacity(1 + owned_cards.len() * 2);
            values.push(format.as_str());
            values.extend(owned_cards.iter().map(String::as_str));
            values.extend(owned_cards.iter().map(String::as_str));

            let mut stmt = conn.prepare(&sql)?;
            let mut read_count = 0u64;
            let mut rows = Vec::new();

            let fetched = stmt.query_map(rusqlite::params_from_iter(values), |row| {
                Ok(BigramRecord {
                    archetype: row.get(0)?,
                    card1: row.get(1)?,
                    card2: row.get(2)?,
                    k1: row.get(3)?,
                    k2: row.get(4)?,
                })
            })?;

            for record in fetched {
                let record = record?;
                read_count += 1;
                record.validate()?;
                if wanted.contains(&record.bigram()) {
                    rows.push(record);
                }
            }

            let meta = LookupMeta {
                read_count,
                exec_ms: started.elapsed().as_secs_f64() * 1_000.0,
            };
            Ok::<_, anyhow::Error>(Lookup { rows, meta })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

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
                record("Burn", "Goblin Guide", "Lava Spike", 4, 4),
                record("Prowess", "Lava Spike", "Lightning Bolt", 2, 4),
            ],
        );
        snapshot.formats.insert(
            "legacy".to_string(),
            vec![record("Delver", "Brainstorm", "Ponder", 4, 2)],
        );
        snapshot
    }

    #[tokio::test]
    async fn test_seed_and_lookup() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteBigramStore::new(temp_file.path()).await?;
        assert_eq!(store.seed_snapshot(snapshot()).await?, 4);

        let wanted = [Bigram::new("Lightning Bolt", "Lava Spike")];
        let lookup = store.lookup("modern", &wanted).await?;

        assert_eq!(lookup.rows.len(), 2);
        assert!(lookup.rows.iter().all(|r| r.bigram() == wanted[0]));
        assert!(lookup.meta.read_count >= 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_scoped_to_format() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteBigramStore::new(temp_file.path()).await?;
        store.seed_snapshot(snapshot()).await?;

        let wanted = [Bigram::new("Brainstorm", "Ponder")];
        assert!(store.lookup("modern", &wanted).await?.rows.is_empty());
        assert_eq!(store.lookup("legacy", &wanted).await?.rows.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_card_overlap_does_not_leak_unrequested_pairs() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteBigramStore::new(temp_file.path()).await?;
        store.seed_snapshot(snapshot()).await?;

        // All three cards appear in the IN lists, but only the requested
        // pair may come back.
        let wanted = [
            Bigram::new("Goblin Guide", "Lightning Bolt"),
            Bigram::new("Goblin Guide", "Lava Spike"),
        ];
        let lookup = store.lookup("modern", &wanted).await?;
        assert_eq!(lookup.rows.len(), 1);
        assert_eq!(lookup.rows[0].bigram(), wanted[1]);
        Ok(())
    }

    #[tokio::test]
    async fn test_reseeding_is_idempotent() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteBigramStore::new(temp_file.path()).await?;
        store.seed_snapshot(snapshot()).await?;
        store.seed_snapshot(snapshot()).await?;

        let wanted = [Bigram::new("Lava Spike", "Lightning Bolt")];
        let lookup = store.lookup("modern", &wanted).await?;
        assert_eq!(lookup.rows.len(), 2);
        Ok(())
    }
}
