//! Deck input handling and bigram extraction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An unordered pair of distinct card names.
///
/// The constructor sorts its arguments, so `(a, b)` and `(b, a)` compare,
/// hash, and serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bigram {
    pub card1: String,
    pub card2: String,
}

impl Bigram {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { card1: a, card2: b }
        } else {
            Self { card1: b, card2: a }
        }
    }
}

/// A submitted deck, deduplicated to its distinct card names.
///
/// Input order and quantities carry no signal for scoring, so the deck is
/// just a sorted set.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: BTreeSet<String>,
}

impl Deck {
    /// Minimum distinct cards a deck must contain to form a bigram.
    pub const MIN_CARDS: usize = 2;

    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            cards: names.into_iter().collect(),
        }
    }

    /// Number of distinct cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: &str) -> bool {
        self.cards.contains(card)
    }

    /// Every unordered pair of distinct cards, in canonical form.
    pub fn bigrams(&self) -> Vec<Bigram> {
        let cards: Vec<&String> = self.cards.iter().collect();
        let mut pairs = Vec::with_capacity(cards.len() * cards.len().saturating_sub(1) / 2);
        for i in 0..cards.len() {
            for j in (i + 1)..cards.len() {
                pairs.push(Bigram::new(cards[i].clone(), cards[j].clone()));
            }
        }
        pairs
    }
}
