//! Two-pass archetype similarity scoring.
//!
//! Pass 1 accumulates globally weighted joint probabilities and picks the
//! candidate set: every archetype within a fixed margin of the leader.
//! Pass 2 re-weights with cohorts restricted to the candidates, rewarding
//! bigrams distinctive within the race and penalizing lookalikes outside
//! it. Scores are normalized by the sum of each matched bigram's best
//! probability, clamped into [0, 1], and floored.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::deck::Bigram;
use crate::hypergeom;
use crate::store::BigramRecord;

/// Scores at or below this threshold are dropped from results.
pub const SCORE_FLOOR: f64 = 0.05;

/// How far behind the pass-1 leader an archetype may sit and still enter
/// the local-weight pass.
const CANDIDATE_MARGIN: f64 = 2.0;

/// Per-archetype weight totals from the two passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tally {
    pub global: f64,
    pub local: f64,
}

/// Intermediate state of a scoring run, exposed so tests can assert on
/// the candidate cutoff and normalizer directly.
#[derive(Debug, Default)]
pub struct Breakdown {
    pub tallies: BTreeMap<String, Tally>,
    pub candidates: BTreeSet<String>,
    pub normalizer: f64,
}

/// Runs both passes over the store rows and returns the raw tallies.
///
/// BTreeMaps keep the accumulation order independent of row order, so
/// permuted inputs produce bit-identical sums.
pub fn analyze(rows: &[BigramRecord]) -> Breakdown {
    let mut cohorts: BTreeMap<Bigram, Vec<(&str, f64)>> = BTreeMap::new();
    for row in rows {
        cohorts
            .entry(row.bigram())
            .or_default()
            .push((row.archetype.as_str(), hypergeom::normalized_joint(row.k1, row.k2)));
    }

    // Pass 1: global weights. A bigram held by exactly one matched
    // archetype counts double for it.
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for members in cohorts.values() {
        let weight = if members.len() == 1 { 2.0 } else { 1.0 };
        for (archetype, prob) in members {
            tallies.entry((*archetype).to_string()).or_default().global += weight * prob;
        }
    }
    if tallies.is_empty() {
        return Breakdown::default();
    }

    let leader = tallies.values().map(|t| t.global).fold(0.0, f64::max);
    let candidates: BTreeSet<String> = tallies
        .iter()
        .filter(|(_, tally)| tally.global >= leader - CANDIDATE_MARGIN)
        .map(|(name, _)| name.clone())
        .collect();

    // Pass 2: local weights over cohorts restricted to the candidates.
    // Bigrams no candidate holds contribute nothing here.
    for members in cohorts.values() {
        let in_race = members
            .iter()
            .filter(|(archetype, _)| candidates.contains(*archetype))
            .count();
        if in_race == 0 {
            continue;
        }

        for (archetype, prob) in members {
            let weight = if candidates.contains(*archetype) {
                if in_race == 1 {
                    2.0
                } else if in_race < candidates.len() / 3 {
                    1.0
                } else {
                    0.0
                }
            } else {
                -1.0
            };
            if let Some(tally) = tallies.get_mut(*archetype) {
                tally.local += weight * prob;
            }
        }
    }

    // Best achievable mass over the matched bigrams; the denominator of
    // every final score.
    let normalizer = cohorts
        .values()
        .map(|members| members.iter().map(|(_, prob)| *prob).fold(0.0, f64::max))
        .sum();

    Breakdown {
        tallies,
        candidates,
        normalizer,
    }
}

/// Final ranking: normalized, clamped scores above the floor, ordered by
/// score descending with ties broken by name.
pub fn rank(rows: &[BigramRecord]) -> Vec<(String, f64)> {
    let breakdown = analyze(rows);
    if breakdown.normalizer <= 0.0 {
        return Vec::new();
    }

    let mut ranked: Vec<(String, f64)> = breakdown
        .tallies
        .into_iter()
        .map(|(name, tally)| {
            let raw = (tally.global + tally.local) / breakdown.normalizer;
            (name, raw.clamp(0.0, 1.0))
        })
        .filter(|(_, score)| *score > SCORE_FLOOR)
        .collect();

    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}
