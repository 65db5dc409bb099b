//! Hypergeometric kernel for opening-hand draw odds.
//!
//! Everything here operates on a bounded integer domain (60-card deck,
//! 7-card hand, 1-8 copies), so binomial coefficients are exact `u64`
//! values from a Pascal triangle built once per process.

use std::sync::OnceLock;

/// Population size the serve-time probabilities assume.
pub const DECK_SIZE: usize = 60;
/// Opening-hand sample size.
pub const HAND_SIZE: usize = 7;

/// Largest `n` the binomial table covers.
const MAX_N: usize = DECK_SIZE;

static BINOMIALS: OnceLock<Vec<Vec<u64>>> = OnceLock::new();

fn binomial_table() -> &'static Vec<Vec<u64>> {
    BINOMIALS.get_or_init(|| {
        let mut rows: Vec<Vec<u64>> = Vec::with_capacity(MAX_N + 1);
        for n in 0..=MAX_N {
            let mut row = vec![1u64; n + 1];
            for k in 1..n {
                row[k] = rows[n - 1][k - 1] + rows[n - 1][k];
            }
            rows.push(row);
        }
        rows
    })
}

/// Exact binomial coefficient C(n, k); zero outside the table's domain.
pub fn binomial(n: usize, k: usize) -> u64 {
    if n > MAX_N || k > n {
        return 0;
    }
    binomial_table()[n][k]
}

/// Tail probability of drawing at least `min_successes` successes when
/// drawing `draws` cards without replacement from `population` cards
/// containing `successes` successes.
pub fn hypergeometric_tail(
    draws: usize,
    population: usize,
    min_successes: usize,
    successes: usize,
) -> f64 {
    if min_successes == 0 {
        return 1.0;
    }
    if draws > population || successes < min_successes || min_successes > draws {
        return 0.0;
    }

    let denominator = binomial(population, draws);
    if denominator == 0 {
        return 0.0;
    }

    let upper = successes.min(draws);
    let mut mass = 0.0;
    for hits in min_successes..=upper {
        let ways = binomial(successes, hits) * binomial(population - successes, draws - hits);
        mass += ways as f64 / denominator as f64;
    }
    mass
}

/// P(at least one of `copies` copies appears in the opening hand).
pub fn opening_draw(copies: u8) -> f64 {
    hypergeometric_tail(HAND_SIZE, DECK_SIZE, 1, copies as usize)
}

/// Joint probability of seeing both cards of a bigram in the opening
/// hand, by inclusion-exclusion over the merged copy pools.
pub fn joint_probability(k1: u8, k2: u8) -> f64 {
    let p1 = opening_draw(k1);
    let p2 = opening_draw(k2);
    let p_either = opening_draw(k1 + k2);
    p1 + p2 - p_either
}

/// Upper bound used to normalize a bigram's joint probability.
///
/// k_max never drops below a playset, so the normalizer cannot shrink
/// as copy counts grow.
pub fn max_joint_probability(k1: u8, k2: u8) -> f64 {
    let k_max = 4.max((k1 + k2 + 1) / 2);
    let p_max = opening_draw(k_max);
    1.0 - (1.0 - p_max) * (1.0 - p_max)
}

/// Joint probability normalized into [0, 1] by the bigram's own ceiling.
pub fn normalized_joint(k1: u8, k2: u8) -> f64 {
    let ceiling = max_joint_probability(k1, k2);
    if ceiling <= 0.0 {
        return 0.0;
    }
    (joint_probability(k1, k2) / ceiling).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial_exact_values() {
        assert_eq!(binomial(60, 7), 386_206_920);
        assert_eq!(binomial(60, 0), 1);
        assert_eq!(binomial(60, 60), 1);
        assert_eq!(binomial(7, 9), 0);
        assert_eq!(binomial(61, 1), 0);
    }

    #[test]
    fn test_binomial_symmetry() {
        for k in 0..=60 {
            assert_eq!(binomial(60, k), binomial(60, 60 - k));
        }
    }

    #[test]
    fn test_tail_boundary_values() {
        assert_eq!(hypergeometric_tail(7, 60, 1, 0), 0.0);
        assert_eq!(hypergeometric_tail(7, 60, 1, 60), 1.0);
        assert_eq!(hypergeometric_tail(7, 60, 0, 0), 1.0);
        assert_eq!(hypergeometric_tail(7, 60, 8, 8), 0.0);
    }

    #[test]
    fn test_playset_opening_draw_odds() {
        let p = hypergeometric_tail(7, 60, 1, 4);
        assert!(p > 0.39 && p < 0.41, "got {p}");
    }

    #[test]
    fn test_opening_draw_monotone_in_copies() {
        for copies in 1..8u8 {
            assert!(opening_draw(copies + 1) > opening_draw(copies));
        }
    }

    #[test]
    fn test_joint_probability_is_both_cards() {
        // P(both) must sit below either marginal.
        let joint = joint_probability(4, 4);
        assert!(joint > 0.0);
        assert!(joint < opening_draw(4));
    }

    #[test]
    fn test_normalized_joint_in_unit_interval() {
        for k1 in 1..=4u8 {
            for k2 in 1..=4u8 {
                let q = normalized_joint(k1, k2);
                assert!(q > 0.0 && q <= 1.0, "q({k1},{k2}) = {q}");
            }
        }
    }

    #[test]
    fn test_normalized_joint_monotone_in_copies() {
        // More copies of either card always helps within the 1..=4 domain.
        assert!(normalized_joint(4, 4) > normalized_joint(4, 1));
        assert!(normalized_joint(4, 1) > normalized_joint(1, 1));
    }
}
