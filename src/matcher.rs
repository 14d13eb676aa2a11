// 🎯 Subset-Sum Matcher
// Finds live financial entries that sum to a bank amount within tolerance
//
// Search per bank entry:
//   1. Candidates = live entries with |amount| <= |target| + tolerance
//   2. Sort candidates by amount, descending
//   3. For r = 1..=min(n, max_combination_size):
//        skip r when target lies outside [sum of smallest r, sum of largest r]
//        otherwise enumerate r-combinations in lexicographic order
//   4. Stop after iter_limit combinations examined (reported as gave up)

use crate::config::MatchConfig;
use crate::pool::CandidatePool;
use serde::{Deserialize, Serialize};

/// Result of one bank entry's search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchOutcome {
    /// Arena indices of the accepted subset, in candidate order
    Found {
        indices: Vec<usize>,
        sum: f64,
        iterations: u64,
    },

    /// Every admissible combination was examined, none fit
    Exhausted { iterations: u64 },

    /// Combination budget ran out before the search finished
    BudgetExceeded { iterations: u64 },
}

impl SearchOutcome {
    pub fn iterations(&self) -> u64 {
        match self {
            SearchOutcome::Found { iterations, .. }
            | SearchOutcome::Exhausted { iterations }
            | SearchOutcome::BudgetExceeded { iterations } => *iterations,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsetSumMatcher {
    pub tolerance: f64,
    pub max_combination_size: usize,
    pub iter_limit: u64,
}

impl SubsetSumMatcher {
    pub fn new(tolerance: f64, max_combination_size: usize, iter_limit: u64) -> Self {
        SubsetSumMatcher {
            tolerance,
            max_combination_size,
            iter_limit,
        }
    }

    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(config.tolerance, config.max_combination_size, config.iter_limit)
    }

    /// Live candidates that could take part in a subset, sorted descending
    fn candidates(&self, pool: &CandidatePool, target: f64) -> Vec<(usize, f64)> {
        let limit = target.abs() + self.tolerance;
        let mut candidates: Vec<(usize, f64)> = pool
            .live_indices()
            .map(|i| (i, pool.get(i).amount))
            .filter(|(_, amount)| amount.abs() <= limit)
            .collect();

        // Stable: equal amounts keep pool order
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates
    }

    /// Search the pool for a subset summing to `target`
    ///
    /// Does not mutate the pool; the caller consumes the returned indices.
    pub fn search(&self, pool: &CandidatePool, target: f64) -> SearchOutcome {
        let candidates = self.candidates(pool, target);
        let amounts: Vec<f64> = candidates.iter().map(|(_, a)| *a).collect();
        let n = amounts.len();
        let max_r = n.min(self.max_combination_size);

        let mut iterations: u64 = 0;

        for r in 1..=max_r {
            // Largest reachable sum uses the first r, smallest the last r
            let top: f64 = amounts[..r].iter().sum();
            let bottom: f64 = amounts[n - r..].iter().sum();
            if target > top + self.tolerance || target < bottom - self.tolerance {
                continue;
            }

            let mut combo: Vec<usize> = (0..r).collect();
            loop {
                if iterations >= self.iter_limit {
                    return SearchOutcome::BudgetExceeded { iterations };
                }
                iterations += 1;

                let sum: f64 = combo.iter().map(|&i| amounts[i]).sum();
                if (sum - target).abs() <= self.tolerance {
                    return SearchOutcome::Found {
                        indices: combo.iter().map(|&i| candidates[i].0).collect(),
                        sum,
                        iterations,
                    };
                }

                if !next_combination(&mut combo, n) {
                    break;
                }
            }
        }

        SearchOutcome::Exhausted { iterations }
    }
}

impl Default for SubsetSumMatcher {
    fn default() -> Self {
        Self::from_config(&MatchConfig::default())
    }
}

/// Advance `combo` to the next r-combination of 0..n in lexicographic order
///
/// Returns false when `combo` was the last one.
fn next_combination(combo: &mut [usize], n: usize) -> bool {
    let r = combo.len();
    let mut i = r;
    while i > 0 {
        i -= 1;
        if combo[i] < n - r + i {
            combo[i] += 1;
            for j in i + 1..r {
                combo[j] = combo[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

// ============================================================================
// TESTS
// ============================================================================
