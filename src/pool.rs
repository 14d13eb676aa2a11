// 🗃️ Candidate pool - consumption tracking for one date partition
//
// Financial entries live in an arena; a parallel liveness flag marks which
// are still available. Consumed entries never come back within a run.

use crate::normalizer::FinancialEntry;

#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    entries: Vec<FinancialEntry>,
    live: Vec<bool>,
    live_count: usize,
}

impl CandidatePool {
    pub fn new(entries: Vec<FinancialEntry>) -> Self {
        let live = vec![true; entries.len()];
        let live_count = entries.len();
        CandidatePool {
            entries,
            live,
            live_count,
        }
    }

    pub fn get(&self, index: usize) -> &FinancialEntry {
        &self.entries[index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Arena indices still available, in insertion order
    pub fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter_map(|(i, &alive)| alive.then_some(i))
    }

    /// Mark entries as used by an accepted match
    ///
    /// Indices already consumed are ignored; returns how many were newly consumed.
    pub fn consume(&mut self, indices: &[usize]) -> usize {
        let mut consumed = 0;
        for &i in indices {
            if let Some(alive) = self.live.get_mut(i) {
                if *alive {
                    *alive = false;
                    consumed += 1;
                }
            }
        }
        self.live_count -= consumed;
        consumed
    }
}
