use std::collections::HashSet;

use tally_core::{Fingerprint, Fingerprinted};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome<T> {
    pub unique: Vec<T>,
    pub duplicate_count: usize,
}

/// Exact-match duplicate filter keyed on (date, description, amount).
///
/// By default each candidate is checked only against the known set, so two
/// identical rows in one upload both survive. `within_batch` also collapses
/// those, keeping the first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateDetector {
    pub within_batch: bool,
}

impl DuplicateDetector {
    pub fn new(within_batch: bool) -> Self {
        Self { within_batch }
    }

    pub fn deduplicate<T, K>(&self, candidates: Vec<T>, known: &[K]) -> DedupOutcome<T>
    where
        T: Fingerprinted,
        K: Fingerprinted,
    {
        let mut seen: HashSet<Fingerprint> = known.iter().map(|k| k.fingerprint()).collect();
        let mut unique = Vec::with_capacity(candidates.len());
        let mut duplicate_count = 0;

        for candidate in candidates {
            let key = candidate.fingerprint();
            if seen.contains(&key) {
                debug!(
                    date = %key.date,
                    description = %key.description,
                    amount = %key.amount,
                    "Skipping duplicate transaction"
                );
                duplicate_count += 1;
                continue;
            }
            if self.within_batch {
                seen.insert(key);
            }
            unique.push(candidate);
        }

        DedupOutcome {
            unique,
            duplicate_count,
        }
    }
}

pub fn deduplicate<T, K>(candidates: Vec<T>, known: &[K]) -> DedupOutcome<T>
where
    T: Fingerprinted,
    K: Fingerprinted,
{
    DuplicateDetector::default().deduplicate(candidates, known)
}
