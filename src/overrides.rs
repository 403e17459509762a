use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::info;

/// An unordered pair of comment URLs. `(a, b)` and `(b, a)` are the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuppressionPair {
    low: String,
    high: String,
}

impl SuppressionPair {
    pub fn new(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.to_string(),
            high: high.to_string(),
        }
    }
}

/// Point-in-time copy of the suppression set, read by the grouping engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suppressions {
    pairs: HashSet<SuppressionPair>,
}

impl Suppressions {
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(a, b)| SuppressionPair::new(a, b))
                .collect(),
        }
    }

    /// True if the edge between `a` and `b` is suppressed, in either orientation.
    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&SuppressionPair::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Append-only store of operator-issued suppressions.
pub trait SuppressionStore: Send + Sync {
    /// Record a suppression. Returns `true` if the pair was not already present.
    fn suppress(&self, duplicate: &str, original: &str) -> bool;

    /// Consistent copy of every suppression recorded so far.
    fn snapshot(&self) -> Suppressions;
}

/// Process-lifetime suppression set. Clones share the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct SuppressionSet {
    inner: Arc<RwLock<HashSet<SuppressionPair>>>,
}

impl SuppressionSet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SuppressionStore for SuppressionSet {
    fn suppress(&self, duplicate: &str, original: &str) -> bool {
        let pair = SuppressionPair::new(duplicate, original);
        // A poisoned lock still holds a valid set: writers only ever insert.
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let added = guard.insert(pair);
        if added {
            info!(duplicate, original, "suppressed duplicate relationship");
        }
        added
    }

    fn snapshot(&self) -> Suppressions {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Suppressions {
            pairs: guard.clone(),
        }
    }
}
