use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::assignment::set_owner;
use crate::cache::ResultCache;
use crate::error::{Error, Result};
use crate::overrides::SuppressionStore;
use crate::reconcile::{Report, Snapshot, reconcile};
use crate::sources::{ReviewSource, ReviewThread, ThreadKey};
use crate::store::Store;

/// Fetches, caches and reconciles reviews. Cheap to share behind an `Arc`;
/// every pass reads the suppression set and stores as they are at that
/// moment.
pub struct ReviewService {
    source: Arc<dyn ReviewSource>,
    suppressions: Arc<dyn SuppressionStore>,
    cache: ResultCache<Vec<ReviewThread>>,
    store: Store,
    preview_chars: usize,
    // Serializes load-modify-save of the assignments file.
    assign_lock: Mutex<()>,
}

impl ReviewService {
    pub fn new(
        source: Arc<dyn ReviewSource>,
        suppressions: Arc<dyn SuppressionStore>,
        store: Store,
        cache_ttl: Duration,
        preview_chars: usize,
    ) -> Self {
        Self {
            source,
            suppressions,
            cache: ResultCache::new(cache_ttl),
            store,
            preview_chars,
            assign_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn suppress(&self, duplicate: &str, original: &str) -> bool {
        self.suppressions.suppress(duplicate, original)
    }

    /// Threads for `key`, from the cache when fresh. A failed fetch falls
    /// back to whatever was cached last; without one the error propagates.
    fn threads(&self, key: &ThreadKey, force: bool) -> Result<Vec<ReviewThread>> {
        if !force && let Some(threads) = self.cache.fresh(key) {
            return Ok(threads);
        }

        debug!(key = %key, force, "fetching review threads");
        match self.source.fetch_threads(key) {
            Ok(threads) => {
                self.cache.store(key, threads.clone());
                Ok(threads)
            }
            Err(e) => match self.cache.any(key) {
                Some(stale) => {
                    let rate_limited = matches!(e, Error::RateLimited(_));
                    warn!(key = %key, error = %e, rate_limited, "fetch failed, serving stale data");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    fn snapshot(&self, key: &ThreadKey, force: bool) -> Result<(Snapshot, Vec<String>)> {
        let threads = self.threads(key, force)?;
        let roster = self.store.load_roster(key);
        Ok((Snapshot::from_threads(key, &threads, &roster), roster))
    }

    /// One reconciliation pass over `key`.
    pub fn report(&self, key: &ThreadKey, force: bool) -> Result<Report> {
        let (snapshot, roster) = self.snapshot(key, force)?;
        let suppressions = self.suppressions.snapshot();
        let assignments = self.store.load_assignments();
        let report = reconcile(
            key,
            &snapshot,
            &suppressions,
            &assignments,
            &roster,
            self.preview_chars,
        );
        info!(
            key = %key,
            comments = report.rows.len(),
            findings = report.findings.len(),
            "report ready"
        );
        Ok(report)
    }

    /// Run [`ReviewService::report`] for every key in parallel. Results come
    /// back in the order of `keys`, one per key, so a failing review never
    /// hides the others.
    pub async fn report_all(
        self: &Arc<Self>,
        keys: &[ThreadKey],
        force: bool,
    ) -> Vec<(ThreadKey, Result<Report>)> {
        let mut join_set = tokio::task::JoinSet::new();
        for (index, key) in keys.iter().enumerate() {
            let service = Arc::clone(self);
            let key = key.clone();
            join_set.spawn_blocking(move || {
                let result = service.report(&key, force);
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Report>>> = keys.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "report task panicked"),
            }
        }

        keys.iter()
            .cloned()
            .zip(slots)
            .map(|(key, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(Error::Task(format!("report task for {key} did not complete")))
                });
                (key, result)
            })
            .collect()
    }

    /// Assign `owner` to `url` and every other member of its finding.
    /// Returns the URLs whose stored owner changed.
    pub fn set_owner(&self, key: &ThreadKey, url: &str, owner: &str) -> Result<Vec<String>> {
        let (snapshot, _) = self.snapshot(key, false)?;
        let grouping = snapshot.group(&self.suppressions.snapshot());

        let _guard = self.assign_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut assignments = self.store.load_assignments();
        let updated = set_owner(&mut assignments, &grouping, url, owner);
        self.store.save_assignments(&assignments)?;

        info!(key = %key, url, owner, updated = updated.len(), "owner assigned");
        Ok(updated)
    }
}

/// Aggregate error for a batch in which some reviews failed, if any did.
pub fn failure_summary(total: usize, failures: &[ThreadKey]) -> Option<Error> {
    failures.first().map(|first| Error::ReportsFailed {
        failed: failures.len(),
        total,
        first: first.to_string(),
    })
}
