#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use revtally::error::{Error, Result};
use revtally::overrides::SuppressionSet;
use revtally::service::ReviewService;
use revtally::sources::{Reaction, ReactionKind, ReviewSource, ReviewThread, ThreadComment, ThreadKey};
use revtally::store::Store;

/// In-memory source. Fetches can be switched to fail, and every call is counted.
#[derive(Default)]
pub struct MockSource {
    threads: Mutex<HashMap<ThreadKey, Vec<ReviewThread>>>,
    failing: AtomicBool,
    rate_limited: AtomicBool,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn set_threads(&self, key: &ThreadKey, threads: Vec<ReviewThread>) {
        self.threads.lock().unwrap().insert(key.clone(), threads);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_rate_limited(&self, limited: bool) {
        self.rate_limited.store(limited, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReviewSource for MockSource {
    fn fetch_threads(&self, key: &ThreadKey) -> Result<Vec<ReviewThread>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(Error::RateLimited("API rate limit exceeded".to_string()));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Source(format!("upstream unavailable for {key}")));
        }
        self.threads
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Source(format!("pull request not found: {key}")))
    }
}

pub fn key(n: u64) -> ThreadKey {
    ThreadKey::new("acme", "vault", n)
}

pub fn url(key: &ThreadKey, id: u32) -> String {
    format!("{}#discussion_r{id}", key.pull_url())
}

pub fn comment(url: &str, author: &str, body: &str) -> ThreadComment {
    ThreadComment {
        id: format!("id-{url}"),
        url: url.to_string(),
        body: body.to_string(),
        author: author.to_string(),
        reactions: vec![],
    }
}

pub fn thread(url: &str, author: &str, body: &str) -> ReviewThread {
    ReviewThread {
        resolved: false,
        comments: vec![comment(url, author, body)],
    }
}

pub fn with_reaction(mut thread: ReviewThread, user: &str, kind: ReactionKind) -> ReviewThread {
    thread.comments[0].reactions.push(Reaction {
        kind,
        user: user.to_string(),
    });
    thread
}

/// Three threads: bob's original, alice's duplicate of it, carol's unrelated note.
pub fn sample_threads(key: &ThreadKey) -> Vec<ReviewThread> {
    vec![
        thread(&url(key, 2), "bob", "Unchecked length before copy"),
        thread(&url(key, 1), "alice", &format!("dup of {}", url(key, 2))),
        thread(&url(key, 3), "carol", "Typo in error message"),
    ]
}

pub fn service(source: Arc<MockSource>, data_dir: &std::path::Path, ttl: Duration) -> Arc<ReviewService> {
    Arc::new(ReviewService::new(
        source,
        Arc::new(SuppressionSet::new()),
        Store::new(data_dir),
        ttl,
        300,
    ))
}
