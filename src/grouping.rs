use std::collections::HashMap;

use tracing::debug;

use crate::model::{Comment, DuplicateEdge};
use crate::overrides::Suppressions;

/// Index of a [`Finding`] in [`Grouping::findings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FindingId(pub usize);

/// Comments found to report the same underlying issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub id: FindingId,
    /// Primary first, then the remaining members by arrival order.
    pub members: Vec<String>,
}

impl Finding {
    pub fn primary(&self) -> &str {
        &self.members[0]
    }

    pub fn contains(&self, url: &str) -> bool {
        self.members.iter().any(|m| m == url)
    }

    /// 1-based position of `url` within the finding.
    pub fn position(&self, url: &str) -> Option<usize> {
        self.members.iter().position(|m| m == url).map(|i| i + 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    pub membership: HashMap<String, FindingId>,
    /// Ordered by the arrival index of each finding's primary.
    pub findings: Vec<Finding>,
}

impl Grouping {
    pub fn finding_of(&self, url: &str) -> Option<&Finding> {
        self.membership.get(url).map(|id| &self.findings[id.0])
    }

    pub fn is_standalone(&self, url: &str) -> bool {
        !self.membership.contains_key(url)
    }

    /// True for members of a finding other than its primary.
    pub fn is_secondary(&self, url: &str) -> bool {
        self.finding_of(url).is_some_and(|f| f.primary() != url)
    }
}

/// Disjoint sets over arrival indices. The root of each set is its lowest index.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

/// Build findings from the transitive, symmetric closure of the
/// non-suppressed duplicate edges.
///
/// Edges referencing a URL outside `comments` are dropped. The result is a
/// function of the inputs alone and does not depend on edge order.
pub fn group(comments: &[Comment], edges: &[DuplicateEdge], suppressions: &Suppressions) -> Grouping {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(comments.len());
    let mut urls: Vec<&str> = Vec::with_capacity(comments.len());
    for comment in comments {
        if !index.contains_key(comment.url.as_str()) {
            index.insert(&comment.url, urls.len());
            urls.push(&comment.url);
        }
    }

    let mut sets = DisjointSet::new(urls.len());
    for edge in edges {
        if suppressions.contains(&edge.duplicate, &edge.original) {
            debug!(duplicate = %edge.duplicate, original = %edge.original, "edge suppressed");
            continue;
        }
        match (
            index.get(edge.duplicate.as_str()),
            index.get(edge.original.as_str()),
        ) {
            (Some(&d), Some(&o)) => sets.union(d, o),
            _ => {
                debug!(duplicate = %edge.duplicate, original = %edge.original, "edge references unknown comment, ignored");
            }
        }
    }

    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); urls.len()];
    for i in 0..urls.len() {
        let root = sets.find(i);
        buckets[root].push(i);
    }

    let mut grouping = Grouping::default();
    for (root, bucket) in buckets.into_iter().enumerate() {
        if bucket.len() < 2 {
            continue;
        }
        // Members are pushed in ascending index order, so the root comes first.
        assert_eq!(bucket[0], root, "disjoint-set root is not the earliest member");
        let id = FindingId(grouping.findings.len());
        let members: Vec<String> = bucket.iter().map(|&i| urls[i].to_string()).collect();
        for url in &members {
            let previous = grouping.membership.insert(url.clone(), id);
            assert!(previous.is_none(), "comment {url} placed in two findings");
        }
        grouping.findings.push(Finding { id, members });
    }

    debug!(
        comments = urls.len(),
        findings = grouping.findings.len(),
        "grouped duplicate findings"
    );
    grouping
}
