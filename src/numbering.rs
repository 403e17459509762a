use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::grouping::{FindingId, Grouping};
use crate::model::Comment;

/// Prefix of finding sequence labels (`D-1`, `D-2`, ...).
pub const FINDING_LABEL_PREFIX: &str = "D-";

/// Human-readable identifier of a comment within one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueNumber {
    /// 1-based, in arrival order among standalone comments.
    Standalone(u32),
    /// `D-{sequence}.{position}`; position 1 is the finding's primary.
    Member { sequence: u32, position: u32 },
}

impl IssueNumber {
    /// Sort key for display: findings first by sequence and position, then
    /// standalone comments by number. Not used when assigning numbers.
    pub fn presentation_key(&self) -> (u8, u32, u32) {
        match *self {
            IssueNumber::Member { sequence, position } => (0, sequence, position),
            IssueNumber::Standalone(n) => (1, n, 0),
        }
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueNumber::Standalone(n) => write!(f, "{n}"),
            IssueNumber::Member { sequence, position } => {
                write!(f, "{FINDING_LABEL_PREFIX}{sequence}.{position}")
            }
        }
    }
}

impl Serialize for IssueNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IssueNumber::Standalone(n) => serializer.serialize_u32(*n),
            IssueNumber::Member { .. } => serializer.collect_str(self),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Numbering {
    pub numbers: HashMap<String, IssueNumber>,
    /// Sequence label per finding, indexed by [`FindingId`].
    pub labels: Vec<String>,
}

impl Numbering {
    pub fn get(&self, url: &str) -> Option<IssueNumber> {
        self.numbers.get(url).copied()
    }

    pub fn label(&self, id: FindingId) -> &str {
        &self.labels[id.0]
    }
}

/// Assign issue numbers. Standalone comments get `1, 2, ...` in arrival
/// order; findings get `D-1, D-2, ...` in the order the grouping produced
/// them, and each member gets `D-n.k` by its position in the finding.
pub fn number(comments: &[Comment], grouping: &Grouping) -> Numbering {
    let mut numbering = Numbering::default();

    let mut next_standalone = 1u32;
    for comment in comments {
        if grouping.is_standalone(&comment.url) && !numbering.numbers.contains_key(&comment.url) {
            numbering
                .numbers
                .insert(comment.url.clone(), IssueNumber::Standalone(next_standalone));
            next_standalone += 1;
        }
    }

    for (i, finding) in grouping.findings.iter().enumerate() {
        let sequence = i as u32 + 1;
        numbering
            .labels
            .push(format!("{FINDING_LABEL_PREFIX}{sequence}"));
        for (j, url) in finding.members.iter().enumerate() {
            numbering.numbers.insert(
                url.clone(),
                IssueNumber::Member {
                    sequence,
                    position: j as u32 + 1,
                },
            );
        }
    }

    numbering
}
