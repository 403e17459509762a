pub mod github;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static PULL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://github\.com/([^/\s]+)/([^/\s]+)/pull/(\d+)(?:[/#?]|$)").unwrap()
});
static SHORT_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^/\s#]+)/([^/\s#]+)#(\d+)$").unwrap());

/// Identifies one review surface (a pull request) on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadKey {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl ThreadKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Base URL of the pull request, used to expand short anchors.
    pub fn pull_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/pull/{}",
            self.owner, self.repo, self.number
        )
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

impl FromStr for ThreadKey {
    type Err = Error;

    /// Accepts `owner/repo#N` or `https://github.com/owner/repo/pull/N[...]`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let caps = PULL_URL_RE
            .captures(s)
            .or_else(|| SHORT_KEY_RE.captures(s))
            .ok_or_else(|| Error::InvalidThreadKey(s.to_string()))?;
        let number = caps[3]
            .parse::<u64>()
            .map_err(|_| Error::InvalidThreadKey(s.to_string()))?;
        Ok(ThreadKey::new(&caps[1], &caps[2], number))
    }
}

/// Reaction kinds the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Approve,
    Reject,
    /// Marks the finding as reported upstream.
    Tracked,
    Ignored,
}

impl ReactionKind {
    /// Map a raw GitHub reaction content (e.g. `THUMBS_UP`) to a kind.
    /// Returns `None` for contents the tool does not expect at all.
    pub fn from_content(content: &str) -> Option<Self> {
        match content.to_ascii_uppercase().as_str() {
            "THUMBS_UP" | "+1" => Some(ReactionKind::Approve),
            "THUMBS_DOWN" | "-1" => Some(ReactionKind::Reject),
            "ROCKET" => Some(ReactionKind::Tracked),
            "EYES" => Some(ReactionKind::Ignored),
            _ => None,
        }
    }

    /// Approve and reject both count as acknowledging a comment.
    pub fn acknowledges(self) -> bool {
        matches!(self, ReactionKind::Approve | ReactionKind::Reject)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub kind: ReactionKind,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadComment {
    pub id: String,
    pub url: String,
    pub body: String,
    pub author: String,
    pub reactions: Vec<Reaction>,
}

/// One review thread: a root comment plus its replies, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewThread {
    pub resolved: bool,
    pub comments: Vec<ThreadComment>,
}

impl ReviewThread {
    pub fn root(&self) -> Option<&ThreadComment> {
        self.comments.first()
    }
}

pub trait ReviewSource: Send + Sync {
    /// Fetch every review thread for the given key, in thread order.
    fn fetch_threads(&self, key: &ThreadKey) -> Result<Vec<ReviewThread>>;
}
