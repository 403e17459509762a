use crate::sources::Reaction;

/// One review finding as seen by the engine: the root comment of a thread.
/// Built fresh on every pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub url: String,
    pub author: String,
    pub body: String,
    pub resolved: bool,
    pub reactions: Vec<Reaction>,
}

/// `duplicate` claims to report the same issue as `original`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateEdge {
    pub duplicate: String,
    pub original: String,
    /// Always true today: edges only come from literal marker text.
    pub manual: bool,
}

impl DuplicateEdge {
    pub fn manual(duplicate: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            duplicate: duplicate.into(),
            original: original.into(),
            manual: true,
        }
    }
}
