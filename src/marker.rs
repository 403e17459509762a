use std::sync::LazyLock;

use regex::Regex;

use crate::sources::ThreadKey;

/// `DUP`, `Dup:`, `duplicate of` and friends, followed by one target token.
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdup(?:licate)?(?:\s+of)?\s*:?\s*(\S+)").unwrap());

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#discussion_r(\d+)$").unwrap());

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#(\d+)$").unwrap());

const GITHUB_PREFIX: &str = "https://github.com/";

/// Result of scanning a single comment body for a duplicate marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A fully-qualified URL of the comment this one duplicates.
    Target(String),
    /// A `#N` style reference that names a thread, not a comment.
    Ambiguous(String),
    None,
}

impl Extraction {
    pub fn target(&self) -> Option<&str> {
        match self {
            Extraction::Target(url) => Some(url),
            _ => None,
        }
    }
}

/// Extract the duplicate target from a comment body.
///
/// Recognized encodings, all introduced by a `DUP` keyword:
/// - a full `https://github.com/...` link, bare, in `<...>` or in backticks;
/// - a short `#discussion_r<ID>` anchor, expanded against `ctx`;
/// - a `#N` / `#N (comment)` reference, reported as [`Extraction::Ambiguous`].
///
/// The first resolvable marker in text order wins. An ambiguous reference
/// is only returned when no resolvable marker follows it.
pub fn extract(body: &str, ctx: &ThreadKey) -> Extraction {
    let mut ambiguous = None;
    for cap in MARKER_RE.captures_iter(body) {
        let token = clean_token(&cap[1]);

        if token.starts_with(GITHUB_PREFIX) && token.len() > GITHUB_PREFIX.len() {
            return Extraction::Target(token.to_string());
        }
        if let Some(anchor) = ANCHOR_RE.captures(token) {
            return Extraction::Target(format!("{}#discussion_r{}", ctx.pull_url(), &anchor[1]));
        }
        if ambiguous.is_none() && NUMBERED_RE.is_match(token) {
            ambiguous = Some(token.to_string());
        }
    }
    ambiguous.map_or(Extraction::None, Extraction::Ambiguous)
}

/// Outcome of scanning a whole review thread (root plus replies).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadScan {
    pub target: Option<String>,
    pub ambiguous: Vec<String>,
}

/// Run [`extract`] over each body in chronological order. A later target
/// replaces an earlier one; ambiguous references never replace anything.
pub fn scan_thread<'a, I>(bodies: I, ctx: &ThreadKey) -> ThreadScan
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scan = ThreadScan::default();
    for body in bodies {
        match extract(body, ctx) {
            Extraction::Target(url) => scan.target = Some(url),
            Extraction::Ambiguous(reference) => scan.ambiguous.push(reference),
            Extraction::None => {}
        }
    }
    scan
}

/// Strip wrappers and trailing punctuation in any interleaving, so
/// `` `<url>`, `` and `(url).` both reduce to the bare link.
fn clean_token(raw: &str) -> &str {
    raw.trim_start_matches(['`', '<', '(', '"', '\''])
        .trim_end_matches(['`', '>', ')', '"', '\'', '.', ',', ';', ':', '!', '?'])
}
