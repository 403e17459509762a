use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::assignment::{Assignments, display_owner};
use crate::engagement::{
    Consensus, EngagementBand, ReactionMark, ReviewStatus, StatusCounts, account_for,
    account_for_participants, consensus_of, count_statuses, marks_of,
};
use crate::grouping::{Grouping, group};
use crate::marker::scan_thread;
use crate::model::{Comment, DuplicateEdge};
use crate::numbering::{IssueNumber, number};
use crate::overrides::Suppressions;
use crate::sources::{ReactionKind, ReviewThread, ThreadKey};

/// Default number of characters kept in a row's body preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 300;

/// Comments and duplicate edges derived from one fetch of a review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub comments: Vec<Comment>,
    pub edges: Vec<DuplicateEdge>,
}

impl Snapshot {
    /// Build the snapshot from raw threads. Each thread contributes its root
    /// comment; the root and every reply are scanned for duplicate markers
    /// and the last one found wins. With a non-empty `roster`, comments by
    /// anyone else are left out.
    pub fn from_threads(key: &ThreadKey, threads: &[ReviewThread], roster: &[String]) -> Self {
        let allowed: HashSet<&str> = roster.iter().map(|s| s.as_str()).collect();
        let mut seen = HashSet::new();
        let mut snapshot = Snapshot::default();

        for thread in threads {
            let Some(root) = thread.root() else { continue };
            if !allowed.is_empty() && !allowed.contains(root.author.as_str()) {
                continue;
            }
            if !seen.insert(root.url.clone()) {
                debug!(url = %root.url, "duplicate thread root, skipping");
                continue;
            }

            let scan = scan_thread(thread.comments.iter().map(|c| c.body.as_str()), key);
            for reference in &scan.ambiguous {
                warn!(url = %root.url, reference = %reference, "unresolvable duplicate marker, ignoring");
            }
            if let Some(target) = scan.target
                && target != root.url
            {
                snapshot
                    .edges
                    .push(DuplicateEdge::manual(root.url.clone(), target));
            }

            snapshot.comments.push(Comment {
                id: root.id.clone(),
                url: root.url.clone(),
                author: root.author.clone(),
                body: root.body.clone(),
                resolved: thread.resolved,
                reactions: root.reactions.clone(),
            });
        }
        snapshot
    }

    pub fn group(&self, suppressions: &Suppressions) -> Grouping {
        group(&self.comments, &self.edges, suppressions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub issue_number: IssueNumber,
    pub finding_label: Option<String>,
    pub url: String,
    pub id: String,
    pub author: String,
    pub preview: String,
    pub status: ReviewStatus,
    pub consensus: Consensus,
    /// A rocket reaction marks the issue as reported upstream.
    pub tracked: bool,
    pub duplicate_of: Option<String>,
    pub marks: BTreeMap<String, ReactionMark>,
    pub owner: String,
    pub also_spotted_by: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngagementView {
    pub satisfied: u32,
    pub opportunities: u32,
    pub percentage: u32,
    pub band: EngagementBand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub url: String,
    pub suffix_label: String,
    pub author: String,
    /// The member carries its own marker. Otherwise it only joined the
    /// finding because another comment pointed at it.
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindingView {
    pub label: String,
    pub members: Vec<MemberView>,
}

/// A secondary member of a finding, listed under its author for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateAssignment {
    pub label: String,
    pub url: String,
    pub original_url: String,
    pub original_author: String,
}

/// Output of one reconciliation pass over a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub repository: ThreadKey,
    pub rows: Vec<CommentView>,
    pub participants: Vec<String>,
    pub engagement: BTreeMap<String, EngagementView>,
    pub counts: StatusCounts,
    pub findings: Vec<FindingView>,
    /// Every participant, plus any other author of a secondary member.
    pub duplicate_assignments: BTreeMap<String, Vec<DuplicateAssignment>>,
}

impl Report {
    pub fn row(&self, url: &str) -> Option<&CommentView> {
        self.rows.iter().find(|r| r.url == url)
    }
}

/// Truncate to `limit` characters, appending `...` when anything was cut.
pub fn preview(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Run grouping, numbering, engagement and owner resolution over a snapshot.
pub fn reconcile(
    key: &ThreadKey,
    snapshot: &Snapshot,
    suppressions: &Suppressions,
    assignments: &Assignments,
    roster: &[String],
    preview_chars: usize,
) -> Report {
    let comments = &snapshot.comments;
    let grouping = snapshot.group(suppressions);
    let numbering = number(comments, &grouping);
    let engagement = if roster.is_empty() {
        account_for(comments)
    } else {
        account_for_participants(comments, roster.to_vec())
    };
    let counts = count_statuses(comments, &engagement.statuses, &grouping);
    let participant_count = engagement.participants.len();

    let duplicate_of: HashMap<&str, &str> = snapshot
        .edges
        .iter()
        .map(|e| (e.duplicate.as_str(), e.original.as_str()))
        .collect();
    let authors: HashMap<&str, &str> = comments
        .iter()
        .map(|c| (c.url.as_str(), c.author.as_str()))
        .collect();
    let label_of = |url: &str| -> String {
        numbering
            .get(url)
            .map(|n| n.to_string())
            .unwrap_or_default()
    };

    let mut rows: Vec<CommentView> = Vec::with_capacity(comments.len());
    for comment in comments {
        let Some(issue_number) = numbering.get(&comment.url) else {
            continue;
        };
        let finding = grouping.finding_of(&comment.url);
        let also_spotted_by = finding
            .map(|f| {
                f.members
                    .iter()
                    .filter(|m| **m != comment.url)
                    .map(|m| {
                        let author = authors.get(m.as_str()).copied().unwrap_or_default();
                        format!("{} ({author})", label_of(m))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        rows.push(CommentView {
            issue_number,
            finding_label: finding.map(|f| numbering.label(f.id).to_string()),
            url: comment.url.clone(),
            id: comment.id.clone(),
            author: comment.author.clone(),
            preview: preview(&comment.body, preview_chars),
            status: engagement
                .statuses
                .get(&comment.url)
                .copied()
                .unwrap_or(ReviewStatus::Pending),
            consensus: consensus_of(comment, participant_count),
            tracked: comment
                .reactions
                .iter()
                .any(|r| r.kind == ReactionKind::Tracked),
            duplicate_of: duplicate_of.get(comment.url.as_str()).map(|s| s.to_string()),
            marks: marks_of(comment),
            owner: display_owner(assignments, &grouping, comment),
            also_spotted_by,
        });
    }
    rows.sort_by_key(|r| r.issue_number.presentation_key());

    let findings = grouping
        .findings
        .iter()
        .map(|f| FindingView {
            label: numbering.label(f.id).to_string(),
            members: f
                .members
                .iter()
                .map(|url| MemberView {
                    url: url.clone(),
                    suffix_label: label_of(url),
                    author: authors.get(url.as_str()).copied().unwrap_or_default().to_string(),
                    manual: duplicate_of.contains_key(url.as_str()),
                })
                .collect(),
        })
        .collect();

    let engagement_views = engagement
        .tallies
        .iter()
        .map(|(handle, tally)| {
            (
                handle.clone(),
                EngagementView {
                    satisfied: tally.satisfied,
                    opportunities: tally.opportunities,
                    percentage: tally.percentage(),
                    band: tally.band(),
                },
            )
        })
        .collect();

    let mut duplicate_assignments: BTreeMap<String, Vec<DuplicateAssignment>> = engagement
        .participants
        .iter()
        .map(|p| (p.clone(), Vec::new()))
        .collect();
    for finding in &grouping.findings {
        let original = finding.primary();
        let original_author = authors.get(original).copied().unwrap_or_default();
        for member in &finding.members[1..] {
            let author = authors.get(member.as_str()).copied().unwrap_or_default();
            duplicate_assignments
                .entry(author.to_string())
                .or_default()
                .push(DuplicateAssignment {
                    label: label_of(member),
                    url: member.clone(),
                    original_url: original.to_string(),
                    original_author: original_author.to_string(),
                });
        }
    }

    debug!(
        key = %key,
        rows = rows.len(),
        findings = grouping.findings.len(),
        "reconciled review"
    );

    Report {
        repository: key.clone(),
        rows,
        participants: engagement.participants,
        engagement: engagement_views,
        counts,
        findings,
        duplicate_assignments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{Reaction, ThreadComment};
    use crate::test_helpers::make_thread;

    fn key() -> ThreadKey {
        ThreadKey::new("acme", "vault", 12)
    }

    fn url(id: u32) -> String {
        format!("https://github.com/acme/vault/pull/12#discussion_r{id}")
    }

    /// Arrival order B, A, C; A and C mark themselves duplicates of B.
    fn sample_threads() -> Vec<ReviewThread> {
        vec![
            make_thread(&url(2), "bob", "Missing access control on burn()"),
            make_thread(&url(1), "alice", &format!("burn is unprotected\n\nDUP <{}>", url(2))),
            make_thread(&url(3), "carol", "Dup #discussion_r2"),
        ]
    }

    fn run(threads: &[ReviewThread], suppressions: &Suppressions) -> Report {
        let snapshot = Snapshot::from_threads(&key(), threads, &[]);
        reconcile(
            &key(),
            &snapshot,
            suppressions,
            &Assignments::new(),
            &[],
            DEFAULT_PREVIEW_CHARS,
        )
    }

    fn numbers(report: &Report) -> Vec<(String, String)> {
        report
            .rows
            .iter()
            .map(|r| (r.issue_number.to_string(), r.author.clone()))
            .collect()
    }

    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("exactly", 7), "exactly");
        assert_eq!(preview("abcdef", 3), "abc...");
        // Multi-byte characters are never split
        assert_eq!(preview("ééé", 2), "éé...");
    }

    #[test]
    fn test_snapshot_extracts_edges() {
        let snapshot = Snapshot::from_threads(&key(), &sample_threads(), &[]);
        assert_eq!(snapshot.comments.len(), 3);
        assert_eq!(
            snapshot.edges,
            vec![
                DuplicateEdge::manual(url(1), url(2)),
                DuplicateEdge::manual(url(3), url(2)),
            ]
        );
    }

    #[test]
    fn test_snapshot_reply_correction_wins() {
        let mut thread = make_thread(&url(5), "dana", &format!("DUP {}", url(1)));
        thread.comments.push(ThreadComment {
            id: "reply".into(),
            url: url(6),
            body: format!("wrong link, DUP {}", url(2)),
            author: "dana".into(),
            reactions: vec![],
        });
        let snapshot = Snapshot::from_threads(&key(), &[thread], &[]);
        assert_eq!(snapshot.comments.len(), 1);
        assert_eq!(snapshot.edges, vec![DuplicateEdge::manual(url(5), url(2))]);
    }

    #[test]
    fn test_snapshot_ignores_self_reference() {
        let thread = make_thread(&url(5), "dana", &format!("DUP {}", url(5)));
        let snapshot = Snapshot::from_threads(&key(), &[thread], &[]);
        assert!(snapshot.edges.is_empty());
    }

    #[test]
    fn test_merged_finding_numbering() {
        let report = run(&sample_threads(), &Suppressions::default());
        assert_eq!(
            numbers(&report),
            [
                ("D-1.1".to_string(), "bob".to_string()),
                ("D-1.2".to_string(), "alice".to_string()),
                ("D-1.3".to_string(), "carol".to_string()),
            ]
        );
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].label, "D-1");
        let suffixes: Vec<&str> = report.findings[0]
            .members
            .iter()
            .map(|m| m.suffix_label.as_str())
            .collect();
        assert_eq!(suffixes, ["D-1.1", "D-1.2", "D-1.3"]);
    }

    #[test]
    fn test_suppression_splits_off_single_member() {
        let suppressions = Suppressions::from_pairs([(url(3).as_str(), url(2).as_str())]);
        let report = run(&sample_threads(), &suppressions);
        assert_eq!(
            numbers(&report),
            [
                ("D-1.1".to_string(), "bob".to_string()),
                ("D-1.2".to_string(), "alice".to_string()),
                ("1".to_string(), "carol".to_string()),
            ]
        );
        // The marker is still shown even though the edge is suppressed
        assert_eq!(report.row(&url(3)).unwrap().duplicate_of, Some(url(2)));
    }

    #[test]
    fn test_rows_findings_before_standalone() {
        let mut threads = vec![make_thread(&url(9), "erin", "unrelated")];
        threads.extend(sample_threads());
        let report = run(&threads, &Suppressions::default());
        let order: Vec<String> = report.rows.iter().map(|r| r.issue_number.to_string()).collect();
        assert_eq!(order, ["D-1.1", "D-1.2", "D-1.3", "1"]);
    }

    #[test]
    fn test_also_spotted_by_and_owner_defaults() {
        let mut threads = sample_threads();
        threads.push(make_thread(&url(9), "erin", "unrelated"));
        let report = run(&threads, &Suppressions::default());

        let alice = report.row(&url(1)).unwrap();
        assert_eq!(alice.finding_label.as_deref(), Some("D-1"));
        assert_eq!(alice.also_spotted_by, ["D-1.1 (bob)", "D-1.3 (carol)"]);
        assert_eq!(alice.owner, "");

        let erin = report.row(&url(9)).unwrap();
        assert!(erin.also_spotted_by.is_empty());
        assert_eq!(erin.finding_label, None);
        assert_eq!(erin.owner, "erin");
    }

    #[test]
    fn test_counts_and_engagement() {
        let mut threads = sample_threads();
        threads[0].resolved = true;
        threads[0].comments[0].reactions = vec![
            Reaction {
                kind: ReactionKind::Approve,
                user: "alice".into(),
            },
            Reaction {
                kind: ReactionKind::Approve,
                user: "carol".into(),
            },
            Reaction {
                kind: ReactionKind::Tracked,
                user: "bob".into(),
            },
        ];
        threads[1].resolved = true;
        let report = run(&threads, &Suppressions::default());

        // Only the primary counts: alice and carol are secondary members
        assert_eq!(
            report.counts,
            StatusCounts {
                pending: 0,
                reported_positive: 1,
                reported_negative: 0
            }
        );
        let bob = report.row(&url(2)).unwrap();
        assert_eq!(bob.status, ReviewStatus::ReportedPositive);
        assert!(bob.tracked);
        assert_eq!(bob.marks["alice"], ReactionMark::Approve);

        assert_eq!(report.participants, ["bob", "alice", "carol"]);
        let alice = report.engagement["alice"];
        assert_eq!((alice.satisfied, alice.opportunities, alice.percentage), (1, 2, 50));
        let bob = report.engagement["bob"];
        assert_eq!((bob.satisfied, bob.opportunities, bob.percentage), (0, 2, 0));
    }

    #[test]
    fn test_roster_filters_comments_and_participants() {
        let roster = vec!["bob".to_string(), "carol".to_string(), "quinn".to_string()];
        let snapshot = Snapshot::from_threads(&key(), &sample_threads(), &roster);
        let report = reconcile(
            &key(),
            &snapshot,
            &Suppressions::default(),
            &Assignments::new(),
            &roster,
            DEFAULT_PREVIEW_CHARS,
        );
        assert_eq!(report.rows.len(), 2);
        assert!(report.row(&url(1)).is_none());
        assert_eq!(report.participants, roster);
        assert_eq!(report.engagement["quinn"].opportunities, 2);
        assert_eq!(report.engagement["quinn"].percentage, 0);
        // carol still duplicates bob
        assert_eq!(report.findings[0].members.len(), 2);
    }

    #[test]
    fn test_member_manual_flag() {
        let report = run(&sample_threads(), &Suppressions::default());
        let flags: Vec<(&str, bool)> = report.findings[0]
            .members
            .iter()
            .map(|m| (m.author.as_str(), m.manual))
            .collect();
        // bob only joined because the others pointed at him
        assert_eq!(flags, [("bob", false), ("alice", true), ("carol", true)]);
    }

    #[test]
    fn test_duplicate_assignments_by_author() {
        let mut threads = sample_threads();
        threads.push(make_thread(&url(9), "erin", "unrelated"));
        let report = run(&threads, &Suppressions::default());
        let assignments = &report.duplicate_assignments;

        assert!(assignments["bob"].is_empty());
        assert!(assignments["erin"].is_empty());
        assert_eq!(
            assignments["alice"],
            [DuplicateAssignment {
                label: "D-1.2".to_string(),
                url: url(1),
                original_url: url(2),
                original_author: "bob".to_string(),
            }]
        );
        assert_eq!(assignments["carol"][0].label, "D-1.3");
        assert_eq!(assignments["carol"][0].original_author, "bob");
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let threads = sample_threads();
        let first = run(&threads, &Suppressions::default());
        let second = run(&threads, &Suppressions::default());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = run(&sample_threads(), &Suppressions::default());
        let value = serde_json::to_value(&report).unwrap();
        for field in [
            "rows",
            "participants",
            "engagement",
            "counts",
            "findings",
            "duplicate_assignments",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["rows"][0]["issue_number"], "D-1.1");
        assert_eq!(value["rows"][0]["status"], "pending");
        assert_eq!(value["counts"]["pending"], 1);
        assert_eq!(value["findings"][0]["members"][1]["author"], "alice");
    }
}
