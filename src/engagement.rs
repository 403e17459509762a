use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::grouping::Grouping;
use crate::model::Comment;
use crate::sources::ReactionKind;

/// How many comments by others a participant was expected to acknowledge,
/// and how many they did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngagementTally {
    pub satisfied: u32,
    pub opportunities: u32,
}

impl EngagementTally {
    /// Rounded completion percentage. With no opportunities there is nothing
    /// outstanding, so this reports 100; treat that as display-only.
    pub fn percentage(&self) -> u32 {
        if self.opportunities == 0 {
            return 100;
        }
        let s = u64::from(self.satisfied);
        let o = u64::from(self.opportunities);
        ((200 * s + o) / (2 * o)) as u32
    }

    pub fn band(&self) -> EngagementBand {
        EngagementBand::for_percentage(self.percentage())
    }
}

/// Color band of a completion percentage in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementBand {
    High,
    Medium,
    Low,
    Critical,
}

impl EngagementBand {
    pub const HIGH: u32 = 90;
    pub const MEDIUM: u32 = 70;
    pub const LOW: u32 = 50;

    pub fn for_percentage(pct: u32) -> Self {
        if pct >= Self::HIGH {
            EngagementBand::High
        } else if pct >= Self::MEDIUM {
            EngagementBand::Medium
        } else if pct >= Self::LOW {
            EngagementBand::Low
        } else {
            EngagementBand::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// The upstream thread is still open.
    Pending,
    ReportedPositive,
    ReportedNegative,
}

impl ReviewStatus {
    pub fn glyph(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "…",
            ReviewStatus::ReportedPositive => "✅",
            ReviewStatus::ReportedNegative => "❌",
        }
    }
}

/// Reviewer agreement on a single comment, regardless of thread state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Consensus {
    Endorsed,
    Rejected,
    None,
}

/// What a participant did on a particular comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionMark {
    Proposer,
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u32,
    pub reported_positive: u32,
    pub reported_negative: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engagement {
    /// In first-seen order.
    pub participants: Vec<String>,
    pub tallies: BTreeMap<String, EngagementTally>,
    pub statuses: HashMap<String, ReviewStatus>,
}

/// Every comment author and every reactor, in first-seen order.
pub fn collect_participants(comments: &[Comment]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut participants = Vec::new();
    for comment in comments {
        let handles =
            std::iter::once(&comment.author).chain(comment.reactions.iter().map(|r| &r.user));
        for handle in handles {
            if seen.insert(handle.as_str()) {
                participants.push(handle.clone());
            }
        }
    }
    participants
}

pub fn account_for(comments: &[Comment]) -> Engagement {
    let participants = collect_participants(comments);
    account_for_participants(comments, participants)
}

/// Tally engagement against a fixed participant list.
pub fn account_for_participants(comments: &[Comment], participants: Vec<String>) -> Engagement {
    let mut tallies: BTreeMap<String, EngagementTally> = participants
        .iter()
        .map(|p| (p.clone(), EngagementTally::default()))
        .collect();

    let mut statuses = HashMap::with_capacity(comments.len());
    for comment in comments {
        let acknowledged: HashSet<&str> = comment
            .reactions
            .iter()
            .filter(|r| r.kind.acknowledges())
            .map(|r| r.user.as_str())
            .collect();

        for participant in &participants {
            if *participant == comment.author {
                continue;
            }
            if let Some(tally) = tallies.get_mut(participant) {
                tally.opportunities += 1;
                if acknowledged.contains(participant.as_str()) {
                    tally.satisfied += 1;
                }
            }
        }

        statuses.insert(comment.url.clone(), status_of(comment, participants.len()));
    }

    Engagement {
        participants,
        tallies,
        statuses,
    }
}

/// Distinct users other than the author who reacted with `kind`.
fn distinct_reactors(comment: &Comment, kind: ReactionKind) -> usize {
    comment
        .reactions
        .iter()
        .filter(|r| r.kind == kind && r.user != comment.author)
        .map(|r| r.user.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Approvals plus the author's implicit one reach two thirds of participants.
fn is_endorsed(comment: &Comment, participant_count: usize) -> bool {
    let approvals = distinct_reactors(comment, ReactionKind::Approve);
    3 * (approvals + 1) >= 2 * participant_count
}

pub fn status_of(comment: &Comment, participant_count: usize) -> ReviewStatus {
    if !comment.resolved {
        ReviewStatus::Pending
    } else if is_endorsed(comment, participant_count) {
        ReviewStatus::ReportedPositive
    } else {
        ReviewStatus::ReportedNegative
    }
}

pub fn consensus_of(comment: &Comment, participant_count: usize) -> Consensus {
    if is_endorsed(comment, participant_count) {
        return Consensus::Endorsed;
    }
    let rejections = distinct_reactors(comment, ReactionKind::Reject);
    if 3 * rejections >= 2 * participant_count.saturating_sub(1) {
        Consensus::Rejected
    } else {
        Consensus::None
    }
}

/// Per-participant marks on one comment. Reactions override the author's
/// `Proposer` mark; later reactions override earlier ones.
pub fn marks_of(comment: &Comment) -> BTreeMap<String, ReactionMark> {
    let mut marks = BTreeMap::new();
    marks.insert(comment.author.clone(), ReactionMark::Proposer);
    for reaction in &comment.reactions {
        let mark = match reaction.kind {
            ReactionKind::Approve => ReactionMark::Approve,
            ReactionKind::Reject => ReactionMark::Reject,
            ReactionKind::Tracked | ReactionKind::Ignored => continue,
        };
        marks.insert(reaction.user.clone(), mark);
    }
    marks
}

/// Review-wide status counts. Secondary members of a finding are skipped so
/// each real-world issue counts once.
pub fn count_statuses(
    comments: &[Comment],
    statuses: &HashMap<String, ReviewStatus>,
    grouping: &Grouping,
) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for comment in comments {
        if grouping.is_secondary(&comment.url) {
            continue;
        }
        match statuses.get(&comment.url) {
            Some(ReviewStatus::Pending) => counts.pending += 1,
            Some(ReviewStatus::ReportedPositive) => counts.reported_positive += 1,
            Some(ReviewStatus::ReportedNegative) => counts.reported_negative += 1,
            None => {}
        }
    }
    counts
}
