use crate::model::Comment;
use crate::sources::{Reaction, ReactionKind, ReviewThread, ThreadComment};

/// Create an unresolved `Comment` with no reactions.
pub fn make_comment(url: &str, author: &str) -> Comment {
    Comment {
        id: format!("id-{url}"),
        url: url.to_string(),
        author: author.to_string(),
        body: format!("{url} body"),
        resolved: false,
        reactions: vec![],
    }
}

pub fn with_reactions(mut comment: Comment, reactions: &[(&str, ReactionKind)]) -> Comment {
    comment.reactions = reactions
        .iter()
        .map(|(user, kind)| Reaction {
            kind: *kind,
            user: user.to_string(),
        })
        .collect();
    comment
}

/// A single-comment thread.
pub fn make_thread(url: &str, author: &str, body: &str) -> ReviewThread {
    ReviewThread {
        resolved: false,
        comments: vec![ThreadComment {
            id: format!("id-{url}"),
            url: url.to_string(),
            body: body.to_string(),
            author: author.to_string(),
            reactions: vec![],
        }],
    }
}
