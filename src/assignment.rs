use std::collections::BTreeMap;

use crate::grouping::Grouping;
use crate::model::Comment;

/// Stored owner per comment URL.
pub type Assignments = BTreeMap<String, String>;

/// URLs whose stored owner must change when `url` is assigned. Ownership
/// belongs to the whole finding, so every member is returned; a standalone
/// comment (or an unknown URL) only affects itself.
pub fn propagate(grouping: &Grouping, url: &str) -> Vec<String> {
    match grouping.finding_of(url) {
        Some(finding) => finding.members.clone(),
        None => vec![url.to_string()],
    }
}

/// Record `owner` for every URL returned by [`propagate`].
pub fn set_owner(assignments: &mut Assignments, grouping: &Grouping, url: &str, owner: &str) -> Vec<String> {
    let urls = propagate(grouping, url);
    for member in &urls {
        assignments.insert(member.clone(), owner.to_string());
    }
    urls
}

/// Owner to display for a comment. An explicit stored value always wins.
/// Without one, a standalone comment belongs to its author, while a
/// finding member stays empty until someone decides.
pub fn display_owner(assignments: &Assignments, grouping: &Grouping, comment: &Comment) -> String {
    if let Some(owner) = assignments.get(&comment.url) {
        return owner.clone();
    }
    if grouping.is_standalone(&comment.url) {
        comment.author.clone()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group;
    use crate::model::DuplicateEdge;
    use crate::overrides::Suppressions;
    use crate::test_helpers::make_comment;

    fn fixture() -> (Vec<Comment>, Grouping) {
        let comments = vec![
            make_comment("B", "bob"),
            make_comment("A", "alice"),
            make_comment("C", "carol"),
            make_comment("S", "sam"),
        ];
        let edges = [DuplicateEdge::manual("A", "B"), DuplicateEdge::manual("C", "B")];
        let grouping = group(&comments, &edges, &Suppressions::default());
        (comments, grouping)
    }

    #[test]
    fn test_propagate_from_any_member() {
        let (_, grouping) = fixture();
        for url in ["A", "B", "C"] {
            assert_eq!(propagate(&grouping, url), ["B", "A", "C"]);
        }
    }

    #[test]
    fn test_propagate_standalone_and_unknown() {
        let (_, grouping) = fixture();
        assert_eq!(propagate(&grouping, "S"), ["S"]);
        assert_eq!(propagate(&grouping, "nowhere"), ["nowhere"]);
    }

    #[test]
    fn test_set_owner_updates_every_member() {
        let (_, grouping) = fixture();
        let mut assignments = Assignments::new();
        let updated = set_owner(&mut assignments, &grouping, "A", "alice");
        assert_eq!(updated.len(), 3);
        for url in ["A", "B", "C"] {
            assert_eq!(assignments[url], "alice");
        }
        assert!(!assignments.contains_key("S"));
    }

    #[test]
    fn test_display_owner_defaults() {
        let (comments, grouping) = fixture();
        let assignments = Assignments::new();
        let owners: Vec<String> = comments
            .iter()
            .map(|c| display_owner(&assignments, &grouping, c))
            .collect();
        // Finding members stay empty, standalone defaults to its author
        assert_eq!(owners, ["", "", "", "sam"]);
    }

    #[test]
    fn test_display_owner_prefers_stored_value() {
        let (comments, grouping) = fixture();
        let mut assignments = Assignments::new();
        set_owner(&mut assignments, &grouping, "C", "dana");
        assignments.insert("S".to_string(), "erin".to_string());
        let owners: Vec<String> = comments
            .iter()
            .map(|c| display_owner(&assignments, &grouping, c))
            .collect();
        assert_eq!(owners, ["dana", "dana", "dana", "erin"]);
    }
}
