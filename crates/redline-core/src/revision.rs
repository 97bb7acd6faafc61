//! Revision wrappers
//!
//! Tracked changes are containers around runs: an insertion marks its runs as
//! new text, a deletion keeps its runs in the tree but every literal text leaf
//! underneath it is switched to the struck form.
//!
//! Author and time come from injected capabilities ([`AuthorProvider`],
//! [`Clock`]) so callers decide how "current user" and "now" are resolved.

use crate::node::{NodeArena, NodeId, NodeKind, TextTag};
use crate::split::{Split, split_node};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Mutex, PoisonError};

/// Kind of tracked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevisionKind {
    /// Text added while tracking (`w:ins`).
    Insertion,
    /// Text removed while tracking (`w:del`).
    Deletion,
}

impl RevisionKind {
    /// Tag every literal text leaf inside a wrapper of this kind must carry.
    pub fn text_tag(self) -> TextTag {
        match self {
            RevisionKind::Insertion => TextTag::Live,
            RevisionKind::Deletion => TextTag::Struck,
        }
    }
}

/// Metadata carried by a revision wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionMeta {
    /// Synthetic revision id.
    pub id: u32,
    /// Author, when one could be determined.
    pub author: Option<String>,
    /// UTC timestamp truncated to whole minutes.
    pub date: DateTime<Utc>,
}

/// Supplies the author recorded on new revisions.
pub trait AuthorProvider: Send + Sync {
    /// Current author, `None` if it cannot be determined.
    fn current_author(&self) -> Option<String>;
}

/// Reads the author from the `USER` or `USERNAME` environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvAuthor;

impl AuthorProvider for EnvAuthor {
    fn current_author(&self) -> Option<String> {
        ["USER", "USERNAME"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|name| !name.trim().is_empty())
    }
}

/// Always reports the same author (or none).
#[derive(Debug, Clone, Default)]
pub struct FixedAuthor(Option<String>);

impl FixedAuthor {
    /// Report `name` as the author.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    /// Report no author at all.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl AuthorProvider for FixedAuthor {
    fn current_author(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Supplies the time recorded on new revisions.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Start the clock at `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at: Mutex::new(at) }
    }

    /// Jump to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.at.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut at = self.at.lock().unwrap_or_else(PoisonError::into_inner);
        *at += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.at.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    let secs = at.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(60), 0).unwrap_or(at)
}

/// Set the tag of every text leaf in the subtree rooted at `node`.
pub(crate) fn retag(arena: &mut NodeArena, node: NodeId, tag: TextTag) {
    let mut nodes = arena.descendants(node);
    nodes.push(node);
    for id in nodes {
        if let NodeKind::Text { tag: current, .. } = arena.kind_mut(id) {
            *current = tag;
        }
    }
}

/// Wrap `content` in a new detached revision wrapper.
///
/// Text underneath is re-tagged to match the wrapper kind, so a deletion never
/// contains live text and an insertion never contains struck text.
pub(crate) fn build_wrapper(
    arena: &mut NodeArena,
    kind: RevisionKind,
    meta: RevisionMeta,
    content: &[NodeId],
) -> NodeId {
    let wrapper = arena.alloc(NodeKind::Revision { kind, meta });
    for &node in content {
        arena.append_child(wrapper, node);
    }
    retag(arena, wrapper, kind.text_tag());
    wrapper
}

/// Split a wrapper at a wrapper-local offset.
///
/// Both halves keep the original metadata, including the id; the renumbering
/// pass makes the ids unique again once the halves are spliced in.
pub(crate) fn split_wrapper(arena: &mut NodeArena, wrapper: NodeId, offset: usize) -> Split {
    split_node(arena, wrapper, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(id: u32) -> RevisionMeta {
        RevisionMeta {
            id,
            author: Some("tester".to_string()),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    fn run(arena: &mut NodeArena, text: &str) -> NodeId {
        let run = arena.alloc(NodeKind::Run { formatting: None });
        let leaf = arena.alloc(NodeKind::Text {
            value: text.to_string(),
            tag: TextTag::Live,
            preserve_space: false,
        });
        arena.append_child(run, leaf);
        run
    }

    fn tags(arena: &NodeArena, node: NodeId) -> Vec<(String, TextTag)> {
        arena
            .descendants(node)
            .into_iter()
            .filter_map(|id| match arena.kind(id) {
                NodeKind::Text { value, tag, .. } => Some((value.clone(), *tag)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_deletion_strikes_every_text_leaf() {
        let mut arena = NodeArena::new();
        let x = run(&mut arena, "X");
        let wrapper = build_wrapper(&mut arena, RevisionKind::Deletion, meta(1), &[x]);

        let found = tags(&arena, wrapper);
        assert_eq!(found, vec![("X".to_string(), TextTag::Struck)]);
        assert!(!found.iter().any(|(_, tag)| *tag == TextTag::Live));
    }

    #[test]
    fn test_insertion_revives_struck_text() {
        let mut arena = NodeArena::new();
        let x = run(&mut arena, "gone");
        retag(&mut arena, x, TextTag::Struck);
        let wrapper = build_wrapper(&mut arena, RevisionKind::Insertion, meta(2), &[x]);
        assert_eq!(tags(&arena, wrapper), vec![("gone".to_string(), TextTag::Live)]);
    }

    #[test]
    fn test_split_wrapper_keeps_metadata() {
        let mut arena = NodeArena::new();
        let a = run(&mut arena, "abc");
        let b = run(&mut arena, "def");
        let wrapper = build_wrapper(&mut arena, RevisionKind::Insertion, meta(7), &[a, b]);

        let (left, right) = split_wrapper(&mut arena, wrapper, 4);
        let (left, right) = (left.unwrap(), right.unwrap());
        assert_eq!(arena.text_length(left), 4);
        assert_eq!(arena.text_length(right), 2);
        assert_eq!(arena.kind(left), arena.kind(wrapper));
        assert_eq!(arena.kind(right), arena.kind(wrapper));
    }

    #[test]
    fn test_split_wrapper_at_edges_collapses_empty_half() {
        let mut arena = NodeArena::new();
        let a = run(&mut arena, "abc");
        let wrapper = build_wrapper(&mut arena, RevisionKind::Deletion, meta(3), &[a]);

        let (left, right) = split_wrapper(&mut arena, wrapper, 0);
        assert!(left.is_none());
        assert_eq!(arena.text_length(right.unwrap()), 3);

        let (left, right) = split_wrapper(&mut arena, wrapper, 3);
        assert_eq!(arena.text_length(left.unwrap()), 3);
        assert!(right.is_none());
    }

    #[test]
    fn test_truncate_to_minute() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 59).unwrap();
        assert_eq!(
            truncate_to_minute(at),
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(TimeDelta::minutes(2));
        assert_eq!(clock.now(), start + TimeDelta::minutes(2));
    }

    #[test]
    fn test_fixed_author() {
        assert_eq!(FixedAuthor::new("ann").current_author().as_deref(), Some("ann"));
        assert_eq!(FixedAuthor::anonymous().current_author(), None);
    }
}
