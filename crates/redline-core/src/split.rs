//! Node splitting
//!
//! Cutting a node at a local character offset yields a left and a right
//! fragment whose concatenated text equals the original. Fragments are always
//! fresh detached nodes; the original is left in place for the caller to
//! replace. A side that ends up with no text and no anchored content (a
//! drawing or bookmark) is reported as absent rather than as an empty node.

use crate::node::{NodeArena, NodeId, NodeKind};
use crate::text::needs_preserve_space;

/// Left and right fragments of a split; `None` means the side is absent.
pub type Split = (Option<NodeId>, Option<NodeId>);

/// Split a text, tab or break leaf at a leaf-local offset.
///
/// Tabs and breaks are atomic: splitting at their own start puts them on the
/// right, any other offset puts them on the left.
pub fn split_text(arena: &mut NodeArena, leaf: NodeId, offset: usize) -> Split {
    let (value, tag) = match arena.kind(leaf) {
        NodeKind::Text { value, tag, .. } => (value.clone(), *tag),
        NodeKind::Tab | NodeKind::Break => {
            let copy = arena.deep_clone(leaf);
            return if offset == 0 {
                (None, Some(copy))
            } else {
                (Some(copy), None)
            };
        }
        _ => return keep_whole(arena, leaf),
    };

    let byte = value
        .char_indices()
        .nth(offset)
        .map(|(b, _)| b)
        .unwrap_or(value.len());
    let (left, right) = value.split_at(byte);

    let mut fragment = |text: &str| {
        (!text.is_empty()).then(|| {
            arena.alloc(NodeKind::Text {
                value: text.to_string(),
                tag,
                preserve_space: needs_preserve_space(text),
            })
        })
    };
    let left = fragment(left);
    let right = fragment(right);
    (left, right)
}

fn keep_whole(arena: &mut NodeArena, node: NodeId) -> Split {
    if arena.is_vacant(node) {
        (None, None)
    } else {
        (Some(arena.deep_clone(node)), None)
    }
}

/// Split a run at a run-local offset.
///
/// Both fragments carry a copy of the run's properties.
pub fn split_run(arena: &mut NodeArena, run: NodeId, offset: usize) -> Split {
    split_node(arena, run, offset)
}

/// Split any node at a node-local offset.
pub fn split_node(arena: &mut NodeArena, node: NodeId, offset: usize) -> Split {
    if arena.children(node).is_empty() {
        return split_text(arena, node, offset);
    }

    let children = arena.children(node).to_vec();
    let mut cursor = 0usize;
    let pivot = children.iter().position(|&child| {
        let len = arena.text_length(child);
        if len > 0 && cursor + len >= offset {
            true
        } else {
            cursor += len;
            false
        }
    });

    let Some(pivot) = pivot else {
        return keep_whole(arena, node);
    };

    let (pivot_left, pivot_right) = split_node(arena, children[pivot], offset - cursor);

    let left = arena.shallow_clone(node);
    for &child in &children[..pivot] {
        let copy = arena.deep_clone(child);
        arena.append_child(left, copy);
    }
    if let Some(fragment) = pivot_left {
        arena.append_child(left, fragment);
    }

    let right = arena.shallow_clone(node);
    if let Some(fragment) = pivot_right {
        arena.append_child(right, fragment);
    }
    for &child in &children[pivot + 1..] {
        let copy = arena.deep_clone(child);
        arena.append_child(right, copy);
    }

    let left = (!arena.is_vacant(left)).then_some(left);
    let right = (!arena.is_vacant(right)).then_some(right);
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatting::Formatting;
    use crate::node::TextTag;
    use crate::text::flatten_text;

    fn leaf(arena: &mut NodeArena, value: &str) -> NodeId {
        arena.alloc(NodeKind::Text {
            value: value.to_string(),
            tag: TextTag::Live,
            preserve_space: false,
        })
    }

    fn joined(arena: &NodeArena, split: Split) -> String {
        let mut out = String::new();
        for node in [split.0, split.1].into_iter().flatten() {
            out.push_str(&flatten_text(arena, node));
        }
        out
    }

    #[test]
    fn test_split_text_every_offset_reproduces_original() {
        let mut arena = NodeArena::new();
        let t = leaf(&mut arena, "héllo wörld");
        for k in 0..=11 {
            let split = split_text(&mut arena, t, k);
            assert_eq!(joined(&arena, split), "héllo wörld", "offset {k}");
        }
    }

    #[test]
    fn test_split_text_omits_empty_sides() {
        let mut arena = NodeArena::new();
        let t = leaf(&mut arena, "abc");
        assert!(split_text(&mut arena, t, 0).0.is_none());
        assert!(split_text(&mut arena, t, 3).1.is_none());
    }

    #[test]
    fn test_split_text_flags_whitespace_edges() {
        let mut arena = NodeArena::new();
        let t = leaf(&mut arena, "hello world");
        let (left, right) = split_text(&mut arena, t, 6);

        let NodeKind::Text { preserve_space, .. } = arena.kind(left.unwrap()) else {
            panic!("expected text");
        };
        assert!(*preserve_space);
        let NodeKind::Text { preserve_space, .. } = arena.kind(right.unwrap()) else {
            panic!("expected text");
        };
        assert!(!*preserve_space);
    }

    #[test]
    fn test_tab_is_atomic() {
        let mut arena = NodeArena::new();
        let tab = arena.alloc(NodeKind::Tab);
        let (left, right) = split_text(&mut arena, tab, 0);
        assert!(left.is_none() && right.is_some());
        let (left, right) = split_text(&mut arena, tab, 1);
        assert!(left.is_some() && right.is_none());
    }

    #[test]
    fn test_split_run_duplicates_properties() {
        let mut arena = NodeArena::new();
        let bold = Formatting::new().with_bold(true);
        let run = arena.alloc(NodeKind::Run {
            formatting: Some(bold.clone()),
        });
        let a = leaf(&mut arena, "ab");
        let tab = arena.alloc(NodeKind::Tab);
        let c = leaf(&mut arena, "cd");
        arena.append_child(run, a);
        arena.append_child(run, tab);
        arena.append_child(run, c);

        for k in 0..=5 {
            let split = split_run(&mut arena, run, k);
            assert_eq!(joined(&arena, split), "ab\tcd", "offset {k}");
            for side in [split.0, split.1].into_iter().flatten() {
                assert_eq!(
                    arena.kind(side),
                    &NodeKind::Run {
                        formatting: Some(bold.clone())
                    }
                );
            }
        }

        let (left, right) = split_run(&mut arena, run, 3);
        assert_eq!(flatten_text(&arena, left.unwrap()), "ab\t");
        assert_eq!(flatten_text(&arena, right.unwrap()), "cd");

        let (left, right) = split_run(&mut arena, run, 2);
        assert_eq!(flatten_text(&arena, left.unwrap()), "ab");
        assert_eq!(flatten_text(&arena, right.unwrap()), "\tcd");
    }

    #[test]
    fn test_split_run_keeps_drawing_on_empty_side() {
        let mut arena = NodeArena::new();
        let run = arena.alloc(NodeKind::Run { formatting: None });
        let drawing = arena.alloc(NodeKind::Drawing {
            id: 9,
            name: "logo".to_string(),
        });
        let text = leaf(&mut arena, "xy");
        arena.append_child(run, drawing);
        arena.append_child(run, text);

        let (left, right) = split_run(&mut arena, run, 0);
        let left = left.expect("drawing keeps the left side alive");
        assert!(arena.contains_drawing(left));
        assert_eq!(arena.text_length(left), 0);
        assert_eq!(flatten_text(&arena, right.unwrap()), "xy");
    }
}
