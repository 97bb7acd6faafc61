//! Offset locator
//!
//! Maps a container-local character offset to the run that covers it. The
//! walk recomputes every length from the tree on each call; nothing is cached,
//! so an offset is never resolved against a stale layout.

use crate::error::EditError;
use crate::node::{NodeArena, NodeId};

/// Which side of a boundary an offset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditBias {
    /// Offsets in `[0, len]`; an offset on a boundary belongs to the run that
    /// ends there, so inserting at the very end appends to the last run.
    Insert,
    /// Offsets in `[0, len)`; an offset on a boundary belongs to the run that
    /// starts there, i.e. the character at that offset.
    Delete,
}

impl EditBias {
    fn reaches(self, cumulative: usize, index: usize) -> bool {
        match self {
            EditBias::Insert => cumulative >= index,
            EditBias::Delete => cumulative > index,
        }
    }
}

/// A run found by [`locate_run`], with offsets local to the searched container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedRun {
    /// The run covering the offset.
    pub run: NodeId,
    /// Offset of the run's first character.
    pub start: usize,
    /// Offset one past the run's last character.
    pub end: usize,
    /// The leaf inside the run covering the offset.
    pub leaf: NodeId,
    /// Offset of the leaf's first character.
    pub leaf_start: usize,
}

/// Validate `index` against the container length for the given bias.
///
/// Returns the container length on success.
pub fn check_offset(
    arena: &NodeArena,
    container: NodeId,
    index: usize,
    bias: EditBias,
) -> Result<usize, EditError> {
    let len = arena.text_length(container);
    let valid = match bias {
        EditBias::Insert => index <= len,
        EditBias::Delete => index < len,
    };
    if valid {
        Ok(len)
    } else {
        Err(EditError::OutOfRange { index, len })
    }
}

/// Find the run whose span contains `index`.
///
/// Returns `Ok(None)` only when the container holds no run with text, which
/// for a valid offset means the container is empty.
pub fn locate_run(
    arena: &NodeArena,
    container: NodeId,
    index: usize,
    bias: EditBias,
) -> Result<Option<LocatedRun>, EditError> {
    check_offset(arena, container, index, bias)?;
    let mut count = 0;
    let located = walk(arena, container, index, bias, &mut count);
    if let Some(hit) = located {
        tracing::trace!(
            run = %hit.run,
            start = hit.start,
            end = hit.end,
            index,
            ?bias,
            "located run"
        );
    }
    Ok(located)
}

fn walk(
    arena: &NodeArena,
    node: NodeId,
    index: usize,
    bias: EditBias,
    count: &mut usize,
) -> Option<LocatedRun> {
    for &child in arena.children(node) {
        let len = arena.text_length(child);
        if len == 0 {
            continue;
        }
        let before = *count;
        if !bias.reaches(before + len, index) {
            *count += len;
            continue;
        }

        if arena.kind(child).is_run() {
            let (leaf, leaf_start) = locate_leaf(arena, child, before, index, bias);
            return Some(LocatedRun {
                run: child,
                start: before,
                end: before + len,
                leaf,
                leaf_start,
            });
        }

        if let Some(hit) = walk(arena, child, index, bias, count) {
            return Some(hit);
        }
        *count = before + len;
    }
    None
}

fn locate_leaf(
    arena: &NodeArena,
    run: NodeId,
    run_start: usize,
    index: usize,
    bias: EditBias,
) -> (NodeId, usize) {
    let mut cursor = run_start;
    for &leaf in arena.children(run) {
        let len = arena.text_length(leaf);
        if len > 0 && bias.reaches(cursor + len, index) {
            return (leaf, cursor);
        }
        cursor += len;
    }
    (run, run_start)
}

/// Offset of `target`'s first character within `container`.
pub fn offset_of(arena: &NodeArena, container: NodeId, target: NodeId) -> Option<usize> {
    let mut offset = 0;
    for id in arena.descendants(container) {
        if id == target {
            return Some(offset);
        }
        offset += arena.kind(id).leaf_length();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::text::format_input;

    /// Paragraph with runs "abc", "de", "f".
    fn paragraph(arena: &mut NodeArena) -> (NodeId, Vec<NodeId>) {
        let p = arena.alloc(NodeKind::Paragraph);
        let mut runs = Vec::new();
        for text in ["abc", "de", "f"] {
            let run = format_input(arena, text, None)[0];
            arena.append_child(p, run);
            runs.push(run);
        }
        (p, runs)
    }

    #[test]
    fn test_insert_bias_attaches_boundary_to_preceding_run() {
        let mut arena = NodeArena::new();
        let (p, runs) = paragraph(&mut arena);

        let hit = locate_run(&arena, p, 3, EditBias::Insert).unwrap().unwrap();
        assert_eq!(hit.run, runs[0]);
        assert_eq!((hit.start, hit.end), (0, 3));

        let hit = locate_run(&arena, p, 0, EditBias::Insert).unwrap().unwrap();
        assert_eq!(hit.run, runs[0]);

        let hit = locate_run(&arena, p, 6, EditBias::Insert).unwrap().unwrap();
        assert_eq!(hit.run, runs[2]);
        assert_eq!((hit.start, hit.end), (5, 6));
    }

    #[test]
    fn test_delete_bias_attaches_boundary_to_following_run() {
        let mut arena = NodeArena::new();
        let (p, runs) = paragraph(&mut arena);

        let hit = locate_run(&arena, p, 3, EditBias::Delete).unwrap().unwrap();
        assert_eq!(hit.run, runs[1]);
        assert_eq!((hit.start, hit.end), (3, 5));

        let hit = locate_run(&arena, p, 5, EditBias::Delete).unwrap().unwrap();
        assert_eq!(hit.run, runs[2]);
    }

    #[test]
    fn test_out_of_range() {
        let mut arena = NodeArena::new();
        let (p, _) = paragraph(&mut arena);

        assert_eq!(
            locate_run(&arena, p, 7, EditBias::Insert),
            Err(EditError::OutOfRange { index: 7, len: 6 })
        );
        assert_eq!(
            locate_run(&arena, p, 6, EditBias::Delete),
            Err(EditError::OutOfRange { index: 6, len: 6 })
        );
    }

    #[test]
    fn test_empty_container_has_no_run() {
        let mut arena = NodeArena::new();
        let p = arena.alloc(NodeKind::Paragraph);
        assert_eq!(locate_run(&arena, p, 0, EditBias::Insert), Ok(None));
        assert!(locate_run(&arena, p, 0, EditBias::Delete).is_err());
    }

    #[test]
    fn test_locates_runs_inside_containers() {
        let mut arena = NodeArena::new();
        let (p, _) = paragraph(&mut arena);
        let link = arena.alloc(NodeKind::Hyperlink {
            target: crate::node::HyperlinkTarget::Anchor("top".to_string()),
        });
        let inner = format_input(&mut arena, "xyz", None)[0];
        arena.append_child(link, inner);
        arena.insert_child(p, 1, link);

        let hit = locate_run(&arena, p, 4, EditBias::Delete).unwrap().unwrap();
        assert_eq!(hit.run, inner);
        assert_eq!((hit.start, hit.end), (3, 6));
        assert_eq!(offset_of(&arena, p, link), Some(3));
    }

    #[test]
    fn test_leaf_inside_run() {
        let mut arena = NodeArena::new();
        let p = arena.alloc(NodeKind::Paragraph);
        let run = arena.alloc(NodeKind::Run { formatting: None });
        let a = arena.alloc(NodeKind::Tab);
        let b = arena.alloc(NodeKind::Text {
            value: "xy".to_string(),
            tag: crate::node::TextTag::Live,
            preserve_space: false,
        });
        arena.append_child(run, a);
        arena.append_child(run, b);
        arena.append_child(p, run);

        let hit = locate_run(&arena, p, 1, EditBias::Delete).unwrap().unwrap();
        assert_eq!((hit.leaf, hit.leaf_start), (b, 1));
        let hit = locate_run(&arena, p, 1, EditBias::Insert).unwrap().unwrap();
        assert_eq!((hit.leaf, hit.leaf_start), (a, 0));
    }
}
