//! Text helpers shared by the locator, splitter and edit engine.

use crate::formatting::Formatting;
use crate::node::{NodeArena, NodeId, NodeKind, TextTag};

/// Length contribution of a single node: text leaves count their characters,
/// tabs and breaks count one, everything else counts zero.
pub fn node_text_length(arena: &NodeArena, node: NodeId) -> usize {
    arena.kind(node).leaf_length()
}

/// Plain text of a subtree, struck text included (tabs become `\t`, breaks `\n`).
///
/// Struck text stays in the output because it is still length-counted: an
/// offset into this string is always an offset the locator accepts.
pub fn flatten_text(arena: &NodeArena, node: NodeId) -> String {
    let mut out = String::new();
    push_leaf_text(arena, node, &mut out);
    for id in arena.descendants(node) {
        push_leaf_text(arena, id, &mut out);
    }
    out
}

fn push_leaf_text(arena: &NodeArena, node: NodeId, out: &mut String) {
    match arena.kind(node) {
        NodeKind::Text { value, .. } => out.push_str(value),
        NodeKind::Tab => out.push('\t'),
        NodeKind::Break => out.push('\n'),
        _ => {}
    }
}

/// Whether a text leaf must be flagged as space-preserving.
pub fn needs_preserve_space(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

/// Build fresh detached runs for literal input.
///
/// Plain characters are gathered into text runs; every `\t` and `\n` becomes a
/// run of its own holding a tab or a break. Each run gets a copy of
/// `formatting`.
pub fn format_input(
    arena: &mut NodeArena,
    text: &str,
    formatting: Option<&Formatting>,
) -> Vec<NodeId> {
    let mut runs = Vec::new();
    let mut pending = String::new();

    let new_run = |arena: &mut NodeArena, leaf: NodeKind| {
        let run = arena.alloc(NodeKind::Run {
            formatting: formatting.cloned(),
        });
        let leaf = arena.alloc(leaf);
        arena.append_child(run, leaf);
        run
    };

    for ch in text.chars() {
        let atomic = match ch {
            '\t' => NodeKind::Tab,
            '\n' => NodeKind::Break,
            _ => {
                pending.push(ch);
                continue;
            }
        };
        if !pending.is_empty() {
            let leaf = text_leaf(std::mem::take(&mut pending));
            runs.push(new_run(arena, leaf));
        }
        runs.push(new_run(arena, atomic));
    }
    if !pending.is_empty() {
        runs.push(new_run(arena, text_leaf(pending)));
    }

    runs
}

fn text_leaf(value: String) -> NodeKind {
    NodeKind::Text {
        preserve_space: needs_preserve_space(&value),
        value,
        tag: TextTag::Live,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_input_splits_tabs_and_breaks() {
        let mut arena = NodeArena::new();
        let runs = format_input(&mut arena, "ab\tc\nd", None);
        assert_eq!(runs.len(), 5);

        let texts: Vec<String> = runs.iter().map(|&r| flatten_text(&arena, r)).collect();
        assert_eq!(texts, vec!["ab", "\t", "c", "\n", "d"]);
        assert!(matches!(arena.kind(arena.children(runs[1])[0]), NodeKind::Tab));
        assert!(matches!(arena.kind(arena.children(runs[3])[0]), NodeKind::Break));
    }

    #[test]
    fn test_format_input_copies_formatting() {
        let mut arena = NodeArena::new();
        let italic = Formatting::new().with_italic(true);
        let runs = format_input(&mut arena, "x\ty", Some(&italic));
        for run in runs {
            assert_eq!(
                arena.kind(run),
                &NodeKind::Run {
                    formatting: Some(italic.clone())
                }
            );
        }
    }

    #[test]
    fn test_format_input_empty() {
        let mut arena = NodeArena::new();
        assert!(format_input(&mut arena, "", None).is_empty());
    }

    #[test]
    fn test_preserve_space_detection() {
        assert!(needs_preserve_space(" lead"));
        assert!(needs_preserve_space("trail "));
        assert!(needs_preserve_space(" "));
        assert!(!needs_preserve_space("in side"));
        assert!(!needs_preserve_space(""));
    }

    #[test]
    fn test_flatten_and_leaf_length_agree() {
        let mut arena = NodeArena::new();
        let paragraph = arena.alloc(NodeKind::Paragraph);
        for run in format_input(&mut arena, "héllo\tworld\n!", None) {
            arena.append_child(paragraph, run);
        }
        let text = flatten_text(&arena, paragraph);
        let summed: usize = arena
            .descendants(paragraph)
            .into_iter()
            .map(|id| node_text_length(&arena, id))
            .sum();
        assert_eq!(text.chars().count(), summed);
        assert_eq!(summed, arena.text_length(paragraph));
    }
}
