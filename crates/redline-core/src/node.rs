//! Node model
//!
//! A document is a tree of typed nodes stored in a flat arena. Nodes are
//! addressed by [`NodeId`] and parent links are stored as ids, so splitting
//! and splicing only rebinds indices.
//!
//! Detached nodes are never reused: an id stays valid (and keeps pointing at
//! the same, now unreachable, node) until the arena is dropped.

use crate::formatting::Formatting;
use crate::revision::{RevisionKind, RevisionMeta};
use std::fmt;

/// Stable index of a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a text leaf is current text or text removed under revision tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextTag {
    /// Ordinary text (`w:t`).
    Live,
    /// Logically deleted text that is still present and length-counted (`w:delText`).
    Struck,
}

/// Where a hyperlink points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperlinkTarget {
    /// A bookmark name inside the same document.
    Anchor(String),
    /// A relationship id resolved by the package layer.
    Relationship(String),
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of the main story.
    Body,
    /// A table; children are rows.
    Table,
    /// A table row; children are cells.
    TableRow,
    /// A table cell; children are paragraphs.
    TableCell,
    /// A paragraph; children are inline content.
    Paragraph,
    /// A span of leaves sharing one formatting fragment.
    Run {
        /// Run properties, `None` when the run carries no fragment at all.
        formatting: Option<Formatting>,
    },
    /// Literal or struck text.
    Text {
        /// The characters of this leaf.
        value: String,
        /// Live or struck.
        tag: TextTag,
        /// Leading/trailing whitespace must survive rendering.
        preserve_space: bool,
    },
    /// A tab character, one offset wide.
    Tab,
    /// A line break, one offset wide.
    Break,
    /// A tracked insertion or deletion wrapping runs.
    Revision {
        /// Insertion or deletion.
        kind: RevisionKind,
        /// Author, date and id.
        meta: RevisionMeta,
    },
    /// A hyperlink wrapping runs.
    Hyperlink {
        /// Link destination.
        target: HyperlinkTarget,
    },
    /// A simple field (for example a page number) wrapping its cached result runs.
    Field {
        /// Field instruction such as ` PAGE \* MERGEFORMAT `.
        instruction: String,
    },
    /// Start of a bookmark range.
    BookmarkStart {
        /// Marker id shared with the matching end.
        id: u32,
        /// Bookmark name.
        name: String,
    },
    /// End of a bookmark range.
    BookmarkEnd {
        /// Marker id of the matching start.
        id: u32,
    },
    /// An inline picture anchored inside a run.
    Drawing {
        /// Drawing-properties marker id.
        id: u32,
        /// Picture name.
        name: String,
    },
}

impl NodeKind {
    /// Length contributed by this node alone, ignoring its children.
    pub fn leaf_length(&self) -> usize {
        match self {
            NodeKind::Text { value, .. } => value.chars().count(),
            NodeKind::Tab | NodeKind::Break => 1,
            _ => 0,
        }
    }

    /// Zero-width content that must not be dropped when a fragment collapses.
    pub fn is_anchored(&self) -> bool {
        matches!(
            self,
            NodeKind::BookmarkStart { .. } | NodeKind::BookmarkEnd { .. } | NodeKind::Drawing { .. }
        )
    }

    /// Returns the revision kind if this is a revision wrapper.
    pub fn revision_kind(&self) -> Option<RevisionKind> {
        match self {
            NodeKind::Revision { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns `true` for runs.
    pub fn is_run(&self) -> bool {
        matches!(self, NodeKind::Run { .. })
    }

    /// Returns `true` for paragraphs.
    pub fn is_paragraph(&self) -> bool {
        matches!(self, NodeKind::Paragraph)
    }

    /// Nodes that may hold inline content (runs and their wrappers).
    pub fn holds_runs(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Revision { .. }
                | NodeKind::Hyperlink { .. }
                | NodeKind::Field { .. }
        )
    }

    /// Nodes that hold paragraphs.
    pub fn is_story(&self) -> bool {
        matches!(self, NodeKind::Body | NodeKind::TableCell)
    }
}

/// A node together with its tree links.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Node payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Parent id, `None` for roots and detached nodes.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered child ids.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Flat storage for every node of a document.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of nodes ever allocated (attached or not).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node, `None` if the id was not issued by this arena.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node for an id issued by this arena.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Payload of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub(crate) fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Unlink a node from its parent. The subtree itself is left intact.
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.index()].parent.take() else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&c| c != id);
    }

    /// Put `replacements` where `id` sits in its parent and detach `id`.
    ///
    /// Does nothing if `id` has no parent.
    pub(crate) fn replace(&mut self, id: NodeId, replacements: &[NodeId]) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let Some(position) = self.position_in_parent(id) else {
            return;
        };
        for &node in replacements {
            self.detach(node);
            self.nodes[node.index()].parent = Some(parent);
        }
        self.nodes[parent.index()]
            .children
            .splice(position..=position, replacements.iter().copied());
        self.nodes[id.index()].parent = None;
    }

    /// Index of a node among its siblings.
    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Copy a node's payload into a new detached node without children.
    pub(crate) fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        self.alloc(kind)
    }

    /// Copy a whole subtree into new detached nodes.
    pub(crate) fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.shallow_clone(id);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// All descendants in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Walk from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.parent(id),
        }
    }

    /// Total text length of a subtree: the sum of every leaf's length.
    pub fn text_length(&self, id: NodeId) -> usize {
        self.kind(id).leaf_length()
            + self
                .children(id)
                .iter()
                .map(|&c| self.text_length(c))
                .sum::<usize>()
    }

    /// A subtree with no text and no anchored zero-width content.
    pub fn is_vacant(&self, id: NodeId) -> bool {
        self.text_length(id) == 0
            && !self.kind(id).is_anchored()
            && !self
                .descendants(id)
                .into_iter()
                .any(|d| self.kind(d).is_anchored())
    }

    /// Returns `true` if the subtree contains a drawing.
    pub fn contains_drawing(&self, id: NodeId) -> bool {
        self.descendants(id)
            .into_iter()
            .any(|d| matches!(self.kind(d), NodeKind::Drawing { .. }))
    }
}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors<'a> {
    arena: &'a NodeArena,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.parent(current);
        Some(current)
    }
}
