//! Marker id renumbering
//!
//! Splitting a node copies its payload onto both halves, so a split bookmark
//! range, drawing or revision wrapper leaves duplicate ids behind. This pass
//! walks the body in document order and gives every repeat a fresh id.

use crate::document::Document;
use crate::node::NodeKind;
use std::collections::{HashMap, HashSet, VecDeque};

impl Document {
    /// Restore uniqueness of bookmark, drawing and revision ids.
    ///
    /// The first occurrence of an id keeps it. A repeated bookmark start or
    /// drawing gets a fresh allocator id, and the matching bookmark end is
    /// rewritten to follow its start. A repeated revision id gets a fresh
    /// revision id. Returns the number of ids rewritten.
    pub fn renumber_marker_ids(&mut self) -> usize {
        let nodes = self.arena.descendants(self.body);

        let highest_revision = nodes
            .iter()
            .filter_map(|&id| match self.arena.kind(id) {
                NodeKind::Revision { meta, .. } => Some(meta.id),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        self.next_revision_id = self.next_revision_id.max(highest_revision + 1);

        let mut markers = HashSet::new();
        let mut revisions = HashSet::new();
        // Ids kept by a bookmark start, and those whose end has been seen.
        let mut kept_starts = HashSet::new();
        let mut closed = HashSet::new();
        let mut moved_ends: HashMap<u32, VecDeque<u32>> = HashMap::new();
        let mut rewritten = 0;

        for node in nodes {
            match self.arena.kind(node) {
                NodeKind::BookmarkStart { id, .. } => {
                    let id = *id;
                    if markers.insert(id) {
                        kept_starts.insert(id);
                        continue;
                    }
                    let fresh = self.next_id();
                    markers.insert(fresh);
                    moved_ends.entry(id).or_default().push_back(fresh);
                    if let NodeKind::BookmarkStart { id, .. } = self.arena.kind_mut(node) {
                        *id = fresh;
                    }
                    rewritten += 1;
                }
                NodeKind::BookmarkEnd { id } => {
                    let id = *id;
                    if kept_starts.contains(&id) && closed.insert(id) {
                        continue;
                    }
                    let Some(fresh) = moved_ends.get_mut(&id).and_then(VecDeque::pop_front) else {
                        continue;
                    };
                    if let NodeKind::BookmarkEnd { id } = self.arena.kind_mut(node) {
                        *id = fresh;
                    }
                    rewritten += 1;
                }
                NodeKind::Drawing { id, .. } => {
                    if markers.insert(*id) {
                        continue;
                    }
                    let fresh = self.next_id();
                    markers.insert(fresh);
                    if let NodeKind::Drawing { id, .. } = self.arena.kind_mut(node) {
                        *id = fresh;
                    }
                    rewritten += 1;
                }
                NodeKind::Revision { meta, .. } => {
                    if revisions.insert(meta.id) {
                        continue;
                    }
                    let fresh = self.next_revision_id();
                    revisions.insert(fresh);
                    if let NodeKind::Revision { meta, .. } = self.arena.kind_mut(node) {
                        meta.id = fresh;
                    }
                    rewritten += 1;
                }
                _ => {}
            }
        }

        if rewritten > 0 {
            tracing::debug!(rewritten, "renumbered duplicate marker ids");
        }
        rewritten
    }
}
