//! Document model
//!
//! A [`Document`] owns the node arena, the body root, the marker id allocator
//! and the capabilities used to stamp new revisions. Everything the edit
//! engine reports back (run projections, paragraph spans, bookmark offsets) is
//! derived from the tree on each call and goes stale after the next mutation.

use crate::error::EditError;
use crate::formatting::Formatting;
use crate::ids::IdAllocator;
use crate::node::{NodeArena, NodeId, NodeKind, TextTag};
use crate::revision::{
    AuthorProvider, Clock, EnvAuthor, RevisionKind, RevisionMeta, SystemClock, retag,
    truncate_to_minute,
};
use crate::text::{flatten_text, format_input};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Snapshot of one run inside a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    /// The run node.
    pub id: NodeId,
    /// Paragraph-local offset of the first character.
    pub start: usize,
    /// Paragraph-local offset one past the last character.
    pub end: usize,
    /// Flattened text, struck text included.
    pub text: String,
    /// Run properties, if the run carries any.
    pub formatting: Option<Formatting>,
    /// Kind of the nearest enclosing revision wrapper.
    pub revision: Option<RevisionKind>,
}

/// Snapshot of one revision wrapper inside a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionInfo {
    /// The wrapper node.
    pub id: NodeId,
    /// Insertion or deletion.
    pub kind: RevisionKind,
    /// Author, date and revision id.
    pub meta: RevisionMeta,
    /// Paragraph-local offset of the first wrapped character.
    pub start: usize,
    /// Flattened wrapped text.
    pub text: String,
}

/// Document-global character span of a paragraph.
///
/// Spans are contiguous: a paragraph starts where the previous one ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphSpan {
    /// The paragraph.
    pub paragraph: NodeId,
    /// Global offset of the first character.
    pub start: usize,
    /// Global offset one past the last character.
    pub end: usize,
}

/// A bookmark with its document-global position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkInfo {
    /// Marker id.
    pub id: u32,
    /// Bookmark name.
    pub name: String,
    /// Paragraph holding the bookmark start.
    pub paragraph: NodeId,
    /// Global offset of the bookmark start.
    pub offset: usize,
}

/// A revision-trackable word-processing document.
pub struct Document {
    pub(crate) arena: NodeArena,
    pub(crate) body: NodeId,
    pub(crate) ids: IdAllocator,
    pub(crate) next_revision_id: u32,
    author: Arc<dyn AuthorProvider>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.arena.len())
            .field("body", &self.body)
            .field("next_revision_id", &self.next_revision_id)
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding a single empty paragraph.
    pub fn new() -> Self {
        let mut doc = Self::bare();
        doc.append_paragraph("");
        doc
    }

    /// A document with one body paragraph per item.
    ///
    /// An empty iterator still produces one empty paragraph.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut doc = Self::bare();
        for text in paragraphs {
            doc.append_paragraph(text.as_ref());
        }
        if doc.paragraphs().is_empty() {
            doc.append_paragraph("");
        }
        doc
    }

    /// A body with no content at all; callers must add a paragraph.
    pub(crate) fn bare() -> Self {
        let mut arena = NodeArena::new();
        let body = arena.alloc(NodeKind::Body);
        Self {
            arena,
            body,
            ids: IdAllocator::new(),
            next_revision_id: 1,
            author: Arc::new(EnvAuthor),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace both revision capabilities.
    pub fn with_capabilities(
        mut self,
        author: Arc<dyn AuthorProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.author = author;
        self.clock = clock;
        self
    }

    /// Change how the author of new revisions is resolved.
    pub fn set_author_provider(&mut self, author: Arc<dyn AuthorProvider>) {
        self.author = author;
    }

    /// Change the clock used to date new revisions.
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Read-only access to the node tree.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Root of the main story.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Returns `true` if `id` is reachable from the body.
    pub fn contains(&self, id: NodeId) -> bool {
        if id == self.body {
            return true;
        }
        self.arena.get(id).is_some() && self.arena.ancestors(id).any(|a| a == self.body)
    }

    /// Validate that `id` is a paragraph attached to this document.
    pub(crate) fn paragraph(&self, id: NodeId) -> Result<NodeId, EditError> {
        let node = self.arena.get(id).ok_or(EditError::NodeNotFound(id))?;
        if !node.kind().is_paragraph() {
            return Err(EditError::NotAParagraph(id));
        }
        if !self.contains(id) {
            return Err(EditError::Detached(id));
        }
        Ok(id)
    }

    fn attached(&self, id: NodeId) -> Result<&NodeKind, EditError> {
        let node = self.arena.get(id).ok_or(EditError::NodeNotFound(id))?;
        if !self.contains(id) {
            return Err(EditError::Detached(id));
        }
        Ok(node.kind())
    }

    // ---------------------------------------------------------------------
    // Stories and tables

    /// Every paragraph in document order, table cells included.
    pub fn paragraphs(&self) -> Vec<NodeId> {
        self.arena
            .descendants(self.body)
            .into_iter()
            .filter(|&id| self.arena.kind(id).is_paragraph())
            .collect()
    }

    fn new_paragraph(&mut self, text: &str) -> NodeId {
        let paragraph = self.arena.alloc(NodeKind::Paragraph);
        for run in format_input(&mut self.arena, text, None) {
            self.arena.append_child(paragraph, run);
        }
        paragraph
    }

    /// Append a paragraph to the body.
    pub fn append_paragraph(&mut self, text: &str) -> NodeId {
        let paragraph = self.new_paragraph(text);
        self.arena.append_child(self.body, paragraph);
        paragraph
    }

    /// Insert a new paragraph right after `paragraph`, in the same story.
    pub fn insert_paragraph_after(
        &mut self,
        paragraph: NodeId,
        text: &str,
    ) -> Result<NodeId, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let story = self
            .arena
            .parent(paragraph)
            .ok_or(EditError::Detached(paragraph))?;
        let position = self
            .arena
            .position_in_parent(paragraph)
            .ok_or(EditError::Detached(paragraph))?;
        let created = self.new_paragraph(text);
        self.arena.insert_child(story, position + 1, created);
        Ok(created)
    }

    /// Detach a paragraph from its story.
    ///
    /// A story must keep at least one paragraph.
    pub fn remove_paragraph(&mut self, paragraph: NodeId) -> Result<(), EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let story = self
            .arena
            .parent(paragraph)
            .ok_or(EditError::Detached(paragraph))?;
        let siblings = self
            .arena
            .children(story)
            .iter()
            .filter(|&&c| self.arena.kind(c).is_paragraph())
            .count();
        if siblings <= 1 {
            return Err(EditError::LastParagraph(paragraph));
        }
        self.arena.detach(paragraph);
        tracing::debug!(%paragraph, "removed paragraph");
        Ok(())
    }

    /// Append a `rows` x `cols` table to the body; each cell holds one empty paragraph.
    pub fn append_table(&mut self, rows: usize, cols: usize) -> NodeId {
        let table = self.arena.alloc(NodeKind::Table);
        for _ in 0..rows {
            let row = self.arena.alloc(NodeKind::TableRow);
            for _ in 0..cols {
                let cell = self.arena.alloc(NodeKind::TableCell);
                let paragraph = self.new_paragraph("");
                self.arena.append_child(cell, paragraph);
                self.arena.append_child(row, cell);
            }
            self.arena.append_child(table, row);
        }
        self.arena.append_child(self.body, table);
        table
    }

    /// Cell at `row`, `col` of `table`.
    pub fn table_cell(&self, table: NodeId, row: usize, col: usize) -> Result<NodeId, EditError> {
        if !matches!(self.attached(table)?, NodeKind::Table) {
            return Err(EditError::InvalidContainer(table));
        }
        let rows = self.arena.children(table);
        let row_id = *rows.get(row).ok_or(EditError::OutOfRange {
            index: row,
            len: rows.len(),
        })?;
        let cells = self.arena.children(row_id);
        cells.get(col).copied().ok_or(EditError::OutOfRange {
            index: col,
            len: cells.len(),
        })
    }

    /// Paragraphs of a table cell.
    pub fn cell_paragraphs(&self, cell: NodeId) -> Result<Vec<NodeId>, EditError> {
        if !matches!(self.attached(cell)?, NodeKind::TableCell) {
            return Err(EditError::InvalidContainer(cell));
        }
        Ok(self
            .arena
            .children(cell)
            .iter()
            .copied()
            .filter(|&c| self.arena.kind(c).is_paragraph())
            .collect())
    }

    /// Append a paragraph to a table cell.
    pub fn append_cell_paragraph(&mut self, cell: NodeId, text: &str) -> Result<NodeId, EditError> {
        if !matches!(self.attached(cell)?, NodeKind::TableCell) {
            return Err(EditError::InvalidContainer(cell));
        }
        let paragraph = self.new_paragraph(text);
        self.arena.append_child(cell, paragraph);
        Ok(paragraph)
    }

    // ---------------------------------------------------------------------
    // Building inline content

    /// Append runs holding `text` to a paragraph, revision wrapper, hyperlink or field.
    ///
    /// Text appended inside a deletion is struck. Returns the new runs.
    pub fn push_run(
        &mut self,
        parent: NodeId,
        text: &str,
        formatting: Option<&Formatting>,
    ) -> Result<Vec<NodeId>, EditError> {
        if !self.attached(parent)?.holds_runs() {
            return Err(EditError::InvalidContainer(parent));
        }
        let struck = std::iter::once(parent)
            .chain(self.arena.ancestors(parent))
            .any(|id| self.arena.kind(id).revision_kind() == Some(RevisionKind::Deletion));

        let runs = format_input(&mut self.arena, text, formatting);
        for &run in &runs {
            self.arena.append_child(parent, run);
            if struck {
                retag(&mut self.arena, run, TextTag::Struck);
            }
        }
        Ok(runs)
    }

    /// Append an empty revision wrapper to a paragraph, stamped with the
    /// current author and time. Fill it with [`Document::push_run`].
    pub fn push_revision(
        &mut self,
        paragraph: NodeId,
        kind: RevisionKind,
    ) -> Result<NodeId, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let meta = self.new_revision_meta();
        let wrapper = self.arena.alloc(NodeKind::Revision { kind, meta });
        self.arena.append_child(paragraph, wrapper);
        Ok(wrapper)
    }

    // ---------------------------------------------------------------------
    // Read projections

    /// Flattened text of a paragraph, struck text included.
    pub fn paragraph_text(&self, paragraph: NodeId) -> Result<String, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        Ok(flatten_text(&self.arena, paragraph))
    }

    /// Character length of a paragraph, struck text included.
    pub fn paragraph_len(&self, paragraph: NodeId) -> Result<usize, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        Ok(self.arena.text_length(paragraph))
    }

    /// Flattened text of every paragraph, in document order.
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs()
            .into_iter()
            .map(|p| flatten_text(&self.arena, p))
            .collect()
    }

    /// Runs of a paragraph with their paragraph-local spans.
    pub fn runs(&self, paragraph: NodeId) -> Result<Vec<RunInfo>, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let mut cursor = 0;
        let mut out = Vec::new();
        for id in self.arena.descendants(paragraph) {
            let kind = self.arena.kind(id);
            if let NodeKind::Run { formatting } = kind {
                let len = self.arena.text_length(id);
                out.push(RunInfo {
                    id,
                    start: cursor,
                    end: cursor + len,
                    text: flatten_text(&self.arena, id),
                    formatting: formatting.clone(),
                    revision: self.enclosing_revision(paragraph, id),
                });
            }
            cursor += kind.leaf_length();
        }
        Ok(out)
    }

    /// Revision wrappers of a paragraph in document order.
    pub fn revisions(&self, paragraph: NodeId) -> Result<Vec<RevisionInfo>, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let mut cursor = 0;
        let mut out = Vec::new();
        for id in self.arena.descendants(paragraph) {
            let node = self.arena.kind(id);
            if let NodeKind::Revision { kind, meta } = node {
                out.push(RevisionInfo {
                    id,
                    kind: *kind,
                    meta: meta.clone(),
                    start: cursor,
                    text: flatten_text(&self.arena, id),
                });
            }
            cursor += node.leaf_length();
        }
        Ok(out)
    }

    fn enclosing_revision(&self, paragraph: NodeId, node: NodeId) -> Option<RevisionKind> {
        self.arena
            .ancestors(node)
            .take_while(|&a| a != paragraph)
            .find_map(|a| self.arena.kind(a).revision_kind())
    }

    /// Global spans of every paragraph, recomputed from the tree.
    pub fn paragraph_spans(&self) -> Vec<ParagraphSpan> {
        let mut start = 0;
        self.paragraphs()
            .into_iter()
            .map(|paragraph| {
                let end = start + self.arena.text_length(paragraph);
                let span = ParagraphSpan {
                    paragraph,
                    start,
                    end,
                };
                start = end;
                span
            })
            .collect()
    }

    /// Every bookmark with the global offset of its start marker.
    pub fn bookmarks(&self) -> Vec<BookmarkInfo> {
        let mut out = Vec::new();
        for span in self.paragraph_spans() {
            let mut offset = span.start;
            for node in self.arena.descendants(span.paragraph) {
                let kind = self.arena.kind(node);
                if let NodeKind::BookmarkStart { id, name } = kind {
                    out.push(BookmarkInfo {
                        id: *id,
                        name: name.clone(),
                        paragraph: span.paragraph,
                        offset,
                    });
                }
                offset += kind.leaf_length();
            }
        }
        out
    }

    // ---------------------------------------------------------------------
    // Ids and revision stamps

    /// Every bookmark and drawing id currently in the document.
    pub(crate) fn marker_ids(&self) -> Vec<u32> {
        self.arena
            .descendants(self.body)
            .into_iter()
            .filter_map(|id| match self.arena.kind(id) {
                NodeKind::BookmarkStart { id, .. }
                | NodeKind::BookmarkEnd { id }
                | NodeKind::Drawing { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Fresh bookmark/drawing id.
    ///
    /// Safe to call from several threads holding `&Document`.
    pub fn next_id(&self) -> u32 {
        self.ids.next_id(|| self.marker_ids())
    }

    /// The shared id allocator.
    pub fn id_allocator(&self) -> &IdAllocator {
        &self.ids
    }

    pub(crate) fn next_revision_id(&mut self) -> u32 {
        let id = self.next_revision_id;
        self.next_revision_id += 1;
        id
    }

    /// Current time truncated to the minute.
    pub(crate) fn revision_date(&self) -> DateTime<Utc> {
        truncate_to_minute(self.clock.now())
    }

    pub(crate) fn new_revision_meta(&mut self) -> RevisionMeta {
        RevisionMeta {
            id: self.next_revision_id(),
            author: self.author.current_author(),
            date: self.revision_date(),
        }
    }
}
