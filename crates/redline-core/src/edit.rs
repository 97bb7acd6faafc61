//! Edit engine
//!
//! Offset-addressed insertion and removal on paragraphs, with optional
//! revision tracking, plus placement of inline objects (hyperlinks, pictures,
//! page-number fields, bookmarks) at a character position.
//!
//! Every operation follows the same shape: validate the range against the
//! current tree, locate the run, split whatever node is cut, splice the
//! fragments back, and finally renumber marker ids so the duplicates produced
//! by splitting are resolved.

use crate::document::Document;
use crate::error::EditError;
use crate::formatting::Formatting;
use crate::locator::{EditBias, LocatedRun, locate_run, offset_of};
use crate::node::{HyperlinkTarget, NodeId, NodeKind};
use crate::revision::{RevisionKind, build_wrapper, split_wrapper, truncate_to_minute};
use crate::split::split_node;
use crate::text::format_input;

/// Instruction of the simple field inserted by [`Document::insert_page_number_field`].
pub const PAGE_FIELD_INSTRUCTION: &str = " PAGE \\* MERGEFORMAT ";

/// Where new inline content is spliced: the node to cut and its paragraph-local start.
type Anchor = (NodeId, usize);

impl Document {
    /// Insert `text` at `index` in `paragraph`.
    ///
    /// `\t` and `\n` become tabs and line breaks. When `track_changes` is set
    /// the new runs are wrapped in an insertion, unless they land in an
    /// insertion made in the same minute, which is extended instead.
    ///
    /// When `formatting` is supplied it is applied on top of the formatting
    /// of the run at `index`; otherwise the new text inherits that run's
    /// formatting.
    pub fn insert_text(
        &mut self,
        paragraph: NodeId,
        index: usize,
        text: &str,
        track_changes: bool,
        formatting: Option<&Formatting>,
    ) -> Result<(), EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let hit = locate_run(&self.arena, paragraph, index, EditBias::Insert)?;
        if text.is_empty() {
            return Ok(());
        }

        let formatting = self.inherited_formatting(hit.map(|h| h.run), formatting);
        let payload = format_input(&mut self.arena, text, formatting.as_ref());
        let anchor = hit.map(|h| (h.run, h.start));
        self.place_inline(paragraph, index, anchor, payload, track_changes)?;

        let renumbered = self.renumber_marker_ids();
        tracing::debug!(
            %paragraph,
            index,
            chars = text.chars().count(),
            track_changes,
            renumbered,
            "inserted text"
        );
        Ok(())
    }

    /// Remove `count` characters starting at `index` in `paragraph`.
    ///
    /// Untracked removal deletes the text. Tracked removal wraps it in a
    /// deletion and leaves the paragraph length unchanged; text that is
    /// already deleted is skipped. Emptied hyperlinks and fields are pruned.
    ///
    /// With `remove_empty_paragraph`, a paragraph left empty inside a table
    /// cell that holds other paragraphs is removed as well; body paragraphs
    /// are only ever emptied. Returns `true` if the paragraph was removed.
    pub fn remove_text(
        &mut self,
        paragraph: NodeId,
        index: usize,
        count: usize,
        track_changes: bool,
        remove_empty_paragraph: bool,
    ) -> Result<bool, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let len = self.arena.text_length(paragraph);
        let in_range = index.checked_add(count).is_some_and(|end| end <= len)
            && (count == 0 || index < len);
        if !in_range {
            return Err(EditError::InvalidRange {
                start: index,
                end: index.saturating_add(count),
                len,
            });
        }
        if count == 0 {
            return Ok(false);
        }

        let mut cursor = index;
        let mut remaining = count;
        while remaining > 0 {
            let Some(hit) = locate_run(&self.arena, paragraph, cursor, EditBias::Delete)? else {
                break;
            };

            let taken = match self.enclosing_wrapper(paragraph, hit.run) {
                Some(wrapper) => {
                    let start = offset_of(&self.arena, paragraph, wrapper)
                        .ok_or(EditError::Detached(wrapper))?;
                    let end = start + self.arena.text_length(wrapper);
                    let take = remaining.min(end - cursor);
                    let kind = self.arena.kind(wrapper).revision_kind();
                    if track_changes && kind == Some(RevisionKind::Deletion) {
                        tracing::trace!(%wrapper, take, "skipping text that is already deleted");
                        cursor += take;
                        remaining -= take;
                        continue;
                    }
                    self.cut(wrapper, cursor - start, take, track_changes);
                    take
                }
                None => {
                    let take = remaining.min(hit.end - cursor);
                    self.cut(hit.run, cursor - hit.start, take, track_changes);
                    take
                }
            };

            if track_changes {
                cursor += taken;
            }
            remaining -= taken;
        }

        self.prune_empty_containers(paragraph);
        let removed = remove_empty_paragraph && self.remove_if_empty_cell_paragraph(paragraph);
        let renumbered = self.renumber_marker_ids();
        tracing::debug!(
            %paragraph,
            index,
            count,
            track_changes,
            removed,
            renumbered,
            "removed text"
        );
        Ok(removed)
    }

    /// Insert a hyperlink showing `text` at `index`.
    ///
    /// The link text inherits the formatting of the run at `index`. Returns
    /// the hyperlink node.
    pub fn insert_hyperlink(
        &mut self,
        paragraph: NodeId,
        index: usize,
        text: &str,
        target: HyperlinkTarget,
        track_changes: bool,
    ) -> Result<NodeId, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let hit = locate_run(&self.arena, paragraph, index, EditBias::Insert)?;

        let formatting = self.inherited_formatting(hit.map(|h| h.run), None);
        let link = self.arena.alloc(NodeKind::Hyperlink { target });
        for run in format_input(&mut self.arena, text, formatting.as_ref()) {
            self.arena.append_child(link, run);
        }

        let anchor = hit.map(|h| self.object_anchor(paragraph, h)).transpose()?;
        self.place_inline(paragraph, index, anchor, vec![link], track_changes)?;
        self.renumber_marker_ids();
        tracing::debug!(%paragraph, index, %link, track_changes, "inserted hyperlink");
        Ok(link)
    }

    /// Insert an inline picture named `name` at `index`.
    ///
    /// The picture gets a fresh drawing-properties id, which is returned.
    pub fn insert_picture(
        &mut self,
        paragraph: NodeId,
        index: usize,
        name: &str,
        track_changes: bool,
    ) -> Result<u32, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let hit = locate_run(&self.arena, paragraph, index, EditBias::Insert)?;
        let id = self.next_id();

        let formatting = self.inherited_formatting(hit.map(|h| h.run), None);
        let run = self.arena.alloc(NodeKind::Run { formatting });
        let drawing = self.arena.alloc(NodeKind::Drawing {
            id,
            name: name.to_string(),
        });
        self.arena.append_child(run, drawing);

        let anchor = hit.map(|h| self.object_anchor(paragraph, h)).transpose()?;
        self.place_inline(paragraph, index, anchor, vec![run], track_changes)?;
        self.renumber_marker_ids();
        tracing::debug!(%paragraph, index, id, track_changes, "inserted picture");
        Ok(id)
    }

    /// Insert a page-number field at `index`. Its cached result is `1`.
    pub fn insert_page_number_field(
        &mut self,
        paragraph: NodeId,
        index: usize,
        track_changes: bool,
    ) -> Result<NodeId, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let hit = locate_run(&self.arena, paragraph, index, EditBias::Insert)?;

        let formatting = self.inherited_formatting(hit.map(|h| h.run), None);
        let field = self.arena.alloc(NodeKind::Field {
            instruction: PAGE_FIELD_INSTRUCTION.to_string(),
        });
        for run in format_input(&mut self.arena, "1", formatting.as_ref()) {
            self.arena.append_child(field, run);
        }

        let anchor = hit.map(|h| self.object_anchor(paragraph, h)).transpose()?;
        self.place_inline(paragraph, index, anchor, vec![field], track_changes)?;
        self.renumber_marker_ids();
        tracing::debug!(%paragraph, index, %field, track_changes, "inserted page field");
        Ok(field)
    }

    /// Append an empty bookmark named `name` at the end of `paragraph`.
    ///
    /// Returns the bookmark's marker id.
    pub fn append_bookmark(&mut self, paragraph: NodeId, name: &str) -> Result<u32, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let id = self.next_id();
        let start = self.arena.alloc(NodeKind::BookmarkStart {
            id,
            name: name.to_string(),
        });
        let end = self.arena.alloc(NodeKind::BookmarkEnd { id });
        self.arena.append_child(paragraph, start);
        self.arena.append_child(paragraph, end);
        tracing::debug!(%paragraph, id, name, "appended bookmark");
        Ok(id)
    }

    fn inherited_formatting(
        &self,
        run: Option<NodeId>,
        supplied: Option<&Formatting>,
    ) -> Option<Formatting> {
        let existing = run.and_then(|run| match self.arena.kind(run) {
            NodeKind::Run { formatting } => formatting.clone(),
            _ => None,
        });
        match (existing, supplied) {
            (Some(existing), Some(supplied)) => Some(existing.merged_with(supplied)),
            (None, Some(supplied)) => Some(supplied.clone()),
            (existing, None) => existing,
        }
    }

    /// Nearest revision wrapper between `node` and `paragraph`.
    fn enclosing_wrapper(&self, paragraph: NodeId, node: NodeId) -> Option<NodeId> {
        self.arena
            .ancestors(node)
            .take_while(|&a| a != paragraph)
            .find(|&a| self.arena.kind(a).revision_kind().is_some())
    }

    /// Inline objects never nest inside hyperlinks or fields: they cut the
    /// outermost such container around the run instead of the run itself.
    fn object_anchor(&self, paragraph: NodeId, hit: LocatedRun) -> Result<Anchor, EditError> {
        let outer = self
            .arena
            .ancestors(hit.run)
            .take_while(|&a| a != paragraph)
            .filter(|&a| {
                matches!(
                    self.arena.kind(a),
                    NodeKind::Hyperlink { .. } | NodeKind::Field { .. }
                )
            })
            .last();
        match outer {
            Some(container) => {
                let start = offset_of(&self.arena, paragraph, container)
                    .ok_or(EditError::Detached(container))?;
                Ok((container, start))
            }
            None => Ok((hit.run, hit.start)),
        }
    }

    /// Returns `true` if content inserted now may extend `wrapper` instead of
    /// getting an insertion of its own.
    fn joins_insertion(&self, wrapper: NodeId, track_changes: bool) -> bool {
        match self.arena.kind(wrapper) {
            NodeKind::Revision {
                kind: RevisionKind::Insertion,
                meta,
            } => track_changes && truncate_to_minute(meta.date) == self.revision_date(),
            _ => false,
        }
    }

    fn wrap_insertion(&mut self, payload: Vec<NodeId>, track_changes: bool) -> Vec<NodeId> {
        if !track_changes || payload.is_empty() {
            return payload;
        }
        let meta = self.new_revision_meta();
        vec![build_wrapper(
            &mut self.arena,
            RevisionKind::Insertion,
            meta,
            &payload,
        )]
    }

    /// Splice `payload` into `paragraph` at `index`.
    ///
    /// `anchor` is the node covering `index`, `None` when the paragraph has no
    /// text to cut and the payload is simply appended.
    fn place_inline(
        &mut self,
        paragraph: NodeId,
        index: usize,
        anchor: Option<Anchor>,
        payload: Vec<NodeId>,
        track_changes: bool,
    ) -> Result<(), EditError> {
        let Some((node, start)) = anchor else {
            for node in self.wrap_insertion(payload, track_changes) {
                self.arena.append_child(paragraph, node);
            }
            return Ok(());
        };

        match self.enclosing_wrapper(paragraph, node) {
            Some(wrapper) if self.joins_insertion(wrapper, track_changes) => {
                let (left, right) = split_node(&mut self.arena, node, index - start);
                self.splice(node, left, payload, right);
            }
            Some(wrapper) => {
                let wrapper_start = offset_of(&self.arena, paragraph, wrapper)
                    .ok_or(EditError::Detached(wrapper))?;
                let content = self.wrap_insertion(payload, track_changes);
                let (left, right) = split_wrapper(&mut self.arena, wrapper, index - wrapper_start);
                self.splice(wrapper, left, content, right);
            }
            None => {
                let content = self.wrap_insertion(payload, track_changes);
                let (left, right) = split_node(&mut self.arena, node, index - start);
                self.splice(node, left, content, right);
            }
        }
        Ok(())
    }

    fn splice(
        &mut self,
        original: NodeId,
        left: Option<NodeId>,
        middle: Vec<NodeId>,
        right: Option<NodeId>,
    ) {
        let parts: Vec<NodeId> = left.into_iter().chain(middle).chain(right).collect();
        self.arena.replace(original, &parts);
    }

    /// Cut `take` characters out of `node` starting at a node-local `offset`.
    ///
    /// Untracked, the cut text is dropped. Tracked, it is re-wrapped in a new
    /// deletion; when `node` is itself a revision wrapper, the deletion takes
    /// over the wrapped content.
    fn cut(&mut self, node: NodeId, offset: usize, take: usize, track_changes: bool) {
        let (left, rest) = split_node(&mut self.arena, node, offset);
        let (middle, right) = match rest {
            Some(rest) => split_node(&mut self.arena, rest, take),
            None => (None, None),
        };

        let mut deleted = Vec::new();
        if let Some(middle) = middle.filter(|_| track_changes) {
            let content = if self.arena.kind(middle).revision_kind().is_some() {
                self.arena.children(middle).to_vec()
            } else {
                vec![middle]
            };
            let meta = self.new_revision_meta();
            deleted.push(build_wrapper(
                &mut self.arena,
                RevisionKind::Deletion,
                meta,
                &content,
            ));
        }
        self.splice(node, left, deleted, right);
    }

    fn prune_empty_containers(&mut self, paragraph: NodeId) {
        for node in self.arena.descendants(paragraph).into_iter().rev() {
            let prunable = matches!(
                self.arena.kind(node),
                NodeKind::Hyperlink { .. } | NodeKind::Field { .. } | NodeKind::Revision { .. }
            );
            if prunable && self.arena.parent(node).is_some() && self.arena.is_vacant(node) {
                tracing::trace!(%node, "pruning empty container");
                self.arena.detach(node);
            }
        }
    }

    fn remove_if_empty_cell_paragraph(&mut self, paragraph: NodeId) -> bool {
        if self.arena.text_length(paragraph) > 0 || self.arena.contains_drawing(paragraph) {
            return false;
        }
        let Some(story) = self.arena.parent(paragraph) else {
            return false;
        };
        if !matches!(self.arena.kind(story), NodeKind::TableCell) {
            return false;
        }
        let siblings = self
            .arena
            .children(story)
            .iter()
            .filter(|&&c| self.arena.kind(c).is_paragraph())
            .count();
        if siblings <= 1 {
            return false;
        }
        self.arena.detach(paragraph);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(text: &str) -> (Document, NodeId) {
        let doc = Document::from_paragraphs([text]);
        let p = doc.paragraphs()[0];
        (doc, p)
    }

    #[test]
    fn test_insert_into_middle_of_run() {
        let (mut doc, p) = doc_with("hello world");
        doc.insert_text(p, 5, ",", false, None).unwrap();
        assert_eq!(doc.paragraph_text(p).unwrap(), "hello, world");
        assert_eq!(doc.runs(p).unwrap().len(), 3);
    }

    #[test]
    fn test_insert_range_checked_before_mutation() {
        let (mut doc, p) = doc_with("abc");
        let before = doc.arena().len();
        assert_eq!(
            doc.insert_text(p, 4, "x", true, None),
            Err(EditError::OutOfRange { index: 4, len: 3 })
        );
        assert_eq!(doc.arena().len(), before);
    }

    #[test]
    fn test_remove_range_checked_before_mutation() {
        let (mut doc, p) = doc_with("abc");
        assert_eq!(
            doc.remove_text(p, 2, 2, false, false),
            Err(EditError::InvalidRange {
                start: 2,
                end: 4,
                len: 3
            })
        );
        assert_eq!(
            doc.remove_text(p, 3, 0, false, false),
            Ok(false),
            "an empty removal at the end is allowed"
        );
        assert_eq!(doc.paragraph_text(p).unwrap(), "abc");
    }

    #[test]
    fn test_untracked_remove_across_runs() {
        let (mut doc, p) = doc_with("abc");
        doc.push_run(p, "def", Some(&Formatting::new().with_bold(true)))
            .unwrap();
        doc.remove_text(p, 1, 4, false, false).unwrap();
        assert_eq!(doc.paragraph_text(p).unwrap(), "af");
        let runs = doc.runs(p).unwrap();
        assert_eq!(runs[1].formatting, Some(Formatting::new().with_bold(true)));
    }

    #[test]
    fn test_page_field_and_hyperlink_placement() {
        let (mut doc, p) = doc_with("Page ");
        let field = doc.insert_page_number_field(p, 5, false).unwrap();
        assert_eq!(doc.paragraph_text(p).unwrap(), "Page 1");
        assert_eq!(doc.arena().parent(field), Some(p));

        let link = doc
            .insert_hyperlink(p, 0, "see ", HyperlinkTarget::Anchor("top".into()), false)
            .unwrap();
        assert_eq!(doc.paragraph_text(p).unwrap(), "see Page 1");
        assert_eq!(doc.arena().position_in_parent(link), Some(0));
    }

    #[test]
    fn test_hyperlink_inside_hyperlink_cuts_the_outer_link() {
        let (mut doc, p) = doc_with("");
        let outer = doc
            .insert_hyperlink(p, 0, "abcd", HyperlinkTarget::Relationship("rId1".into()), false)
            .unwrap();
        let inner = doc
            .insert_hyperlink(p, 2, "XY", HyperlinkTarget::Anchor("b".into()), false)
            .unwrap();
        assert_eq!(doc.paragraph_text(p).unwrap(), "abXYcd");
        assert_eq!(doc.arena().parent(inner), Some(p));
        assert_eq!(doc.arena().parent(outer), None, "outer link was split and replaced");
    }
}
