//! Paragraph search
//!
//! Searches run over a paragraph's flattened text (struck text included), so
//! every match range is directly usable as a paragraph-local edit offset.
//! Inputs and outputs are **character offsets**, never byte offsets.
//!
//! - literal search (escaped and compiled into a regex)
//! - regex search
//! - optional whole-word matching

use crate::document::Document;
use crate::error::EditError;
use crate::node::NodeId;
use crate::text::flatten_text;
use regex::{Regex, RegexBuilder};

/// Options that control how a pattern is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, letters must match case exactly.
    pub case_sensitive: bool,
    /// If `true`, a match must not touch a word character on either side.
    pub whole_word: bool,
    /// If `true`, the pattern is a regex; otherwise it is literal text.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// A match as a half-open character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl SearchMatch {
    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Char/byte offset table for one string.
#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    byte_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            byte_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.byte_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        text[start..].chars().next()
    }

    pub(crate) fn range(&self, start_byte: usize, end_byte: usize) -> SearchMatch {
        SearchMatch {
            start: self.byte_to_char(start_byte),
            end: self.byte_to_char(end_byte),
        }
    }
}

pub(crate) fn compile_search_regex(query: &str, options: SearchOptions) -> Result<Regex, EditError> {
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()
        .map_err(|err| EditError::InvalidPattern(err.to_string()))
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Whether `m` has no word character immediately before or after it.
pub(crate) fn is_whole_word(text: &str, index: &CharIndex, m: SearchMatch) -> bool {
    if m.is_empty() {
        return false;
    }
    let before = m
        .start
        .checked_sub(1)
        .and_then(|offset| index.char_at(text, offset));
    let after = index.char_at(text, m.end);
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Every non-empty occurrence of `query` in `text`, in order.
///
/// An empty query matches nothing.
pub fn find_all(
    text: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, EditError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let re = compile_search_regex(query, options)?;
    let index = CharIndex::new(text);
    Ok(re
        .find_iter(text)
        .map(|m| index.range(m.start(), m.end()))
        .filter(|m| !m.is_empty())
        .filter(|m| !options.whole_word || is_whole_word(text, &index, *m))
        .collect())
}

/// First occurrence of `query` at or after `from_char`.
pub fn find_next(
    text: &str,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>, EditError> {
    Ok(find_all(text, query, options)?
        .into_iter()
        .find(|m| m.start >= from_char))
}

impl Document {
    /// Occurrences of `query` in one paragraph, as paragraph-local ranges.
    pub fn find_in_paragraph(
        &self,
        paragraph: NodeId,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchMatch>, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        find_all(&flatten_text(&self.arena, paragraph), query, options)
    }

    /// Occurrences of `query` in every paragraph, tagged with their paragraph.
    ///
    /// Matches never cross paragraph boundaries.
    pub fn find_in_document(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<(NodeId, SearchMatch)>, EditError> {
        // Compile once up front so a bad pattern fails even in an empty document.
        compile_search_regex(query, options)?;
        let mut out = Vec::new();
        for paragraph in self.paragraphs() {
            let text = flatten_text(&self.arena, paragraph);
            out.extend(
                find_all(&text, query, options)?
                    .into_iter()
                    .map(|m| (paragraph, m)),
            );
        }
        Ok(out)
    }
}
