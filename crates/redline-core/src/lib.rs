#![warn(missing_docs)]
//! Redline Core - Offset-Addressed Editing for Revision-Tracked Documents
//!
//! # Overview
//!
//! `redline-core` edits word-processing paragraphs made of formatted runs,
//! addressing content purely by character offset ("insert at 37", "replace
//! every match of X"). The engine finds the run covering an offset, splits it
//! without disturbing neighbouring formatting, and can record each change as a
//! tracked insertion or deletion instead of applying it destructively.
//!
//! # Core Features
//!
//! - **Arena Node Tree**: paragraphs, runs, text, revision wrappers, hyperlinks, fields, bookmarks, drawings, tables
//! - **Offset Locator**: insert/delete bias, lengths recomputed on every call
//! - **Node Splitting**: any node cut at any offset, properties duplicated onto both halves
//! - **Revision Tracking**: insertions and deletions with author, minute-truncated date and id
//! - **Find & Replace**: regex or literal, `$` substitutions, formatting filter
//! - **Marker Ids**: lazily scanned, thread-safe allocator plus a renumbering pass
//! - **XML Fragments**: read/write `w:p`, `w:r`, `w:ins`, `w:del`, ... markup
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Command Interface (EditCommand)            │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Edit Engine (insert / remove / replace)    │  ← Offset Edits
//! ├─────────────────────────────────────────────┤
//! │  Revision Wrappers + Marker Renumbering     │  ← Change Tracking
//! ├─────────────────────────────────────────────┤
//! │  Locator + Splitter                         │  ← Tree Surgery
//! ├─────────────────────────────────────────────┤
//! │  Node Arena (Document)                      │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use redline_core::{Document, ReplaceOptions, RevisionKind};
//!
//! let mut doc = Document::from_paragraphs(["The cat sat."]);
//! let p = doc.paragraphs()[0];
//!
//! // Plain edit
//! doc.insert_text(p, 11, " down", false, None).unwrap();
//! assert_eq!(doc.paragraph_text(p).unwrap(), "The cat sat down.");
//!
//! // Tracked replacement: the old word stays in the tree as struck text
//! let options = ReplaceOptions { track_changes: true, ..ReplaceOptions::default() };
//! doc.replace_text(p, "cat", "dog", &options).unwrap();
//! assert_eq!(doc.paragraph_text(p).unwrap(), "The catdog sat down.");
//!
//! let kinds: Vec<RevisionKind> = doc.revisions(p).unwrap().iter().map(|r| r.kind).collect();
//! assert_eq!(kinds, vec![RevisionKind::Deletion, RevisionKind::Insertion]);
//! ```
//!
//! # Module Description
//!
//! - [`node`] - Node arena and node kinds
//! - [`locator`] - Offset to run lookup
//! - [`split`] - Node splitting
//! - [`revision`] - Revision wrappers, author and clock capabilities
//! - [`ids`] - Marker id allocation
//! - [`document`] - Document model and read projections
//! - [`edit`] - Insert, remove and inline placement
//! - [`replace`] - Find and replace
//! - [`search`] - Char-offset search
//! - [`xml`] - Fragment reading and writing
//! - [`commands`] - Unified command interface
//!
//! # Offsets
//!
//! - Offsets count Unicode scalar values, not bytes
//! - Struck (deleted) text is still counted, so tracked removal never shifts later offsets
//! - Tabs and breaks count one; bookmarks, drawings and other markers count zero

pub mod commands;
pub mod document;
pub mod edit;
pub mod error;
pub mod formatting;
pub mod ids;
pub mod locator;
mod markers;
pub mod node;
pub mod replace;
pub mod revision;
pub mod search;
pub mod split;
pub mod text;
pub mod xml;

pub use commands::{CommandError, CommandExecutor, CommandResult, EditCommand};
pub use document::{BookmarkInfo, Document, ParagraphSpan, RevisionInfo, RunInfo};
pub use edit::PAGE_FIELD_INSTRUCTION;
pub use error::{EditError, XmlError};
pub use formatting::{Formatting, MatchFormattingMode, UnderlineStyle, VerticalAlign};
pub use ids::IdAllocator;
pub use locator::{EditBias, LocatedRun};
pub use node::{HyperlinkTarget, NodeArena, NodeId, NodeKind, TextTag};
pub use replace::{
    FormattingMismatch, ReplaceOptions, ReplaceReport, ReplacedMatch, SkippedMatch,
    expand_replacement,
};
pub use revision::{
    AuthorProvider, Clock, EnvAuthor, FixedAuthor, FixedClock, RevisionKind, RevisionMeta,
    SystemClock,
};
pub use search::{SearchMatch, SearchOptions};
pub use text::{flatten_text, node_text_length};
