//! Error types surfaced by the editing engine.

use crate::node::NodeId;
use thiserror::Error;

/// Errors returned by paragraph edit operations.
///
/// Range errors are always detected before the tree is touched, so a failed
/// operation leaves the document exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("offset {index} is out of range for a paragraph of length {len}")]
    /// A single offset fell outside the paragraph.
    OutOfRange {
        /// Requested character offset.
        index: usize,
        /// Paragraph length at the time of the call.
        len: usize,
    },

    #[error("range {start}..{end} is out of range for a paragraph of length {len}")]
    /// A `[start, end)` range reached past the end of the paragraph.
    InvalidRange {
        /// Inclusive start offset.
        start: usize,
        /// Exclusive end offset.
        end: usize,
        /// Paragraph length at the time of the call.
        len: usize,
    },

    #[error("node {0} does not belong to this document")]
    /// The id was never allocated by this document's arena.
    NodeNotFound(NodeId),

    #[error("node {0} is not a paragraph")]
    /// An operation that needs a paragraph was given another node.
    NotAParagraph(NodeId),

    #[error("node {0} has been removed from the document")]
    /// The node exists in the arena but is no longer reachable from the body.
    Detached(NodeId),

    #[error("node {0} cannot hold this kind of content")]
    /// Content was pushed into a node that cannot contain it.
    InvalidContainer(NodeId),

    #[error("paragraph {0} is the last paragraph of its story")]
    /// Removing the paragraph would leave a body or cell without paragraphs.
    LastParagraph(NodeId),

    #[error("invalid search pattern: {0}")]
    /// The search pattern failed to compile.
    InvalidPattern(String),
}

/// Errors produced while reading or writing XML fragments.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML error: {0}")]
    /// The underlying reader or writer failed.
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    /// An attribute was malformed.
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid revision date '{0}'")]
    /// A `w:date` attribute was not an RFC 3339 timestamp.
    InvalidDate(String),

    #[error("invalid numeric attribute '{0}'")]
    /// An id or size attribute was not a number.
    InvalidNumber(String),

    #[error("fragment is not valid UTF-8: {0}")]
    /// Serialized output was not UTF-8.
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    /// The document rejected the imported structure.
    Edit(#[from] EditError),
}
