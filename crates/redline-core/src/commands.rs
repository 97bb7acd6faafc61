//! Command interface
//!
//! Every document mutation can be expressed as an [`EditCommand`] and run
//! through a [`CommandExecutor`], which keeps a history of what was executed.
//!
//! # Example
//!
//! ```rust
//! use redline_core::{CommandExecutor, CommandResult, Document, EditCommand};
//!
//! let doc = Document::from_paragraphs(["Hello"]);
//! let paragraph = doc.paragraphs()[0];
//! let mut executor = CommandExecutor::new(doc);
//!
//! executor
//!     .execute(EditCommand::InsertText {
//!         paragraph,
//!         index: 5,
//!         text: ", world".to_string(),
//!         track_changes: false,
//!         formatting: None,
//!     })
//!     .unwrap();
//!
//! assert_eq!(executor.document().paragraph_text(paragraph).unwrap(), "Hello, world");
//! assert_eq!(executor.get_command_history().len(), 1);
//! ```

use crate::document::Document;
use crate::error::{EditError, XmlError};
use crate::formatting::Formatting;
use crate::node::{HyperlinkTarget, NodeId};
use crate::replace::{ReplaceOptions, ReplaceReport};
use thiserror::Error;

/// A document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Insert text at a paragraph offset.
    InsertText {
        /// Target paragraph.
        paragraph: NodeId,
        /// Character offset.
        index: usize,
        /// Text to insert (`\t` and `\n` become tabs and breaks).
        text: String,
        /// Record as a tracked insertion.
        track_changes: bool,
        /// Formatting applied on top of the inherited formatting.
        formatting: Option<Formatting>,
    },
    /// Remove a character range from a paragraph.
    RemoveText {
        /// Target paragraph.
        paragraph: NodeId,
        /// First character offset.
        index: usize,
        /// Number of characters.
        count: usize,
        /// Record as a tracked deletion.
        track_changes: bool,
        /// Remove the paragraph from its table cell if it ends up empty.
        remove_empty_paragraph: bool,
    },
    /// Find and replace.
    ReplaceText {
        /// Target paragraph, or `None` for every paragraph of the document.
        paragraph: Option<NodeId>,
        /// Search pattern.
        pattern: String,
        /// Replacement text.
        replacement: String,
        /// Matching, formatting and tracking options.
        options: ReplaceOptions,
    },
    /// Insert a hyperlink at a paragraph offset.
    InsertHyperlink {
        /// Target paragraph.
        paragraph: NodeId,
        /// Character offset.
        index: usize,
        /// Link text.
        text: String,
        /// Link destination.
        target: HyperlinkTarget,
        /// Record as a tracked insertion.
        track_changes: bool,
    },
    /// Insert an inline picture at a paragraph offset.
    InsertPicture {
        /// Target paragraph.
        paragraph: NodeId,
        /// Character offset.
        index: usize,
        /// Picture name.
        name: String,
        /// Record as a tracked insertion.
        track_changes: bool,
    },
    /// Insert a page-number field at a paragraph offset.
    InsertPageNumberField {
        /// Target paragraph.
        paragraph: NodeId,
        /// Character offset.
        index: usize,
        /// Record as a tracked insertion.
        track_changes: bool,
    },
    /// Append a bookmark at the end of a paragraph.
    AppendBookmark {
        /// Target paragraph.
        paragraph: NodeId,
        /// Bookmark name.
        name: String,
    },
    /// Append a paragraph to the body.
    AppendParagraph {
        /// Initial text.
        text: String,
    },
    /// Insert a paragraph after another one.
    InsertParagraphAfter {
        /// Existing paragraph.
        paragraph: NodeId,
        /// Initial text.
        text: String,
    },
    /// Remove a paragraph.
    RemoveParagraph {
        /// Paragraph to remove.
        paragraph: NodeId,
    },
    /// Append an empty table to the body.
    AppendTable {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
    },
    /// Append the content of a WordprocessingML fragment to the body.
    ImportXml {
        /// The fragment.
        xml: String,
    },
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Completed with nothing to report.
    Success,
    /// Text was removed; `paragraph_removed` tells whether the paragraph went too.
    TextRemoved {
        /// The paragraph itself was removed.
        paragraph_removed: bool,
    },
    /// Replacement outcome.
    Replaced(ReplaceReport),
    /// A node was created.
    Node(NodeId),
    /// Several top-level nodes were created.
    Nodes(Vec<NodeId>),
    /// A marker id was allocated.
    MarkerId(u32),
}

/// Errors from [`CommandExecutor::execute`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    /// An edit operation failed.
    Edit(#[from] EditError),

    #[error(transparent)]
    /// An XML import failed.
    Xml(#[from] XmlError),
}

/// Runs [`EditCommand`]s against an owned [`Document`].
#[derive(Debug, Default)]
pub struct CommandExecutor {
    document: Document,
    command_history: Vec<EditCommand>,
}

impl CommandExecutor {
    /// Take ownership of `document`.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            command_history: Vec::new(),
        }
    }

    /// Execute one command. Failed commands are still recorded in the history.
    pub fn execute(&mut self, command: EditCommand) -> Result<CommandResult, CommandError> {
        self.command_history.push(command.clone());
        let doc = &mut self.document;

        let result = match command {
            EditCommand::InsertText {
                paragraph,
                index,
                text,
                track_changes,
                formatting,
            } => {
                doc.insert_text(paragraph, index, &text, track_changes, formatting.as_ref())?;
                CommandResult::Success
            }
            EditCommand::RemoveText {
                paragraph,
                index,
                count,
                track_changes,
                remove_empty_paragraph,
            } => CommandResult::TextRemoved {
                paragraph_removed: doc.remove_text(
                    paragraph,
                    index,
                    count,
                    track_changes,
                    remove_empty_paragraph,
                )?,
            },
            EditCommand::ReplaceText {
                paragraph,
                pattern,
                replacement,
                options,
            } => CommandResult::Replaced(match paragraph {
                Some(paragraph) => doc.replace_text(paragraph, &pattern, &replacement, &options)?,
                None => doc.replace_text_in_document(&pattern, &replacement, &options)?,
            }),
            EditCommand::InsertHyperlink {
                paragraph,
                index,
                text,
                target,
                track_changes,
            } => CommandResult::Node(doc.insert_hyperlink(
                paragraph,
                index,
                &text,
                target,
                track_changes,
            )?),
            EditCommand::InsertPicture {
                paragraph,
                index,
                name,
                track_changes,
            } => CommandResult::MarkerId(doc.insert_picture(paragraph, index, &name, track_changes)?),
            EditCommand::InsertPageNumberField {
                paragraph,
                index,
                track_changes,
            } => CommandResult::Node(doc.insert_page_number_field(paragraph, index, track_changes)?),
            EditCommand::AppendBookmark { paragraph, name } => {
                CommandResult::MarkerId(doc.append_bookmark(paragraph, &name)?)
            }
            EditCommand::AppendParagraph { text } => CommandResult::Node(doc.append_paragraph(&text)),
            EditCommand::InsertParagraphAfter { paragraph, text } => {
                CommandResult::Node(doc.insert_paragraph_after(paragraph, &text)?)
            }
            EditCommand::RemoveParagraph { paragraph } => {
                doc.remove_paragraph(paragraph)?;
                CommandResult::Success
            }
            EditCommand::AppendTable { rows, cols } => CommandResult::Node(doc.append_table(rows, cols)),
            EditCommand::ImportXml { xml } => CommandResult::Nodes(doc.import_xml(&xml)?),
        };
        Ok(result)
    }

    /// Execute commands in order, stopping at the first failure.
    pub fn execute_batch(
        &mut self,
        commands: Vec<EditCommand>,
    ) -> Result<Vec<CommandResult>, CommandError> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.execute(command)?);
        }
        Ok(results)
    }

    /// Commands executed so far, oldest first.
    pub fn get_command_history(&self) -> &[EditCommand] {
        &self.command_history
    }

    /// The document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access to the document, bypassing the history.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Give the document back.
    pub fn into_document(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_stops_at_first_error() {
        let doc = Document::from_paragraphs(["abc"]);
        let p = doc.paragraphs()[0];
        let mut executor = CommandExecutor::new(doc);

        let result = executor.execute_batch(vec![
            EditCommand::InsertText {
                paragraph: p,
                index: 3,
                text: "d".to_string(),
                track_changes: false,
                formatting: None,
            },
            EditCommand::RemoveText {
                paragraph: p,
                index: 10,
                count: 1,
                track_changes: false,
                remove_empty_paragraph: false,
            },
            EditCommand::AppendParagraph {
                text: "never".to_string(),
            },
        ]);

        assert!(matches!(
            result,
            Err(CommandError::Edit(EditError::InvalidRange { .. }))
        ));
        assert_eq!(executor.document().paragraph_texts(), vec!["abcd"]);
        assert_eq!(executor.get_command_history().len(), 2);
    }

    #[test]
    fn test_results_carry_created_ids() {
        let mut executor = CommandExecutor::default();
        let p = executor.document().paragraphs()[0];

        let result = executor
            .execute(EditCommand::AppendBookmark {
                paragraph: p,
                name: "start".to_string(),
            })
            .unwrap();
        assert_eq!(result, CommandResult::MarkerId(1));

        let result = executor
            .execute(EditCommand::ImportXml {
                xml: "<w:p><w:r><w:t>more</w:t></w:r></w:p>".to_string(),
            })
            .unwrap();
        let CommandResult::Nodes(nodes) = result else {
            panic!("expected created nodes");
        };
        assert_eq!(nodes.len(), 1);
        assert_eq!(executor.into_document().paragraph_texts(), vec!["", "more"]);
    }
}
