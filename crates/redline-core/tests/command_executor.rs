use pretty_assertions::assert_eq;
use redline_core::{
    CommandError, CommandExecutor, CommandResult, Document, EditCommand, EditError,
    HyperlinkTarget, ReplaceOptions, XmlError,
};

#[test]
fn test_editing_session_through_commands() {
    let mut executor = CommandExecutor::new(Document::from_paragraphs(["Dear NAME,"]));
    let p = executor.document().paragraphs()[0];

    let results = executor
        .execute_batch(vec![
            EditCommand::ReplaceText {
                paragraph: None,
                pattern: "NAME".to_string(),
                replacement: "Ada".to_string(),
                options: ReplaceOptions::default(),
            },
            EditCommand::AppendParagraph {
                text: "See the notes.".to_string(),
            },
            EditCommand::InsertParagraphAfter {
                paragraph: p,
                text: String::new(),
            },
        ])
        .unwrap();

    assert!(matches!(&results[0], CommandResult::Replaced(report) if report.count() == 1));
    assert!(matches!(results[1], CommandResult::Node(_)));
    assert_eq!(
        executor.document().paragraph_texts(),
        vec!["Dear Ada,", "", "See the notes."]
    );
    assert_eq!(executor.get_command_history().len(), 3);
}

#[test]
fn test_object_commands_report_what_they_created() {
    let mut executor = CommandExecutor::default();
    let p = executor.document().paragraphs()[0];

    let link = executor
        .execute(EditCommand::InsertHyperlink {
            paragraph: p,
            index: 0,
            text: "home".to_string(),
            target: HyperlinkTarget::Relationship("rId1".to_string()),
            track_changes: true,
        })
        .unwrap();
    let CommandResult::Node(link) = link else {
        panic!("expected the hyperlink node");
    };
    assert!(executor.document().contains(link));

    let picture = executor
        .execute(EditCommand::InsertPicture {
            paragraph: p,
            index: 4,
            name: "photo".to_string(),
            track_changes: false,
        })
        .unwrap();
    assert_eq!(picture, CommandResult::MarkerId(1));

    let field = executor
        .execute(EditCommand::InsertPageNumberField {
            paragraph: p,
            index: 4,
            track_changes: false,
        })
        .unwrap();
    assert!(matches!(field, CommandResult::Node(_)));
    assert_eq!(executor.document().paragraph_text(p).unwrap(), "home1");
}

#[test]
fn test_remove_text_command_reports_paragraph_removal() {
    let mut doc = Document::new();
    let table = doc.append_table(1, 1);
    let cell = doc.table_cell(table, 0, 0).unwrap();
    let extra = doc.append_cell_paragraph(cell, "bye").unwrap();
    let mut executor = CommandExecutor::new(doc);

    let result = executor
        .execute(EditCommand::RemoveText {
            paragraph: extra,
            index: 0,
            count: 3,
            track_changes: false,
            remove_empty_paragraph: true,
        })
        .unwrap();
    assert_eq!(
        result,
        CommandResult::TextRemoved {
            paragraph_removed: true
        }
    );
}

#[test]
fn test_errors_are_typed() {
    let mut executor = CommandExecutor::default();
    let p = executor.document().paragraphs()[0];

    let err = executor
        .execute(EditCommand::RemoveParagraph { paragraph: p })
        .unwrap_err();
    assert!(matches!(err, CommandError::Edit(EditError::LastParagraph(_))));

    let err = executor
        .execute(EditCommand::ImportXml {
            xml: r#"<w:p><w:bookmarkStart w:id="many" w:name="x"/></w:p>"#.to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, CommandError::Xml(XmlError::InvalidNumber(_))));
    assert_eq!(executor.get_command_history().len(), 2);
}

#[test]
fn test_table_command() {
    let mut executor = CommandExecutor::default();
    let result = executor
        .execute(EditCommand::AppendTable { rows: 2, cols: 2 })
        .unwrap();
    let CommandResult::Node(table) = result else {
        panic!("expected the table node");
    };
    let doc = executor.into_document();
    assert_eq!(doc.paragraphs().len(), 5);
    assert!(doc.table_cell(table, 1, 1).is_ok());
}
