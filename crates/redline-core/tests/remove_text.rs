use pretty_assertions::assert_eq;
use redline_core::{Document, EditError, Formatting, HyperlinkTarget, NodeId, RevisionKind};

fn single(text: &str) -> (Document, NodeId) {
    let doc = Document::from_paragraphs([text]);
    let p = doc.paragraphs()[0];
    (doc, p)
}

#[test]
fn test_untracked_removal_deletes_text() {
    let (mut doc, p) = single("hello cruel world");
    let removed = doc.remove_text(p, 5, 6, false, false).unwrap();
    assert!(!removed);
    assert_eq!(doc.paragraph_text(p).unwrap(), "hello world");
    assert_eq!(doc.paragraph_len(p).unwrap(), 11);
}

#[test]
fn test_untracked_removal_spanning_formatted_runs() {
    let (mut doc, p) = single("");
    let bold = Formatting::new().with_bold(true);
    doc.push_run(p, "one ", None).unwrap();
    doc.push_run(p, "two ", Some(&bold)).unwrap();
    doc.push_run(p, "three", None).unwrap();

    doc.remove_text(p, 2, 8, false, false).unwrap();
    assert_eq!(doc.paragraph_text(p).unwrap(), "onree");

    let runs = doc.runs(p).unwrap();
    let texts: Vec<&str> = runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["on", "ree"]);
}

#[test]
fn test_tracked_removal_keeps_length() {
    let (mut doc, p) = single("hello cruel world");
    doc.remove_text(p, 5, 6, true, false).unwrap();

    assert_eq!(doc.paragraph_text(p).unwrap(), "hello cruel world");
    assert_eq!(doc.paragraph_len(p).unwrap(), 17);

    let revisions = doc.revisions(p).unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].kind, RevisionKind::Deletion);
    assert_eq!(revisions[0].text, " cruel");
    assert_eq!(revisions[0].start, 5);
}

#[test]
fn test_tracked_removal_of_deleted_text_is_skipped() {
    let (mut doc, p) = single("abcdef");
    doc.remove_text(p, 2, 2, true, false).unwrap();
    doc.remove_text(p, 1, 4, true, false).unwrap();

    let revisions = doc.revisions(p).unwrap();
    let deleted: Vec<(usize, &str)> = revisions
        .iter()
        .map(|r| (r.start, r.text.as_str()))
        .collect();
    assert_eq!(deleted, vec![(1, "b"), (2, "cd"), (4, "e")]);
    assert!(revisions.iter().all(|r| r.kind == RevisionKind::Deletion));
    assert_eq!(doc.paragraph_len(p).unwrap(), 6);
}

#[test]
fn test_tracked_removal_of_tracked_insertion_becomes_deletion() {
    let (mut doc, p) = single("abcdef");
    doc.insert_text(p, 3, "XYZ", true, None).unwrap();
    assert_eq!(doc.paragraph_text(p).unwrap(), "abcXYZdef");

    doc.remove_text(p, 3, 3, true, false).unwrap();
    let revisions = doc.revisions(p).unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].kind, RevisionKind::Deletion);
    assert_eq!(revisions[0].text, "XYZ");
}

#[test]
fn test_tracked_partial_removal_inside_insertion() {
    let (mut doc, p) = single("ab");
    doc.insert_text(p, 1, "XYZ", true, None).unwrap();
    doc.remove_text(p, 2, 1, true, false).unwrap();

    let revisions: Vec<(RevisionKind, String)> = doc
        .revisions(p)
        .unwrap()
        .into_iter()
        .map(|r| (r.kind, r.text))
        .collect();
    assert_eq!(
        revisions,
        vec![
            (RevisionKind::Insertion, "X".to_string()),
            (RevisionKind::Deletion, "Y".to_string()),
            (RevisionKind::Insertion, "Z".to_string()),
        ]
    );
    assert_eq!(doc.paragraph_text(p).unwrap(), "aXYZb");
}

#[test]
fn test_range_errors() {
    let (mut doc, p) = single("abc");
    assert!(matches!(
        doc.remove_text(p, 1, 5, false, false),
        Err(EditError::InvalidRange { start: 1, end: 6, len: 3 })
    ));
    assert!(matches!(
        doc.remove_text(p, usize::MAX, 2, false, false),
        Err(EditError::InvalidRange { .. })
    ));
    assert_eq!(doc.remove_text(p, 0, 0, false, false), Ok(false));
    assert_eq!(doc.paragraph_text(p).unwrap(), "abc");
}

#[test]
fn test_emptied_hyperlink_is_pruned() {
    let (mut doc, p) = single("go ");
    let link = doc
        .insert_hyperlink(p, 3, "here", HyperlinkTarget::Anchor("end".into()), false)
        .unwrap();
    assert_eq!(doc.paragraph_text(p).unwrap(), "go here");

    doc.remove_text(p, 3, 4, false, false).unwrap();
    assert_eq!(doc.paragraph_text(p).unwrap(), "go ");
    assert!(!doc.contains(link));
}

#[test]
fn test_partially_removed_hyperlink_survives() {
    let (mut doc, p) = single("");
    let link = doc
        .insert_hyperlink(p, 0, "website", HyperlinkTarget::Relationship("rId7".into()), false)
        .unwrap();
    doc.remove_text(p, 0, 3, false, false).unwrap();
    assert_eq!(doc.paragraph_text(p).unwrap(), "site");
    assert!(doc.contains(link));
}

#[test]
fn test_empty_cell_paragraph_is_removed_on_request() {
    let mut doc = Document::new();
    let table = doc.append_table(1, 1);
    let cell = doc.table_cell(table, 0, 0).unwrap();
    let extra = doc.append_cell_paragraph(cell, "xyz").unwrap();

    assert!(doc.remove_text(extra, 0, 3, false, true).unwrap());
    assert_eq!(doc.cell_paragraphs(cell).unwrap().len(), 1);
    assert!(!doc.contains(extra));
}

#[test]
fn test_last_cell_paragraph_is_kept() {
    let mut doc = Document::new();
    let table = doc.append_table(1, 1);
    let cell = doc.table_cell(table, 0, 0).unwrap();
    let only = doc.cell_paragraphs(cell).unwrap()[0];
    doc.insert_text(only, 0, "abc", false, None).unwrap();

    assert!(!doc.remove_text(only, 0, 3, false, true).unwrap());
    assert!(doc.contains(only));
}

#[test]
fn test_body_paragraph_is_only_emptied() {
    let mut doc = Document::from_paragraphs(["abc", "def"]);
    let first = doc.paragraphs()[0];
    assert!(!doc.remove_text(first, 0, 3, false, true).unwrap());
    assert_eq!(doc.paragraph_texts(), vec!["", "def"]);
}

#[test]
fn test_tracked_removal_never_removes_the_paragraph() {
    let mut doc = Document::new();
    let table = doc.append_table(1, 1);
    let cell = doc.table_cell(table, 0, 0).unwrap();
    let extra = doc.append_cell_paragraph(cell, "xyz").unwrap();

    assert!(!doc.remove_text(extra, 0, 3, true, true).unwrap());
    assert!(doc.contains(extra));
}

#[test]
fn test_cell_paragraph_with_picture_is_kept() {
    let mut doc = Document::new();
    let table = doc.append_table(1, 1);
    let cell = doc.table_cell(table, 0, 0).unwrap();
    let extra = doc.append_cell_paragraph(cell, "xyz").unwrap();
    doc.insert_picture(extra, 3, "logo", false).unwrap();

    assert!(!doc.remove_text(extra, 0, 3, false, true).unwrap());
    assert!(doc.contains(extra));
}
