mod common;

use common::{document_with, pos, range, render};
use doctree_core::{BatchType, Element, Error, Node};

#[test]
fn undo_keeps_later_changes_and_can_be_redone() {
    let mut doc = document_with(Node::text("abc"));
    let typed = doc
        .change(BatchType::Regular, |w| w.insert_text(&pos(&[3]), "xyz"))
        .unwrap();
    doc.change(BatchType::Regular, |w| w.insert_text(&pos(&[0]), "123"))
        .unwrap();
    assert_eq!(render(&doc, "main"), "123abcxyz");

    let undo = doc.undo(&typed).unwrap();
    assert_eq!(render(&doc, "main"), "123abc");
    assert_eq!(undo.base_version(), Some(3));
    assert!(doc.history().is_undone(1));
    assert_eq!(doc.history().undoing_version(1), Some(3));
    assert!(doc.history().is_undoing(3));

    doc.undo(&undo).unwrap();
    assert_eq!(render(&doc, "main"), "123abcxyz");
    assert_eq!(doc.version(), 5);
    doc.validate().unwrap();
}

#[test]
fn undoing_twice_is_rejected() {
    let mut doc = document_with(Node::text("abc"));
    let batch = doc
        .change(BatchType::Regular, |w| w.remove(&range(&[0], &[1])))
        .unwrap();
    doc.undo(&batch).unwrap();
    assert!(matches!(doc.undo(&batch), Err(Error::InvalidOperation(_))));
    assert_eq!(render(&doc, "main"), "abc");
}

#[test]
fn transparent_batches_are_not_undoable() {
    let mut doc = document_with(Node::text("abc"));
    let batch = doc
        .change(BatchType::Transparent, |w| w.insert_text(&pos(&[0]), "x"))
        .unwrap();
    assert!(!batch.is_undoable());
    assert!(matches!(doc.undo(&batch), Err(Error::InvalidOperation(_))));
    assert_eq!(render(&doc, "main"), "xabc");
}

#[test]
fn multi_operation_batches_are_undone_back_to_front() {
    let mut doc = document_with(Node::text("abc"));
    let batch = doc
        .change(BatchType::Regular, |w| {
            w.insert_element(&pos(&[3]), "paragraph")?;
            w.insert_text(&pos(&[3, 0]), "hi")
        })
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(render(&doc, "main"), "abc|<paragraph>hi</paragraph>");
    let undo = doc.undo(&batch).unwrap();
    assert_eq!(undo.len(), 2);
    assert_eq!(render(&doc, "main"), "abc");
}

#[test]
fn undoing_formatting_skips_text_typed_inside_it() {
    let mut doc = document_with(Node::text("abcdef"));
    let bold = doc
        .change(BatchType::Regular, |w| w.set_attribute(&range(&[1], &[4]), "bold", true))
        .unwrap();
    doc.change(BatchType::Regular, |w| w.insert_text(&pos(&[2]), "X"))
        .unwrap();
    assert_eq!(render(&doc, "main"), "a|<bold=true>b</>|X|<bold=true>cd</>|ef");
    let undo = doc.undo(&bold).unwrap();
    assert_eq!(undo.len(), 2);
    assert_eq!(render(&doc, "main"), "abXcdef");
}

#[test]
fn undoing_a_removal_restores_content_and_formatting() {
    let mut doc = document_with(vec![
        Node::text("ab"),
        Node::Text(doctree_core::Text::new("cd").with_attribute("bold", true)),
        Node::text("ef"),
    ]);
    let before = doc.export_root("main").unwrap();
    let removal = doc
        .change(BatchType::Regular, |w| w.remove(&range(&[1], &[5])))
        .unwrap();
    assert_eq!(render(&doc, "main"), "af");
    doc.undo(&removal).unwrap();
    assert_eq!(doc.export_root("main").unwrap(), before);
}

#[test]
fn undoing_a_move_puts_content_back() {
    let mut doc = document_with(vec![
        Node::Element(Element::new("paragraph").with_child(Node::text("abc"))),
        Node::Element(Element::new("paragraph").with_child(Node::text("xyz"))),
    ]);
    let before = doc.export_root("main").unwrap();
    let moved = doc
        .change(BatchType::Regular, |w| {
            w.move_range(&range(&[0, 0], &[0, 3]), &pos(&[1, 3]))
        })
        .unwrap();
    assert_eq!(
        render(&doc, "main"),
        "<paragraph/>|<paragraph>xyzabc</paragraph>"
    );
    doc.undo(&moved).unwrap();
    assert_eq!(doc.export_root("main").unwrap(), before);
}

#[test]
fn undoing_an_empty_batch_does_nothing() {
    let mut doc = document_with(Node::text("abc"));
    let batch = doc
        .change(BatchType::Regular, |w| w.insert_text(&pos(&[0]), ""))
        .unwrap();
    assert!(batch.is_empty());
    assert!(doc.undo(&batch).unwrap().is_empty());
    assert_eq!(doc.version(), 1);
}
