mod common;

use common::{document_with, pos, range};
use doctree_core::{
    transform_position, BatchType, Element, LivePosition, LiveRange, Node, Operation, Stickiness,
};

#[test]
fn live_position_matches_direct_transformation() {
    let mut doc = document_with(vec![
        Node::Element(Element::new("paragraph").with_child(Node::text("abcdef"))),
        Node::Element(Element::new("paragraph").with_child(Node::text("xyz"))),
    ]);
    let start = pos(&[0, 4]);
    let live = LivePosition::new(&mut doc, start.clone()).unwrap();

    doc.change(BatchType::Regular, |w| {
        w.insert_text(&pos(&[0, 0]), "12")?;
        w.remove(&range(&[0, 1], &[0, 3]))?;
        w.insert_element(&pos(&[0]), "heading")?;
        w.move_range(&range(&[1, 0], &[1, 2]), &pos(&[2, 3]))?;
        w.set_attribute(&range(&[1, 0], &[1, 2]), "bold", true)
    })
    .unwrap();

    let expected = doc
        .history()
        .log()
        .operations()
        .iter()
        .skip(1)
        .try_fold(start, |p, op| transform_position(&p, op))
        .unwrap();
    let current = live.position().unwrap();
    assert_eq!(current, expected);
    doc.tree().resolve(&current).unwrap();
}

#[test]
fn live_position_inside_removed_content_collapses_to_removal_start() {
    let mut doc = document_with(Node::text("abcdef"));
    let live = LivePosition::new(&mut doc, pos(&[3]).with_stickiness(Stickiness::ToNext)).unwrap();
    doc.apply(&Operation::remove(Some(1), &pos(&[1]), 4)).unwrap();
    let position = live.position().unwrap();
    assert_eq!(position.path(), &[1]);
    assert_eq!(position.stickiness(), Stickiness::ToNext);
}

#[test]
fn live_position_follows_moved_content() {
    let mut doc = document_with(vec![
        Node::Element(Element::new("paragraph").with_child(Node::text("abc"))),
        Node::Element(Element::new("paragraph").with_child(Node::text("xyz"))),
    ]);
    let live = LivePosition::new(&mut doc, pos(&[0, 1])).unwrap();
    doc.apply(&Operation::move_range(Some(1), &pos(&[0, 0]), 3, &pos(&[1, 0])))
        .unwrap();
    assert_eq!(live.position().unwrap().path(), &[1, 1]);
}

#[test]
fn stickiness_decides_insertions_at_the_position() {
    let mut doc = document_with(Node::text("abcdef"));
    let follows = LivePosition::new(&mut doc, pos(&[2])).unwrap();
    let stays =
        LivePosition::new(&mut doc, pos(&[2]).with_stickiness(Stickiness::ToPrevious)).unwrap();
    doc.apply(&Operation::insert(Some(1), &pos(&[2]), Node::text("XY")))
        .unwrap();
    assert_eq!(follows.position().unwrap().path(), &[4]);
    assert_eq!(stays.position().unwrap().path(), &[2]);
}

#[test]
fn detached_root_invalidates_live_references() {
    let mut doc = document_with(Node::text("abcdef"));
    let position = LivePosition::new(&mut doc, pos(&[2])).unwrap();
    let selection = LiveRange::new(&mut doc, range(&[1], &[3])).unwrap();
    doc.change(BatchType::Regular, |w| w.detach_root("main")).unwrap();
    assert!(!position.is_valid());
    assert!(!selection.is_valid());
    assert_eq!(position.position(), None);
    assert_eq!(selection.detach(&mut doc), None);
}

#[test]
fn live_range_collapses_when_its_content_is_removed() {
    let mut doc = document_with(Node::text("abcdef"));
    let partial = LiveRange::new(&mut doc, range(&[1], &[3])).unwrap();
    let covered = LiveRange::new(&mut doc, range(&[3], &[5])).unwrap();
    doc.apply(&Operation::remove(Some(1), &pos(&[2]), 4)).unwrap();
    assert_eq!(partial.range().unwrap(), range(&[1], &[2]));
    let collapsed = covered.range().unwrap();
    assert!(collapsed.is_collapsed());
    assert_eq!(collapsed.start().path(), &[2]);
}

#[test]
fn live_range_does_not_grow_at_its_boundaries() {
    let mut doc = document_with(Node::text("abcdef"));
    let live = LiveRange::new(&mut doc, range(&[1], &[3])).unwrap();
    doc.apply(&Operation::insert(Some(1), &pos(&[1]), Node::text("X")))
        .unwrap();
    doc.apply(&Operation::insert(Some(2), &pos(&[4]), Node::text("Y")))
        .unwrap();
    assert_eq!(live.range().unwrap(), range(&[2], &[4]));
    doc.apply(&Operation::insert(Some(3), &pos(&[3]), Node::text("Z")))
        .unwrap();
    assert_eq!(live.range().unwrap(), range(&[2], &[5]));
}

#[test]
fn detached_live_position_stops_updating() {
    let mut doc = document_with(Node::text("abcdef"));
    let live = LivePosition::new(&mut doc, pos(&[3])).unwrap();
    let subscription = live.subscription();
    assert_eq!(live.detach(&mut doc).map(|p| p.path().to_vec()), Some(vec![3]));
    assert!(!doc.unsubscribe(subscription));
    doc.apply(&Operation::insert(Some(1), &pos(&[0]), Node::text("X")))
        .unwrap();
}

#[test]
fn live_references_must_resolve() {
    let mut doc = document_with(Node::text("abc"));
    assert!(LivePosition::new(&mut doc, pos(&[7])).is_err());
    assert!(LiveRange::new(&mut doc, range(&[1], &[9])).is_err());
}
