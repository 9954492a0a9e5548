mod common;

use common::{document_with, pos, range};
use doctree_core::{Batch, BatchType, Error, Node, Operation, Position, Stickiness, Text};
use serde_json::json;

#[test]
fn every_operation_survives_a_json_round_trip() {
    let doc = document_with(Node::text("abcdef"));
    let ops = vec![
        Operation::insert(
            Some(1),
            &pos(&[2]),
            vec![
                Node::Text(Text::new("x").with_attribute("bold", true)),
                Node::element("image"),
            ],
        ),
        Operation::remove(Some(2), &pos(&[0]), 2),
        Operation::move_range(Some(3), &pos(&[0]), 2, &pos(&[5])),
        Operation::rename(Some(4), &pos(&[0]), "paragraph", "heading"),
        Operation::attribute(Some(5), range(&[1], &[3]), "bold", None, Some(json!(true))),
        Operation::root_attribute(Some(6), "main", "lang", Some(json!("en")), None),
        Operation::marker(Some(7), "comment:1", None, Some(range(&[0], &[1])), true),
        Operation::root(Some(8), "aside", "$root", true),
        Operation::no_op(Some(9)),
        Operation::no_op(None),
    ];
    for op in ops {
        let json = op.to_json().unwrap();
        assert_eq!(json["className"], op.class_name());
        let parsed = doc.operation_from_json(&json).unwrap();
        assert_eq!(parsed, op);
        let text = serde_json::to_string(&op).unwrap();
        assert_eq!(serde_json::from_str::<Operation>(&text).unwrap(), op);
    }
}

#[test]
fn wire_shape_uses_camel_case_fields() {
    let op = Operation::move_range(Some(3), &pos(&[0, 1]), 2, &pos(&[1, 0]));
    assert_eq!(
        op.to_json().unwrap(),
        json!({
            "className": "MoveOperation",
            "baseVersion": 3,
            "sourcePosition": { "root": "main", "path": [0, 1], "stickiness": "toNone" },
            "howMany": 2,
            "targetPosition": { "root": "main", "path": [1, 0], "stickiness": "toNone" },
        })
    );
    let no_op = Operation::no_op(None).to_json().unwrap();
    assert_eq!(no_op, json!({ "className": "NoOperation", "baseVersion": null }));
}

#[test]
fn stickiness_defaults_when_missing() {
    let position: Position = serde_json::from_value(json!({ "root": "main", "path": [3] })).unwrap();
    assert_eq!(position.stickiness(), Stickiness::ToNone);
    assert!(serde_json::from_value::<Position>(json!({ "root": "main", "path": [] })).is_err());
}

#[test]
fn malformed_operations_are_rejected() {
    let doc = document_with(Node::text("abc"));
    let missing_class = json!({ "baseVersion": 1 });
    assert!(matches!(
        doc.operation_from_json(&missing_class),
        Err(Error::UnknownOperationClass(_))
    ));
    let backwards = json!({
        "className": "AttributeOperation",
        "baseVersion": 1,
        "range": {
            "start": { "root": "main", "path": [3] },
            "end": { "root": "main", "path": [1] },
        },
        "key": "bold",
        "oldValue": null,
        "newValue": true,
    });
    assert!(matches!(
        doc.operation_from_json(&backwards),
        Err(Error::Serialization(_))
    ));
    let new_root = Operation::root(Some(1), "aside", "$root", true);
    assert!(doc.operation_from_json(&new_root.to_json().unwrap()).is_ok());
}

#[test]
fn oversized_ranges_are_rejected_when_parsed() {
    let doc = document_with(Node::text("abc"));
    for (class, extra) in [
        ("RemoveOperation", json!({ "nodes": [] })),
        ("MoveOperation", json!({ "targetPosition": { "root": "main", "path": [0] } })),
    ] {
        let mut op = json!({
            "className": class,
            "baseVersion": 1,
            "sourcePosition": { "root": "main", "path": [1] },
            "howMany": u64::MAX,
        });
        for (key, value) in extra.as_object().unwrap() {
            op[key] = value.clone();
        }
        let err = doc.operation_from_json(&op).unwrap_err();
        assert!(matches!(err, Error::InvalidPosition(_)), "{class}: {err:?}");
    }
}

#[test]
fn unknown_classes_are_rejected_without_a_document() {
    let op = json!({ "className": "SplitOperation", "baseVersion": 1 });
    assert!(matches!(
        Operation::parse_json(&op),
        Err(Error::UnknownOperationClass(class)) if class == "SplitOperation"
    ));
    let insert = Operation::insert(Some(1), &pos(&[0]), Node::text("x"));
    assert_eq!(Operation::parse_json(&insert.to_json().unwrap()).unwrap(), insert);
}

#[test]
fn batches_serialize_with_their_operations() {
    let mut doc = document_with(Node::text("abc"));
    let batch = doc
        .change(BatchType::Regular, |w| w.remove(&range(&[0], &[2])))
        .unwrap();
    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(json["kind"], "regular");
    assert_eq!(json["operations"][0]["nodes"], json!([{ "data": "ab" }]));
    let parsed: Batch = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, batch);
}
