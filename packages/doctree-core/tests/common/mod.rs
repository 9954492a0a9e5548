#![allow(dead_code)]

use doctree_core::{Attributes, Document, Node, NodeList, Operation, Position, Range};

pub fn pos(path: &[usize]) -> Position {
    Position::new("main", path.to_vec()).unwrap()
}

pub fn range(start: &[usize], end: &[usize]) -> Range {
    Range::new(pos(start), pos(end)).unwrap()
}

/// Document with a `main` root holding `nodes`, at version 1.
pub fn document_with(nodes: impl Into<NodeList>) -> Document {
    let mut doc = Document::new();
    doc.create_root("main", "$root").unwrap();
    doc.apply(&Operation::insert(Some(0), &pos(&[0]), nodes))
        .unwrap();
    doc
}

/// Compact rendering of a root: nodes separated by `|`, attributed text as `<key=value>data</>`.
pub fn render(doc: &Document, root: &str) -> String {
    let element = doc.export_root(root).unwrap();
    render_list(&element.children)
}

fn render_list(nodes: &NodeList) -> String {
    nodes.iter().map(render_node).collect::<Vec<_>>().join("|")
}

fn render_attributes(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!(" {key}={value}"))
        .collect()
}

fn render_node(node: &Node) -> String {
    match node {
        Node::Text(text) if text.attributes.is_empty() => text.data.clone(),
        Node::Text(text) => format!("<{}>{}</>", render_attributes(&text.attributes).trim_start(), text.data),
        Node::Element(element) if element.children.is_empty() => {
            format!("<{}{}/>", element.name, render_attributes(&element.attributes))
        }
        Node::Element(element) => format!(
            "<{}{}>{}</{}>",
            element.name,
            render_attributes(&element.attributes),
            render_list(&element.children),
            element.name
        ),
    }
}

/// Applies `a` then `b` rebased over it on one copy, `b` then `a` rebased over it on another,
/// and returns both renderings.
pub fn apply_both_orders(
    make: impl Fn() -> Document,
    a: &Operation,
    b: &Operation,
    context: doctree_core::TransformContext,
) -> (String, String) {
    let mut left = make();
    left.apply(a).unwrap();
    for op in doctree_core::transform(a, b, context) {
        left.apply(&op).unwrap();
    }
    let mut right = make();
    right.apply(b).unwrap();
    for op in doctree_core::transform(b, a, context.flipped()) {
        right.apply(&op).unwrap();
    }
    left.validate().unwrap();
    right.validate().unwrap();
    (render(&left, "main"), render(&right, "main"))
}
