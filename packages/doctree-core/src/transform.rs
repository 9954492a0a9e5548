//! Operational transformation.
//!
//! [`transform`] rebases an operation `b` over an operation `a` that was authored against the
//! same document version and has already been applied. Positions and ranges are the degenerate
//! case and are rebased with [`transform_position`] / [`transform_range`].
//!
//! Conflicts that cannot be expressed are resolved by replacing the affected operation with a
//! `NoOp`, never by dropping it from the output.

use serde_json::Value;
use tracing::warn;

use crate::ids::Version;
use crate::node::NodeList;
use crate::ops::{plain, target_inside_moved, Operation, OperationKind};
use crate::position::{Position, Stickiness};
use crate::range::Range;

/// Tie-breaking configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransformContext {
    /// Whether the already applied operation wins conflicts: its content goes first at equal
    /// insertion points and its value is kept when both sides change the same attribute, name or
    /// marker.
    pub a_is_strong: bool,
}

impl Default for TransformContext {
    fn default() -> Self {
        Self { a_is_strong: true }
    }
}

impl TransformContext {
    /// The same context seen from the other operation.
    pub fn flipped(self) -> Self {
        Self {
            a_is_strong: !self.a_is_strong,
        }
    }

    fn tie(self) -> Stickiness {
        if self.a_is_strong {
            Stickiness::ToNone
        } else {
            Stickiness::ToPrevious
        }
    }
}

/// Rebases `b` over the already applied `a`.
///
/// The result may contain several operations (when `b`'s range got split); they carry
/// consecutive base versions starting at `b.base_version + 1`.
pub fn transform(a: &Operation, b: &Operation, context: TransformContext) -> Vec<Operation> {
    let kinds = transform_kind(&a.kind, &b.kind, context);
    numbered(kinds, b.base_version.map(|v| v + 1))
}

/// Rebases two concurrent sequences authored against the same version over each other.
///
/// Returns `(a', b')` such that applying `a` then `b'` and applying `b` then `a'` lead to the
/// same document. `context` is seen from `a`.
pub fn transform_sets(
    a: &[Operation],
    b: &[Operation],
    context: TransformContext,
) -> (Vec<Operation>, Vec<Operation>) {
    let base = a.first().or_else(|| b.first()).and_then(|op| op.base_version);
    let a_kinds: Vec<OperationKind> = a.iter().map(|op| op.kind.clone()).collect();
    let b_kinds: Vec<OperationKind> = b.iter().map(|op| op.kind.clone()).collect();
    let (a_prime, b_prime) = transform_kind_sets(&a_kinds, &b_kinds, context);
    (
        numbered(a_prime, base.map(|v| v + b.len() as Version)),
        numbered(b_prime, base.map(|v| v + a.len() as Version)),
    )
}

/// `position` after `operation` was applied.
///
/// Positions inside removed content collapse to the start of the removal; `None` means the
/// position's root was detached.
pub fn transform_position(position: &Position, operation: &Operation) -> Option<Position> {
    if detaches(&operation.kind, position.root()) {
        return None;
    }
    Some(match Shift::of(&operation.kind) {
        Shift::Insert(at, how_many) => position.transformed_by_insertion(at, how_many),
        Shift::Remove(at, how_many) => position
            .transformed_by_deletion(at, how_many)
            .unwrap_or_else(|| at.clone().with_stickiness(position.stickiness())),
        Shift::Move(source, how_many, target) => {
            position.transformed_by_move(source, target, how_many)
        }
        Shift::Nothing => position.clone(),
    })
}

/// `range` after `operation` was applied, kept in one piece.
///
/// A range entirely inside removed content collapses to the start of the removal; `None` means
/// the range's root was detached.
pub fn transform_range(range: &Range, operation: &Operation) -> Option<Range> {
    if detaches(&operation.kind, range.root()) {
        return None;
    }
    let pieces = match Shift::of(&operation.kind) {
        Shift::Insert(at, how_many) => range.transformed_by_insertion(at, how_many, false),
        Shift::Remove(at, how_many) => {
            return Some(
                range
                    .transformed_by_deletion(at, how_many)
                    .unwrap_or_else(|| Range::collapsed(plain(at))),
            )
        }
        Shift::Move(source, how_many, target) => {
            range.transformed_by_move(source, target, how_many, false)
        }
        Shift::Nothing => return Some(range.clone()),
    };
    Some(Range::glue(pieces).unwrap_or_else(|| range.clone()))
}

fn numbered(kinds: Vec<OperationKind>, first: Option<Version>) -> Vec<Operation> {
    kinds
        .into_iter()
        .enumerate()
        .map(|(i, kind)| Operation::new(first.map(|v| v + i as Version), kind))
        .collect()
}

fn transform_kind_sets(
    a: &[OperationKind],
    b: &[OperationKind],
    context: TransformContext,
) -> (Vec<OperationKind>, Vec<OperationKind>) {
    match (a, b) {
        ([], _) | (_, []) => (a.to_vec(), b.to_vec()),
        ([x], [y]) => (
            transform_kind(y, x, context.flipped()),
            transform_kind(x, y, context),
        ),
        ([_], [y, rest @ ..]) => {
            let (a1, mut b1) = transform_kind_sets(a, std::slice::from_ref(y), context);
            let (a2, b2) = transform_kind_sets(&a1, rest, context);
            b1.extend(b2);
            (a2, b1)
        }
        ([x, rest @ ..], _) => {
            let (mut a1, b1) = transform_kind_sets(std::slice::from_ref(x), b, context);
            let (a2, b2) = transform_kind_sets(rest, &b1, context);
            a1.extend(a2);
            (a1, b2)
        }
    }
}

/// How an applied operation shifts positions.
enum Shift<'a> {
    Insert(&'a Position, usize),
    Remove(&'a Position, usize),
    Move(&'a Position, usize, &'a Position),
    Nothing,
}

impl<'a> Shift<'a> {
    fn of(kind: &'a OperationKind) -> Self {
        match kind {
            OperationKind::Insert { position, nodes } => Shift::Insert(position, nodes.max_offset()),
            OperationKind::Remove {
                source_position,
                how_many,
                ..
            } => Shift::Remove(source_position, *how_many),
            OperationKind::Move {
                source_position,
                how_many,
                target_position,
            } if !moves_nothing(source_position, *how_many, target_position) => {
                Shift::Move(source_position, *how_many, target_position)
            }
            _ => Shift::Nothing,
        }
    }

    /// Rebases an insertion point (an insert position or a move target). Ties at the point are
    /// decided by `tie` instead of the point's own stickiness. `None` means the point was inside
    /// removed content.
    fn point(&self, point: &Position, tie: Stickiness) -> Option<Position> {
        let tied = point.clone().with_stickiness(tie);
        let shifted = match *self {
            Shift::Insert(at, how_many) => Some(tied.transformed_by_insertion(at, how_many)),
            Shift::Remove(at, how_many) => tied.transformed_by_deletion(at, how_many),
            Shift::Move(source, how_many, target) => {
                Some(move_point(&tied, source, how_many, target))
            }
            Shift::Nothing => Some(tied),
        };
        shifted.map(|p| p.with_stickiness(point.stickiness()))
    }

    fn range(&self, range: &Range, spread: bool) -> Vec<Range> {
        match *self {
            Shift::Insert(at, how_many) => range.transformed_by_insertion(at, how_many, spread),
            Shift::Remove(at, how_many) => {
                range.transformed_by_deletion(at, how_many).into_iter().collect()
            }
            Shift::Move(source, how_many, target) => {
                range.transformed_by_move(source, target, how_many, spread)
            }
            Shift::Nothing => vec![range.clone()],
        }
    }
}

/// Like [`Position::transformed_by_move`], but only content strictly inside the moved range
/// carries the point along; boundary points stay and follow the point's stickiness at the target.
fn move_point(point: &Position, source: &Position, how_many: usize, target: &Position) -> Position {
    let target = target
        .transformed_by_deletion(source, how_many)
        .unwrap_or_else(|| target.clone());
    if source.same_point(&target) {
        return point.clone();
    }
    match point.transformed_by_deletion(source, how_many) {
        None => point.combined(source, &target),
        Some(rest) => rest.transformed_by_insertion(&target, how_many),
    }
}

fn detaches(kind: &OperationKind, root: &str) -> bool {
    matches!(kind, OperationKind::Root { root_name, is_add: false, .. } if root_name == root)
}

fn dropped(reason: &str, b: &OperationKind) -> Vec<OperationKind> {
    warn!(reason, operation = ?b, "operation transformed into a no-op");
    vec![OperationKind::NoOp]
}

/// Orders ranges by root and then by document order of their start.
fn sort_in_document_order(ranges: &mut [Range]) {
    ranges.sort_by(|x, y| (x.root(), x.start().path()).cmp(&(y.root(), y.start().path())));
}

pub(crate) fn transform_kind(
    a: &OperationKind,
    b: &OperationKind,
    context: TransformContext,
) -> Vec<OperationKind> {
    if let OperationKind::Root {
        root_name,
        is_add: false,
        ..
    } = a
    {
        if !matches!(b, OperationKind::Root { .. }) && b.roots().contains(&root_name.as_str()) {
            return dropped("root was detached", b);
        }
    }

    let shift = Shift::of(a);
    match b {
        OperationKind::NoOp => vec![OperationKind::NoOp],
        OperationKind::Move {
            source_position,
            how_many,
            target_position,
        } if moves_nothing(source_position, *how_many, target_position) => {
            vec![OperationKind::NoOp]
        }
        OperationKind::Move {
            source_position,
            how_many,
            target_position,
        } if matches!(shift, Shift::Move(..)) => move_over_move(
            a,
            &shift,
            (source_position, *how_many, target_position),
            context,
            b,
        ),
        OperationKind::Insert { position, nodes } => insert_over(&shift, position, nodes, context, b),
        OperationKind::Remove {
            source_position,
            how_many,
            ..
        } => range_over(&shift, source_position, *how_many, None, context, b),
        OperationKind::Move {
            source_position,
            how_many,
            target_position,
        } => range_over(
            &shift,
            source_position,
            *how_many,
            Some(target_position),
            context,
            b,
        ),
        OperationKind::Rename {
            position,
            old_name,
            new_name,
        } => rename_over(a, &shift, position, old_name, new_name, context, b),
        OperationKind::Attribute {
            range,
            key,
            old_value,
            new_value,
        } => attribute_over(a, &shift, range, key, old_value, new_value, context, b),
        OperationKind::RootAttribute {
            root,
            key,
            old_value,
            new_value,
        } => match a {
            OperationKind::RootAttribute {
                root: a_root,
                key: a_key,
                new_value: a_new,
                ..
            } if a_root == root && a_key == key => {
                if context.a_is_strong {
                    dropped("root attribute changed concurrently", b)
                } else {
                    vec![OperationKind::RootAttribute {
                        root: root.clone(),
                        key: key.clone(),
                        old_value: a_new.clone(),
                        new_value: new_value.clone(),
                    }]
                }
            }
            _ => vec![OperationKind::RootAttribute {
                root: root.clone(),
                key: key.clone(),
                old_value: old_value.clone(),
                new_value: new_value.clone(),
            }],
        },
        OperationKind::Marker {
            name,
            old_range,
            new_range,
            affects_data,
        } => match a {
            OperationKind::Marker {
                name: a_name,
                new_range: a_new,
                ..
            } if a_name == name => {
                if context.a_is_strong {
                    dropped("marker changed concurrently", b)
                } else {
                    vec![OperationKind::Marker {
                        name: name.clone(),
                        old_range: a_new.clone(),
                        new_range: new_range.clone(),
                        affects_data: *affects_data,
                    }]
                }
            }
            _ => {
                let applied = Operation::new(None, a.clone());
                vec![OperationKind::Marker {
                    name: name.clone(),
                    old_range: old_range.as_ref().and_then(|r| transform_range(r, &applied)),
                    new_range: new_range.as_ref().and_then(|r| transform_range(r, &applied)),
                    affects_data: *affects_data,
                }]
            }
        },
        OperationKind::Root {
            root_name, is_add, ..
        } => match a {
            OperationKind::Root {
                root_name: a_name,
                is_add: a_add,
                ..
            } if a_name == root_name && a_add == is_add => dropped("root already changed", b),
            _ => vec![b.clone()],
        },
    }
}

fn insert_over(
    shift: &Shift<'_>,
    position: &Position,
    nodes: &NodeList,
    context: TransformContext,
    b: &OperationKind,
) -> Vec<OperationKind> {
    match shift.point(position, context.tie()) {
        Some(position) => vec![OperationKind::Insert {
            position,
            nodes: nodes.clone(),
        }],
        None => dropped("insertion point was removed", b),
    }
}

enum Target {
    At(Position),
    Removed,
}

/// Remove (`target == None`) and Move share the same source-range handling.
fn range_over(
    shift: &Shift<'_>,
    source: &Position,
    how_many: usize,
    target: Option<&Position>,
    context: TransformContext,
    b: &OperationKind,
) -> Vec<OperationKind> {
    let range = Range::from_position_and_shift(source, how_many);
    // Content moved into a removed range survives the removal.
    let spread = matches!(*shift, Shift::Move(_, _, moved_to)
        if target.is_none() && range.contains_position(moved_to) && moved_to.has_same_parent_as(source));
    let mut pieces: Vec<Range> = shift
        .range(&range, spread)
        .into_iter()
        .filter(|piece| !piece.is_collapsed() && piece.is_flat())
        .collect();
    if pieces.is_empty() {
        return dropped("range was removed", b);
    }
    sort_in_document_order(&mut pieces);

    let target = target.map(|t| match shift.point(t, context.tie()) {
        Some(p) => Target::At(p),
        None => match *shift {
            Shift::Remove(at, _) if t.has_same_parent_as(at) => Target::At(plain(at)),
            _ => Target::Removed,
        },
    });

    match target {
        None => removes(pieces),
        Some(Target::Removed) => {
            warn!(operation = ?b, "move target was removed, removing the source instead");
            removes(pieces)
        }
        Some(Target::At(target)) => moves(pieces, target, b),
    }
}

/// Removes back to front so earlier pieces keep their positions.
fn removes(pieces: Vec<Range>) -> Vec<OperationKind> {
    pieces
        .iter()
        .rev()
        .map(|piece| OperationKind::Remove {
            source_position: plain(piece.start()),
            how_many: piece.offset_len(),
            nodes: NodeList::new(),
        })
        .collect()
}

/// Moves back to front, each piece landing before the previously moved one.
fn moves(mut remaining: Vec<Range>, mut target: Position, b: &OperationKind) -> Vec<OperationKind> {
    let mut out = Vec::new();
    while let Some(piece) = remaining.pop() {
        let source = plain(piece.start());
        let how_many = piece.offset_len();
        if target_inside_moved(&source, how_many, &target) {
            out.extend(dropped("move target ended up inside the moved range", b));
            continue;
        }
        out.push(OperationKind::Move {
            source_position: source.clone(),
            how_many,
            target_position: plain(&target),
        });
        let applied = Shift::Move(&source, how_many, &target);
        let next_target = applied
            .point(&target, Stickiness::ToPrevious)
            .unwrap_or_else(|| target.clone());
        remaining = remaining
            .into_iter()
            .map(|r| {
                Range::between(
                    r.start().transformed_by_move(&source, &target, how_many),
                    r.end().transformed_by_move(&source, &target, how_many),
                )
            })
            .collect();
        target = next_target;
    }
    out
}

/// A move leaving its content where it is: empty, or targeting one of its own boundaries.
fn moves_nothing(source: &Position, how_many: usize, target: &Position) -> bool {
    how_many == 0
        || target.same_point(source)
        || target.same_point(&source.shifted_by(how_many as isize))
}

/// Move over an applied move.
///
/// A range nested in the other move's range keeps its own move: the inner move wins. Partially
/// overlapping ranges, identical ranges, and moves whose targets lie inside each other's content
/// conflict; the strong side wins. When the applied move is the weak one, it is reverted before
/// `b` runs unchanged.
fn move_over_move(
    a: &OperationKind,
    shift: &Shift<'_>,
    (source, how_many, target): (&Position, usize, &Position),
    context: TransformContext,
    b: &OperationKind,
) -> Vec<OperationKind> {
    let Shift::Move(a_source, a_how_many, a_target) = *shift else {
        return vec![b.clone()];
    };
    let range = Range::from_position_and_shift(source, how_many);
    let a_range = Range::from_position_and_shift(a_source, a_how_many);
    let same_parent = source.has_same_parent_as(a_source);
    let inner = same_parent && range != a_range && a_range.contains_range(&range, true);
    let outer = same_parent && range != a_range && range.contains_range(&a_range, true);
    let overlapping = same_parent && range.is_intersecting(&a_range) && !inner && !outer;
    let crossed = target_inside_moved(a_source, a_how_many, target)
        && target_inside_moved(source, how_many, a_target);

    if overlapping || crossed {
        if context.a_is_strong {
            return dropped("range was moved concurrently", b);
        }
        warn!(operation = ?b, "reverting a conflicting concurrent move");
        let reverted = Operation::new(None, a.clone()).reversed().kind;
        return vec![reverted, b.clone()];
    }

    let moved = if inner || !same_parent {
        Range::between(
            range.start().transformed_by_move(a_source, a_target, a_how_many),
            range.end().transformed_by_move(a_source, a_target, a_how_many),
        )
    } else {
        let Some(rest) = range.transformed_by_deletion(a_source, a_how_many) else {
            return dropped("range was moved concurrently", b);
        };
        let landed = a_target
            .transformed_by_deletion(a_source, a_how_many)
            .unwrap_or_else(|| a_target.clone());
        Range::between(
            rest.start().transformed_by_insertion(&landed, a_how_many),
            rest.end().transformed_by_insertion(&landed, a_how_many),
        )
    };
    if moved.is_collapsed() || !moved.is_flat() {
        return dropped("range was moved concurrently", b);
    }
    let target = shift.point(target, context.tie()).unwrap_or_else(|| target.clone());
    if target_inside_moved(moved.start(), moved.offset_len(), &target) {
        return dropped("move target ended up inside the moved range", b);
    }
    vec![OperationKind::Move {
        source_position: plain(moved.start()),
        how_many: moved.offset_len(),
        target_position: plain(&target),
    }]
}

fn rename_over(
    a: &OperationKind,
    shift: &Shift<'_>,
    position: &Position,
    old_name: &str,
    new_name: &str,
    context: TransformContext,
    b: &OperationKind,
) -> Vec<OperationKind> {
    if let OperationKind::Rename {
        position: a_position,
        new_name: a_new,
        ..
    } = a
    {
        if a_position.same_point(position) {
            if context.a_is_strong {
                return dropped("element was renamed concurrently", b);
            }
            return vec![OperationKind::Rename {
                position: position.clone(),
                old_name: a_new.clone(),
                new_name: new_name.to_string(),
            }];
        }
    }
    let node = Range::from_position_and_shift(position, 1);
    let pieces: Vec<Range> = shift
        .range(&node, false)
        .into_iter()
        .filter(|piece| !piece.is_collapsed())
        .collect();
    match Range::glue(pieces) {
        Some(piece) => vec![OperationKind::Rename {
            position: plain(piece.start()),
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        }],
        None => dropped("renamed element was removed", b),
    }
}

#[allow(clippy::too_many_arguments)]
fn attribute_over(
    a: &OperationKind,
    shift: &Shift<'_>,
    range: &Range,
    key: &str,
    old_value: &Option<Value>,
    new_value: &Option<Value>,
    context: TransformContext,
    b: &OperationKind,
) -> Vec<OperationKind> {
    let mut pieces: Vec<(Range, Option<Value>)> = match a {
        OperationKind::Attribute {
            range: a_range,
            key: a_key,
            new_value: a_new,
            ..
        } if a_key == key && a_range.start().has_same_parent_as(range.start()) => {
            let mut pieces: Vec<(Range, Option<Value>)> = range
                .difference(a_range)
                .into_iter()
                .map(|r| (r, old_value.clone()))
                .collect();
            if !context.a_is_strong {
                if let Some(common) = range.intersection(a_range) {
                    pieces.push((common, a_new.clone()));
                }
            }
            pieces
        }
        _ => shift
            .range(range, true)
            .into_iter()
            .map(|r| (r, old_value.clone()))
            .collect(),
    };
    pieces.sort_by(|(x, _), (y, _)| (x.root(), x.start().path()).cmp(&(y.root(), y.start().path())));

    let out: Vec<OperationKind> = pieces
        .into_iter()
        .filter(|(piece, old)| !piece.is_collapsed() && piece.is_flat() && old != new_value)
        .map(|(piece, old)| OperationKind::Attribute {
            range: piece,
            key: key.to_string(),
            old_value: old,
            new_value: new_value.clone(),
        })
        .collect();
    if out.is_empty() {
        return dropped("attribute change has nothing left to change", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use serde_json::json;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec()).unwrap()
    }

    fn range(start: &[usize], end: &[usize]) -> Range {
        Range::new(pos(start), pos(end)).unwrap()
    }

    fn strong() -> TransformContext {
        TransformContext { a_is_strong: true }
    }

    fn weak() -> TransformContext {
        TransformContext { a_is_strong: false }
    }

    #[test]
    fn insertions_at_the_same_point_follow_strength() {
        let a = Operation::insert(Some(0), &pos(&[2]), Node::text("aa"));
        let b = Operation::insert(Some(0), &pos(&[2]), Node::text("b"));
        let after_strong = transform(&a, &b, strong());
        assert_eq!(after_strong.len(), 1);
        assert_eq!(after_strong[0].base_version, Some(1));
        assert!(matches!(
            &after_strong[0].kind,
            OperationKind::Insert { position, .. } if position.path() == [4]
        ));
        let after_weak = transform(&a, &b, weak());
        assert!(matches!(
            &after_weak[0].kind,
            OperationKind::Insert { position, .. } if position.path() == [2]
        ));
    }

    #[test]
    fn insertion_into_removed_content_becomes_no_op() {
        let a = Operation::remove(Some(0), &pos(&[1]), 4);
        let b = Operation::insert(Some(0), &pos(&[3]), Node::text("x"));
        let result = transform(&a, &b, strong());
        assert_eq!(result.len(), 1);
        assert!(result[0].is_no_op());
        let boundary = Operation::insert(Some(0), &pos(&[5]), Node::text("x"));
        assert!(matches!(
            &transform(&a, &boundary, strong())[0].kind,
            OperationKind::Insert { position, .. } if position.path() == [1]
        ));
    }

    #[test]
    fn overlapping_removals_shrink() {
        let a = Operation::remove(Some(0), &pos(&[2]), 4);
        let b = Operation::remove(Some(0), &pos(&[4]), 4);
        match &transform(&a, &b, strong())[0].kind {
            OperationKind::Remove {
                source_position,
                how_many,
                ..
            } => {
                assert_eq!(source_position.path(), &[2]);
                assert_eq!(*how_many, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn removal_widens_over_inserted_content() {
        let a = Operation::insert(Some(0), &pos(&[3]), Node::text("xyz"));
        let b = Operation::remove(Some(0), &pos(&[1]), 4);
        match &transform(&a, &b, strong())[0].kind {
            OperationKind::Remove { how_many, .. } => assert_eq!(*how_many, 7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn same_key_attributes_resolve_by_strength() {
        let a = Operation::attribute(Some(0), range(&[0], &[4]), "bold", None, Some(json!(1)));
        let b = Operation::attribute(Some(0), range(&[2], &[6]), "bold", None, Some(json!(2)));

        let strong_result = transform(&a, &b, strong());
        assert_eq!(strong_result.len(), 1);
        assert!(matches!(
            &strong_result[0].kind,
            OperationKind::Attribute { range: r, old_value: None, .. } if *r == range(&[4], &[6])
        ));

        let weak_result = transform(&a, &b, weak());
        assert_eq!(weak_result.len(), 2);
        assert!(matches!(
            &weak_result[0].kind,
            OperationKind::Attribute { range: r, old_value: Some(v), .. }
                if *r == range(&[2], &[4]) && *v == json!(1)
        ));
        assert_eq!(weak_result[1].base_version, Some(2));
    }

    #[test]
    fn attribute_spreads_around_inserted_content() {
        let a = Operation::insert(Some(0), &pos(&[2]), Node::text("xx"));
        let b = Operation::attribute(Some(0), range(&[0], &[4]), "bold", None, Some(json!(true)));
        let result = transform(&a, &b, strong());
        let ranges: Vec<_> = result
            .iter()
            .map(|op| match &op.kind {
                OperationKind::Attribute { range, .. } => range.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(ranges, vec![range(&[0], &[2]), range(&[4], &[6])]);
    }

    #[test]
    fn move_target_inside_removed_range_lands_at_removal_start() {
        let a = Operation::remove(Some(0), &pos(&[2]), 4);
        let b = Operation::move_range(Some(0), &pos(&[0]), 1, &pos(&[4]));
        match &transform(&a, &b, strong())[0].kind {
            OperationKind::Move {
                target_position, ..
            } => assert_eq!(target_position.path(), &[2]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn move_into_removed_element_removes_source() {
        let a = Operation::remove(Some(0), &pos(&[5]), 1);
        let b = Operation::move_range(Some(0), &pos(&[0]), 1, &pos(&[5, 2]));
        match &transform(&a, &b, strong())[0].kind {
            OperationKind::Remove {
                source_position,
                how_many,
                ..
            } => {
                assert_eq!(source_position.path(), &[0]);
                assert_eq!(*how_many, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rename_conflicts_keep_the_strong_name() {
        let a = Operation::rename(Some(0), &pos(&[1]), "p", "h1");
        let b = Operation::rename(Some(0), &pos(&[1]), "p", "h2");
        assert!(transform(&a, &b, strong())[0].is_no_op());
        assert_eq!(
            transform(&a, &b, weak())[0].kind,
            OperationKind::Rename {
                position: pos(&[1]),
                old_name: "h1".into(),
                new_name: "h2".into(),
            }
        );
        let removed = Operation::remove(Some(0), &pos(&[0]), 3);
        assert!(transform(&removed, &b, strong())[0].is_no_op());
    }

    #[test]
    fn positions_collapse_to_removal_start() {
        let remove = Operation::remove(Some(0), &pos(&[1]), 2);
        assert_eq!(transform_position(&pos(&[1, 4, 6]), &remove), Some(pos(&[1])));
        assert_eq!(transform_position(&pos(&[5]), &remove), Some(pos(&[3])));
        let detach = Operation::root(Some(0), "main", "$root", false);
        assert_eq!(transform_position(&pos(&[5]), &detach), None);
    }

    #[test]
    fn sets_are_renumbered_after_the_other_side() {
        let a = vec![
            Operation::insert(Some(3), &pos(&[0]), Node::text("a")),
            Operation::insert(Some(4), &pos(&[0]), Node::text("b")),
        ];
        let b = vec![Operation::remove(Some(3), &pos(&[2]), 1)];
        let (a_prime, b_prime) = transform_sets(&a, &b, strong());
        assert_eq!(
            a_prime.iter().map(|op| op.base_version).collect::<Vec<_>>(),
            vec![Some(4), Some(5)]
        );
        assert_eq!(b_prime[0].base_version, Some(5));
        assert!(matches!(
            &b_prime[0].kind,
            OperationKind::Remove { source_position, .. } if source_position.path() == [4]
        ));
    }
}
