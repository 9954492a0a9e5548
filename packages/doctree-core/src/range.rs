use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::position::{Position, PositionRelation, Stickiness};
use crate::tree::{Item, Tree};

/// Ordered pair of positions in one root.
///
/// Non-collapsed ranges stick inward: `start` binds to the content after it and `end` to the
/// content before it, so insertions exactly at a boundary land outside the range.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeData")]
pub struct Range {
    start: Position,
    end: Position,
}

#[derive(Deserialize)]
struct RangeData {
    start: Position,
    end: Position,
}

impl TryFrom<RangeData> for Range {
    type Error = Error;

    fn try_from(data: RangeData) -> Result<Self> {
        Range::new(data.start, data.end)
    }
}

impl Range {
    pub fn new(start: Position, end: Position) -> Result<Self> {
        match start.compare_with(&end) {
            PositionRelation::Different => Err(Error::DifferentRoots(
                start.root().to_string(),
                end.root().to_string(),
            )),
            PositionRelation::After => Err(Error::InvalidPosition(
                "range start is after its end".into(),
            )),
            _ => Ok(Range::between(start, end)),
        }
    }

    /// Builds a range from already ordered positions, normalizing boundary stickiness.
    pub(crate) fn between(start: Position, end: Position) -> Self {
        let collapsed = start.same_point(&end);
        let (start_stickiness, end_stickiness) = if collapsed {
            (Stickiness::ToNone, Stickiness::ToNone)
        } else {
            (Stickiness::ToNext, Stickiness::ToPrevious)
        };
        Self {
            start: start.with_stickiness(start_stickiness),
            end: end.with_stickiness(end_stickiness),
        }
    }

    pub fn collapsed(position: Position) -> Self {
        Range::between(position.clone(), position)
    }

    /// Range starting at `position` and spanning `shift` offset units of the same parent.
    pub fn from_position_and_shift(position: &Position, shift: usize) -> Self {
        Range::between(position.clone(), position.shifted_by(shift as isize))
    }

    /// Range covering exactly `node`.
    pub fn on(tree: &Tree, node: NodeId) -> Result<Self> {
        Ok(Range::between(
            Position::before(tree, node)?,
            Position::after(tree, node)?,
        ))
    }

    /// Range covering the whole content of `element`.
    pub fn inside(tree: &Tree, element: NodeId) -> Result<Self> {
        Ok(Range::between(
            Position::at_start(tree, element)?,
            Position::at_end(tree, element)?,
        ))
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    pub fn end(&self) -> &Position {
        &self.end
    }

    pub fn root(&self) -> &str {
        self.start.root()
    }

    pub fn is_collapsed(&self) -> bool {
        self.start.same_point(&self.end)
    }

    /// Both boundaries share a parent.
    pub fn is_flat(&self) -> bool {
        self.start.has_same_parent_as(&self.end)
    }

    /// Offset units covered by a flat range.
    pub fn offset_len(&self) -> usize {
        self.end.offset().saturating_sub(self.start.offset())
    }

    /// `position` lies strictly between the boundaries.
    pub fn contains_position(&self, position: &Position) -> bool {
        position.compare_with(&self.start) == PositionRelation::After
            && position.compare_with(&self.end) == PositionRelation::Before
    }

    /// With `loose`, boundaries equal to this range's boundaries count as contained.
    pub fn contains_range(&self, other: &Range, loose: bool) -> bool {
        let loose = loose && !other.is_collapsed();
        let contains_start = self.contains_position(&other.start)
            || (loose && self.start.same_point(&other.start));
        let contains_end =
            self.contains_position(&other.end) || (loose && self.end.same_point(&other.end));
        contains_start && contains_end
    }

    pub fn is_intersecting(&self, other: &Range) -> bool {
        self.start.compare_with(&other.end) == PositionRelation::Before
            && self.end.compare_with(&other.start) == PositionRelation::After
    }

    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.is_intersecting(other) {
            return None;
        }
        let start = if self.contains_position(&other.start) {
            other.start.clone()
        } else {
            self.start.clone()
        };
        let end = if self.contains_position(&other.end) {
            other.end.clone()
        } else {
            self.end.clone()
        };
        Some(Range::between(start, end))
    }

    /// Parts of this range not covered by `other`, in document order.
    pub fn difference(&self, other: &Range) -> Vec<Range> {
        if !self.is_intersecting(other) {
            return vec![self.clone()];
        }
        let mut ranges = Vec::new();
        if self.contains_position(&other.start) {
            ranges.push(Range::between(self.start.clone(), other.start.clone()));
        }
        if self.contains_position(&other.end) {
            ranges.push(Range::between(other.end.clone(), self.end.clone()));
        }
        ranges
    }

    /// Splits the range into the smallest ordered set of flat ranges covering the same content.
    pub fn minimal_flat_ranges(&self, tree: &Tree) -> Result<Vec<Range>> {
        let mut ranges = Vec::new();
        let diff_at = self.start.common_path(&self.end).len();
        let root = self.root().to_string();
        let mut path = self.start.path().to_vec();

        // up from the start towards the common ancestor
        while path.len() > diff_at + 1 {
            let here = Position::new(root.clone(), path.clone())?;
            let parent = tree.resolve(&here)?;
            let how_many = tree.max_offset(parent).saturating_sub(here.offset());
            if how_many != 0 {
                ranges.push(Range::from_position_and_shift(&here, how_many));
            }
            path.pop();
            if let Some(last) = path.last_mut() {
                *last += 1;
            }
        }

        // down towards the end
        while path.len() <= self.end.path().len() {
            let depth = path.len() - 1;
            let offset = self.end.path()[depth];
            let here = Position::new(root.clone(), path.clone())?;
            let how_many = offset.saturating_sub(here.offset());
            if how_many != 0 {
                ranges.push(Range::from_position_and_shift(&here, how_many));
            }
            path[depth] = offset;
            path.push(0);
        }
        Ok(ranges)
    }

    /// Items of a flat range.
    pub fn items<'a>(&self, tree: &'a Tree) -> Result<Vec<Item<'a>>> {
        if !self.is_flat() {
            return Err(Error::NonFlatRange);
        }
        let parent = tree.resolve(&self.start)?;
        tree.items(parent, self.start.offset(), self.end.offset())
    }

    pub fn common_ancestor(&self, tree: &Tree) -> Result<Option<NodeId>> {
        self.start.common_ancestor(&self.end, tree)
    }

    /// This range after `how_many` units were inserted at `position`. With `spread`, an
    /// insertion strictly inside the range and at its level splits it around the inserted
    /// content; deeper insertions never split.
    pub fn transformed_by_insertion(&self, position: &Position, how_many: usize, spread: bool) -> Vec<Range> {
        if spread && self.contains_position(position) && position.has_same_parent_as(&self.start) {
            return vec![
                Range::between(self.start.clone(), position.clone()),
                Range::between(
                    position.shifted_by(how_many as isize),
                    self.end.transformed_by_insertion(position, how_many),
                ),
            ];
        }
        vec![Range::between(
            self.start.transformed_by_insertion(position, how_many),
            self.end.transformed_by_insertion(position, how_many),
        )]
    }

    /// This range after `how_many` units were removed at `position`; `None` when the whole
    /// range was inside the removed content.
    pub fn transformed_by_deletion(&self, position: &Position, how_many: usize) -> Option<Range> {
        let start = self.start.transformed_by_deletion(position, how_many);
        let end = self.end.transformed_by_deletion(position, how_many);
        match (start, end) {
            (None, None) => None,
            (start, end) => Some(Range::between(
                start.unwrap_or_else(|| position.clone()),
                end.unwrap_or_else(|| position.clone()),
            )),
        }
    }

    /// Pieces of this range after `how_many` units moved from `source` to `target`.
    ///
    /// The part of the range that overlapped the moved content follows it; the remaining part
    /// stays. The pieces are returned in document order.
    pub fn transformed_by_move(
        &self,
        source: &Position,
        target: &Position,
        how_many: usize,
        spread: bool,
    ) -> Vec<Range> {
        if self.is_collapsed() {
            return vec![Range::collapsed(
                self.start.transformed_by_move(source, target, how_many),
            )];
        }

        let moved = Range::from_position_and_shift(source, how_many);
        let insert_position = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());

        if self.contains_position(target)
            && !spread
            && (moved.contains_position(&self.start) || moved.contains_position(&self.end))
        {
            return vec![Range::between(
                self.start.transformed_by_move(source, target, how_many),
                self.end.transformed_by_move(source, target, how_many),
            )];
        }

        let removed = |p: &Position| {
            p.transformed_by_deletion(source, how_many)
                .unwrap_or_else(|| source.clone())
        };
        let difference_set = self.difference(&moved);
        let common = self.intersection(&moved);
        let difference = match difference_set.as_slice() {
            [only] => Some(Range::between(removed(&only.start), removed(&only.end))),
            [_, _] => Some(Range::between(self.start.clone(), removed(&self.end))),
            _ => None,
        };

        let mut result = match difference {
            Some(difference) => difference.transformed_by_insertion(
                &insert_position,
                how_many,
                common.is_some() || spread,
            ),
            None => Vec::new(),
        };

        if let Some(common) = common {
            let transformed = Range::between(
                common.start.combined(moved.start(), &insert_position),
                common.end.combined(moved.start(), &insert_position),
            );
            if result.len() == 2 {
                result.insert(1, transformed);
            } else {
                result.push(transformed);
            }
        }
        result
    }

    /// Joins pieces produced by a transformation into one range. The first piece is the
    /// reference; neighbouring pieces that touch it on either side are absorbed.
    pub fn glue(mut ranges: Vec<Range>) -> Option<Range> {
        let reference = ranges.first()?.clone();
        if ranges.len() == 1 {
            return Some(reference);
        }
        ranges.sort_by(|a, b| match a.start.compare_with(&b.start) {
            PositionRelation::After => std::cmp::Ordering::Greater,
            PositionRelation::Before => std::cmp::Ordering::Less,
            _ => std::cmp::Ordering::Equal,
        });
        let reference_index = ranges.iter().position(|r| *r == reference)?;
        let mut start = reference.start.clone();
        let mut end = reference.end.clone();
        for range in ranges[..reference_index].iter().rev() {
            if range.end.same_point(&start) {
                start = range.start.clone();
            } else {
                break;
            }
        }
        for range in &ranges[reference_index + 1..] {
            if range.start.same_point(&end) {
                end = range.end.clone();
            } else {
                break;
            }
        }
        Some(Range::between(start, end))
    }
}
