use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::ops::Operation;
use crate::position::Position;
use crate::range::Range;
use crate::transform::transform_range;

/// A named range kept in sync with the document content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    name: String,
    range: Range,
    affects_data: bool,
}

impl Marker {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    /// Whether changing this marker counts as a data change (e.g. comments) rather than a
    /// purely visual one (e.g. search highlights).
    pub fn affects_data(&self) -> bool {
        self.affects_data
    }

    /// Group prefix: the part of the name before the first `:`.
    pub fn group(&self) -> &str {
        self.name.split(':').next().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MarkerCollection {
    markers: BTreeMap<String, Marker>,
}

impl MarkerCollection {
    pub fn get(&self, name: &str) -> Option<&Marker> {
        self.markers.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    /// Markers in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers whose range contains `position` or starts or ends at it.
    pub fn markers_at_position(&self, position: &Position) -> Vec<&Marker> {
        self.markers
            .values()
            .filter(|marker| {
                let range = &marker.range;
                range.contains_position(position)
                    || range.start().same_point(position)
                    || range.end().same_point(position)
            })
            .collect()
    }

    pub fn markers_intersecting(&self, range: &Range) -> Vec<&Marker> {
        self.markers
            .values()
            .filter(|marker| marker.range.intersection(range).is_some())
            .collect()
    }

    /// Markers named `<prefix>:...`.
    pub fn group(&self, prefix: &str) -> Vec<&Marker> {
        self.markers
            .values()
            .filter(|marker| {
                marker
                    .name
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with(':'))
            })
            .collect()
    }

    pub(crate) fn set(&mut self, name: &str, range: Range, affects_data: bool) -> Option<Marker> {
        self.markers.insert(
            name.to_string(),
            Marker {
                name: name.to_string(),
                range,
                affects_data,
            },
        )
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Marker> {
        self.markers.remove(name)
    }

    /// Rebases every marker over an applied operation. Markers whose root was detached are
    /// dropped.
    pub(crate) fn transform_all(&mut self, operation: &Operation) {
        self.markers.retain(|name, marker| match transform_range(&marker.range, operation) {
            Some(range) => {
                if range != marker.range {
                    trace!(marker = %name, "marker range updated");
                    marker.range = range;
                }
                true
            }
            None => {
                trace!(marker = %name, "marker dropped with its root");
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: usize, end: usize) -> Range {
        Range::new(
            Position::new("main", vec![start]).unwrap(),
            Position::new("main", vec![end]).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn queries_by_position_range_and_group() {
        let mut markers = MarkerCollection::default();
        markers.set("comment:1", range(1, 4), true);
        markers.set("comment:2", range(6, 8), true);
        markers.set("search", range(3, 5), false);
        markers.set("commentary", range(0, 1), false);

        let at = Position::new("main", vec![4]).unwrap();
        let names: Vec<_> = markers.markers_at_position(&at).iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["comment:1", "search"]);

        let hits: Vec<_> = markers
            .markers_intersecting(&range(5, 7))
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(hits, vec!["comment:2"]);

        let group: Vec<_> = markers.group("comment").iter().map(|m| m.name()).collect();
        assert_eq!(group, vec!["comment:1", "comment:2"]);
        assert_eq!(markers.get("comment:1").map(Marker::group), Some("comment"));
    }

    #[test]
    fn markers_follow_insertions() {
        let mut markers = MarkerCollection::default();
        markers.set("m", range(2, 4), false);
        let insert = Operation::insert(
            Some(0),
            &Position::new("main", vec![0]).unwrap(),
            crate::node::Node::text("ab"),
        );
        markers.transform_all(&insert);
        assert_eq!(markers.get("m").map(|m| m.range().clone()), Some(range(4, 6)));
    }
}
