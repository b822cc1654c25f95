use serde::{Deserialize, Serialize};

/// Boxes narrower than this fraction of the whole graph are skipped by
/// keyboard navigation.
pub const DEFAULT_SELECTABLE_THRESHOLD: f64 = 0.001;

/// One depth level of a flame graph.
///
/// The columns are parallel: box `i` is `call_node[i]` spanning
/// `start[i]..end[i]`, with `self_relative[i]` being the node's own weight as
/// a fraction of the whole graph. Boxes are sorted by `start` and never
/// overlap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlameGraphRow {
    pub call_node: Vec<usize>,
    pub start: Vec<f64>,
    pub end: Vec<f64>,
    pub self_relative: Vec<f64>,
}

impl FlameGraphRow {
    pub fn len(&self) -> usize {
        self.call_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.call_node.is_empty()
    }

    pub fn push(&mut self, call_node: usize, start: f64, end: f64, self_relative: f64) {
        self.call_node.push(call_node);
        self.start.push(start);
        self.end.push(end);
        self.self_relative.push(self_relative);
    }

    pub fn width(&self, column: usize) -> f64 {
        self.end[column] - self.start[column]
    }

    /// Column of the box containing `x`, if any.
    pub fn column_at(&self, x: f64) -> Option<usize> {
        let after = self.start.partition_point(|&start| start <= x);
        let column = after.checked_sub(1)?;
        (x < self.end[column]).then_some(column)
    }
}

/// Flame graph layout in normalized `[0, 1]` space, one row per call depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlameGraphTiming {
    pub rows: Vec<FlameGraphRow>,
}

impl FlameGraphTiming {
    pub fn depth_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, depth: usize) -> Option<&FlameGraphRow> {
        self.rows.get(depth)
    }

    /// Find the `(depth, column)` of the box under a normalized `x`.
    pub fn hit_test(&self, depth: usize, x: f64) -> Option<(usize, usize)> {
        let column = self.row(depth)?.column_at(x)?;
        Some((depth, column))
    }

    /// Total number of boxes across all rows.
    pub fn box_count(&self) -> usize {
        self.rows.iter().map(FlameGraphRow::len).sum()
    }
}

/// Whether a box spanning `start..end` is wide enough to be selected.
pub fn is_wide_enough(start: f64, end: f64, threshold: f64) -> bool {
    end - start > threshold
}
