use serde::{Deserialize, Serialize};

/// A time range in milliseconds, relative to the profile's `meta.start_time`.
///
/// Sample membership is half-open (`start <= t < end`). Interval overlap
/// treats the range as closed at `start` so that markers ending exactly at
/// the range start are still considered visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartEndRange {
    pub start: f64,
    pub end: f64,
}

impl StartEndRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether a point in time falls inside `[start, end)`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether the interval `[start, end]` overlaps this range. Instant
    /// events pass the same value twice.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        start < self.end && end >= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let range = StartEndRange::new(10.0, 20.0);
        assert!(range.contains(10.0));
        assert!(range.contains(19.999));
        assert!(!range.contains(20.0));
        assert!(!range.contains(9.0));
    }

    #[test]
    fn overlaps_intervals_crossing_either_edge() {
        let range = StartEndRange::new(10.0, 20.0);
        assert!(range.overlaps(5.0, 12.0));
        assert!(range.overlaps(15.0, 40.0));
        assert!(range.overlaps(0.0, 100.0));
        assert!(range.overlaps(5.0, 10.0));
        assert!(!range.overlaps(20.0, 25.0));
        assert!(!range.overlaps(1.0, 9.0));
    }

    #[test]
    fn instant_overlap_matches_contains() {
        let range = StartEndRange::new(10.0, 20.0);
        for t in [9.0, 10.0, 15.0, 20.0] {
            assert_eq!(range.overlaps(t, t), range.contains(t), "t = {t}");
        }
    }
}
