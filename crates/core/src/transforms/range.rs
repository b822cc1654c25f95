use proflens_protocol::StartEndRange;

use crate::model::{RawMarkerTable, SamplesTable, Thread};

/// Keep samples inside `[start, end)`.
pub fn filter_samples_to_range(samples: &SamplesTable, range: StartEndRange) -> SamplesTable {
    samples.filtered(|i| range.contains(samples.time[i]))
}

/// Keep markers overlapping the range. Markers without any timestamp are
/// dropped; an instant marker is a zero-length interval.
pub fn filter_markers_to_range(markers: &RawMarkerTable, range: StartEndRange) -> RawMarkerTable {
    markers.filtered(|i| {
        let (start, end) = (markers.start_time[i], markers.end_time[i]);
        match (start, end) {
            (Some(start), Some(end)) => range.overlaps(start, end),
            (Some(time), None) | (None, Some(time)) => range.overlaps(time, time),
            (None, None) => false,
        }
    })
}

/// Restrict a thread's samples and markers to a committed range. Stack,
/// frame and func tables are left untouched.
pub fn filter_thread_to_range(thread: &Thread, range: StartEndRange) -> Thread {
    Thread {
        samples: filter_samples_to_range(&thread.samples, range),
        markers: filter_markers_to_range(&thread.markers, range),
        ..thread.clone()
    }
}

/// Move every sample, marker and payload time by `delta` milliseconds.
pub fn shift_thread_times(thread: &mut Thread, delta: f64) {
    for time in &mut thread.samples.time {
        *time += delta;
    }
    let markers = &mut thread.markers;
    for time in markers
        .start_time
        .iter_mut()
        .chain(markers.end_time.iter_mut())
        .flatten()
    {
        *time += delta;
    }
    for payload in markers.data.iter_mut().flatten() {
        payload.shift_times(delta);
    }
}
