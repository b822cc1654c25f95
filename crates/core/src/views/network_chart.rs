use proflens_protocol::{NetworkChartBar, NetworkPhase, PhaseBox, StartEndRange};
use thiserror::Error;

use crate::model::{MarkerPayload, NetworkPayload, Thread};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkChartError {
    #[error("network marker {marker_index} has no usable start or end time")]
    IncompleteMarker { marker_index: usize },
    #[error("visible range has no duration")]
    EmptyVisibleRange,
}

/// A network marker row with its payload borrowed from the thread.
#[derive(Debug, Clone, Copy)]
pub struct NetworkMarker<'a> {
    /// Row in the thread's marker table.
    pub index: usize,
    pub name: &'a str,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub payload: &'a NetworkPayload,
}

/// Every marker carrying a network payload, in marker table order.
pub fn network_markers(thread: &Thread) -> Vec<NetworkMarker<'_>> {
    let markers = &thread.markers;
    markers
        .data
        .iter()
        .enumerate()
        .filter_map(|(index, data)| match data {
            Some(MarkerPayload::Network(payload)) => Some(NetworkMarker {
                index,
                name: thread.string(markers.name[index]).unwrap_or_default(),
                start: markers.start_time[index],
                end: markers.end_time[index],
                payload,
            }),
            _ => None,
        })
        .collect()
}

/// Pixel geometry for one network marker.
///
/// The bar spans the marker's start to end mapped into `pixel_width` pixels
/// for the `visible` range and shifted by `margin_left`. Phase boxes are
/// relative to the bar's left edge: a pre-connect phase from the marker
/// start, then one phase per lifecycle timestamp present in the payload.
/// Missing timestamps fold their phase into the one before. A payload with
/// no lifecycle timestamps is drawn as a single request/response phase.
pub fn compute_phases(
    marker: &NetworkMarker<'_>,
    visible: StartEndRange,
    pixel_width: f64,
    margin_left: f64,
) -> Result<NetworkChartBar, NetworkChartError> {
    let incomplete = NetworkChartError::IncompleteMarker {
        marker_index: marker.index,
    };
    let (Some(start), Some(end)) = (marker.start, marker.end) else {
        return Err(incomplete);
    };
    if !start.is_finite() || !end.is_finite() {
        return Err(incomplete);
    }
    let duration = visible.duration();
    if duration.is_nan() || duration <= 0.0 {
        return Err(NetworkChartError::EmptyVisibleRange);
    }

    let to_pixels = |ms: f64| ms / duration * pixel_width;
    let end = end.max(start);
    let bar_width = to_pixels(end - start);

    let boundaries = lifecycle_boundaries(marker.payload, start, end);
    let phases = if boundaries.is_empty() {
        vec![phase_box(NetworkPhase::RequestResponse, 0.0, bar_width)]
    } else {
        let mut phases = Vec::with_capacity(boundaries.len() + 1);
        let mut current = (NetworkPhase::PreConnect, start);
        for next in boundaries {
            phases.push(phase_box(
                current.0,
                to_pixels(current.1 - start),
                to_pixels(next.1 - current.1),
            ));
            current = next;
        }
        phases.push(phase_box(
            current.0,
            to_pixels(current.1 - start),
            to_pixels(end - current.1),
        ));
        phases
    };

    Ok(NetworkChartBar {
        marker_index: marker.index,
        left: margin_left + to_pixels(start - visible.start),
        width: bar_width,
        phases,
    })
}

/// Bars for every drawable network marker of `thread`.
///
/// Markers still in flight (no end) or otherwise missing a time are skipped;
/// an empty visible range fails the whole chart.
pub fn network_chart_for_thread(
    thread: &Thread,
    visible: StartEndRange,
    pixel_width: f64,
    margin_left: f64,
) -> Result<Vec<NetworkChartBar>, NetworkChartError> {
    let mut bars = Vec::new();
    for marker in network_markers(thread) {
        match compute_phases(&marker, visible, pixel_width, margin_left) {
            Ok(bar) => bars.push(bar),
            Err(NetworkChartError::IncompleteMarker { marker_index }) => {
                tracing::trace!(marker_index, "skipping incomplete network marker");
            }
            Err(error) => return Err(error),
        }
    }
    Ok(bars)
}

/// The phase-starting timestamps present in `payload`, clamped so they
/// never run backwards or leave `start..=end`.
fn lifecycle_boundaries(
    payload: &NetworkPayload,
    start: f64,
    end: f64,
) -> Vec<(NetworkPhase, f64)> {
    let mut previous = start;
    [
        (NetworkPhase::DomainLookup, payload.domain_lookup_start),
        (NetworkPhase::Connect, payload.connect_start),
        (NetworkPhase::RequestResponse, payload.request_start),
        (NetworkPhase::PostResponse, payload.response_end),
    ]
    .into_iter()
    .filter_map(|(phase, time)| {
        let time = time.filter(|time| time.is_finite())?.clamp(previous, end);
        previous = time;
        Some((phase, time))
    })
    .collect()
}

fn phase_box(phase: NetworkPhase, left: f64, width: f64) -> PhaseBox {
    PhaseBox {
        phase,
        left,
        width,
        opacity: phase.opacity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ThreadBuilder;

    const EPSILON: f64 = 1e-9;

    fn marker(payload: &NetworkPayload) -> NetworkMarker<'_> {
        NetworkMarker {
            index: 0,
            name: "Load 1",
            start: Some(10.0),
            end: Some(109.0),
            payload,
        }
    }

    fn assert_phases(bar: &NetworkChartBar, expected: &[(NetworkPhase, f64, f64)]) {
        assert_eq!(bar.phases.len(), expected.len(), "{:?}", bar.phases);
        for (phase, &(kind, left, width)) in bar.phases.iter().zip(expected) {
            assert_eq!(phase.phase, kind);
            assert!((phase.left - left).abs() < EPSILON, "{phase:?}");
            assert!((phase.width - width).abs() < EPSILON, "{phase:?}");
            assert_eq!(phase.opacity, kind.opacity());
        }
    }

    #[test]
    fn every_lifecycle_timestamp_gets_a_phase() {
        let payload = NetworkPayload {
            domain_lookup_start: Some(20.0),
            connect_start: Some(30.0),
            request_start: Some(60.0),
            response_end: Some(80.0),
            ..Default::default()
        };
        let bar = compute_phases(&marker(&payload), StartEndRange::new(0.0, 100.0), 200.0, 30.0)
            .expect("complete marker");
        assert!((bar.left - 50.0).abs() < EPSILON);
        assert!((bar.width - 198.0).abs() < EPSILON);
        assert_phases(
            &bar,
            &[
                (NetworkPhase::PreConnect, 0.0, 20.0),
                (NetworkPhase::DomainLookup, 20.0, 20.0),
                (NetworkPhase::Connect, 40.0, 60.0),
                (NetworkPhase::RequestResponse, 100.0, 40.0),
                (NetworkPhase::PostResponse, 140.0, 58.0),
            ],
        );
    }

    #[test]
    fn missing_timestamps_merge_into_previous_phase() {
        let payload = NetworkPayload {
            connect_start: Some(20.0),
            request_start: Some(60.0),
            response_end: Some(80.0),
            ..Default::default()
        };
        let bar = compute_phases(&marker(&payload), StartEndRange::new(0.0, 100.0), 200.0, 30.0)
            .expect("complete marker");
        assert_phases(
            &bar,
            &[
                (NetworkPhase::PreConnect, 0.0, 20.0),
                (NetworkPhase::Connect, 20.0, 80.0),
                (NetworkPhase::RequestResponse, 100.0, 40.0),
                (NetworkPhase::PostResponse, 140.0, 58.0),
            ],
        );
    }

    #[test]
    fn no_lifecycle_detail_is_one_solid_phase() {
        let payload = NetworkPayload::default();
        let bar = compute_phases(&marker(&payload), StartEndRange::new(0.0, 100.0), 200.0, 30.0)
            .expect("complete marker");
        assert_phases(&bar, &[(NetworkPhase::RequestResponse, 0.0, bar.width)]);
        assert_eq!(bar.phases[0].opacity, 1.0);
    }

    #[test]
    fn markers_crossing_the_range_are_not_clipped() {
        let payload = NetworkPayload {
            request_start: Some(60.0),
            ..Default::default()
        };
        let bar = compute_phases(&marker(&payload), StartEndRange::new(50.0, 100.0), 200.0, 30.0)
            .expect("complete marker");
        assert!((bar.left - -130.0).abs() < EPSILON);
        assert!((bar.width - 396.0).abs() < EPSILON);
        assert_phases(
            &bar,
            &[
                (NetworkPhase::PreConnect, 0.0, 200.0),
                (NetworkPhase::RequestResponse, 200.0, 196.0),
            ],
        );
        let first = bar.absolute_phases().next().expect("phase");
        assert!((first.left - -130.0).abs() < EPSILON);
    }

    #[test]
    fn out_of_order_timestamps_are_clamped() {
        let payload = NetworkPayload {
            connect_start: Some(40.0),
            request_start: Some(30.0),
            response_end: Some(500.0),
            ..Default::default()
        };
        let bar = compute_phases(&marker(&payload), StartEndRange::new(0.0, 100.0), 200.0, 0.0)
            .expect("complete marker");
        assert_phases(
            &bar,
            &[
                (NetworkPhase::PreConnect, 0.0, 60.0),
                (NetworkPhase::Connect, 60.0, 0.0),
                (NetworkPhase::RequestResponse, 60.0, 138.0),
                (NetworkPhase::PostResponse, 198.0, 0.0),
            ],
        );
    }

    #[test]
    fn incomplete_markers_are_errors() {
        let payload = NetworkPayload::default();
        let mut no_end = marker(&payload);
        no_end.index = 4;
        no_end.end = None;
        assert_eq!(
            compute_phases(&no_end, StartEndRange::new(0.0, 100.0), 200.0, 0.0),
            Err(NetworkChartError::IncompleteMarker { marker_index: 4 })
        );
        let mut nan_start = marker(&payload);
        nan_start.start = Some(f64::NAN);
        assert!(compute_phases(&nan_start, StartEndRange::new(0.0, 100.0), 200.0, 0.0).is_err());
    }

    #[test]
    fn empty_visible_range_is_an_error() {
        let payload = NetworkPayload::default();
        assert_eq!(
            compute_phases(&marker(&payload), StartEndRange::new(5.0, 5.0), 200.0, 0.0),
            Err(NetworkChartError::EmptyVisibleRange)
        );
    }

    #[test]
    fn chart_skips_incomplete_markers() {
        let network = |id| {
            Some(MarkerPayload::Network(NetworkPayload {
                id,
                ..Default::default()
            }))
        };
        let thread = ThreadBuilder::new("Main", "1", 1)
            .marker("Load 1", Some(0.0), Some(10.0), network(1))
            .marker("Load 2", Some(5.0), None, network(2))
            .marker("Load 3", Some(20.0), Some(30.0), network(3))
            .build();
        let bars = network_chart_for_thread(&thread, StartEndRange::new(0.0, 40.0), 400.0, 0.0)
            .expect("non-empty range");
        let indexes: Vec<usize> = bars.iter().map(|bar| bar.marker_index).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert!((bars[1].left - 200.0).abs() < EPSILON);
        assert_eq!(
            network_chart_for_thread(&thread, StartEndRange::new(1.0, 0.0), 400.0, 0.0),
            Err(NetworkChartError::EmptyVisibleRange)
        );
    }

    #[test]
    fn network_markers_skip_other_payloads() {
        let thread = ThreadBuilder::new("Main", "1", 1)
            .marker("DOMEvent", Some(0.0), Some(1.0), None)
            .marker(
                "Load 7: https://a.test/",
                Some(2.0),
                None,
                Some(MarkerPayload::Network(NetworkPayload {
                    id: 7,
                    ..Default::default()
                })),
            )
            .build();
        let markers = network_markers(&thread);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].index, 1);
        assert_eq!(markers[0].name, "Load 7: https://a.test/");
        assert_eq!(markers[0].payload.id, 7);
        assert_eq!(markers[0].end, None);
    }
}
