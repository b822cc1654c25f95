use serde::{Deserialize, Serialize};

/// The lifecycle sub-intervals of a network request, in drawing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkPhase {
    /// From the marker start until the first known lifecycle timestamp.
    PreConnect,
    /// From `domainLookupStart` until `connectStart`.
    DomainLookup,
    /// From `connectStart` until `requestStart`.
    Connect,
    /// From `requestStart` until `responseEnd`.
    RequestResponse,
    /// From `responseEnd` until the marker end.
    PostResponse,
}

impl NetworkPhase {
    pub const ALL: [NetworkPhase; 5] = [
        Self::PreConnect,
        Self::DomainLookup,
        Self::Connect,
        Self::RequestResponse,
        Self::PostResponse,
    ];

    /// Fill opacity used when drawing this phase.
    pub fn opacity(self) -> f64 {
        match self {
            Self::PreConnect | Self::PostResponse => 0.0,
            Self::DomainLookup => 1.0 / 3.0,
            Self::Connect => 2.0 / 3.0,
            Self::RequestResponse => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PreConnect => "Waiting for socket thread",
            Self::DomainLookup => "DNS request",
            Self::Connect => "Connection",
            Self::RequestResponse => "Request and response",
            Self::PostResponse => "Waiting for main thread",
        }
    }
}

impl std::fmt::Display for NetworkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A pixel-space box for one phase, positioned relative to its bar's left
/// edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseBox {
    pub phase: NetworkPhase,
    pub left: f64,
    pub width: f64,
    pub opacity: f64,
}

/// The full geometry of one network marker row.
///
/// `left` and `width` are absolute pixels in the chart, including the left
/// margin. They are not clipped: markers crossing the visible range produce
/// negative `left` values or extend past the chart width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkChartBar {
    pub marker_index: usize,
    pub left: f64,
    pub width: f64,
    pub phases: Vec<PhaseBox>,
}

impl NetworkChartBar {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Phase boxes translated into absolute chart pixels.
    pub fn absolute_phases(&self) -> impl Iterator<Item = PhaseBox> + '_ {
        self.phases.iter().map(move |phase| PhaseBox {
            left: self.left + phase.left,
            ..*phase
        })
    }
}
