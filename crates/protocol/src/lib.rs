pub mod flame_graph;
pub mod network;
pub mod range;

pub use flame_graph::{
    DEFAULT_SELECTABLE_THRESHOLD, FlameGraphRow, FlameGraphTiming, is_wide_enough,
};
pub use network::{NetworkChartBar, NetworkPhase, PhaseBox};
pub use range::StartEndRange;
