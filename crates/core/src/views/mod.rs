//! Derived, render-ready geometry. Everything here is a pure function of a
//! thread (or call tree) and the caller's view parameters.

pub mod flame_graph;
pub mod network_chart;

pub use flame_graph::{call_tree_for_thread, compute_flame_graph_timing, flame_graph_for_thread};
pub use network_chart::{
    NetworkChartError, NetworkMarker, compute_phases, network_chart_for_thread, network_markers,
};
