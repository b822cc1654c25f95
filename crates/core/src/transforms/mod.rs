//! Thread-level transforms applied before building a call tree.

pub mod invert;
pub mod range;
pub mod search;

pub use invert::invert_call_stack;
pub use range::{filter_thread_to_range, shift_thread_times};
pub use search::filter_markers_by_search;
