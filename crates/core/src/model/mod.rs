pub mod builder;
pub mod call_tree;
pub mod markers;
pub mod profile;
pub mod thread;
pub mod tracks;

pub use builder::ThreadBuilder;
pub use call_tree::{
    CallNodePath, CallNodeTable, CallTree, CallTreeError, IndexIntoCallNodeTable,
    build_call_node_table, get_call_node_index_from_path, get_call_node_path_from_index,
};
pub use markers::{MarkerPayload, NetworkPayload, NetworkStatus, RawMarkerTable};
pub use profile::{
    Counter, CounterIndex, CounterSamples, ExtensionTable, Page, Profile, ProfileMeta,
};
pub use thread::{
    FrameTable, FuncTable, IndexIntoFrameTable, IndexIntoFuncTable, IndexIntoStackTable,
    IndexIntoStringTable, Pid, SamplesTable, StackTable, Thread, ThreadIndex, Tid,
};
pub use tracks::{GlobalTrack, LocalTrack, Tracks};
