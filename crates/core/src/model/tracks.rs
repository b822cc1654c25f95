use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::profile::CounterIndex;
use super::thread::{Pid, ThreadIndex};

/// Timeline tracks. Global tracks are top-level rows; local tracks hang
/// under the process track with the same pid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracks {
    #[serde(default)]
    pub global: Vec<GlobalTrack>,
    #[serde(default)]
    pub local: BTreeMap<Pid, Vec<LocalTrack>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum GlobalTrack {
    /// A process row. `main_thread_index` is `None` for processes whose
    /// main thread is absent, in which case only local tracks are shown.
    Process {
        pid: Pid,
        main_thread_index: Option<ThreadIndex>,
    },
    Screenshots {
        id: String,
        thread_index: ThreadIndex,
    },
    VisualProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum LocalTrack {
    Thread { thread_index: ThreadIndex },
    Network { thread_index: ThreadIndex },
    Ipc { thread_index: ThreadIndex },
    Memory { counter_index: CounterIndex },
}

impl GlobalTrack {
    pub fn thread_index(&self) -> Option<ThreadIndex> {
        match self {
            GlobalTrack::Process {
                main_thread_index, ..
            } => *main_thread_index,
            GlobalTrack::Screenshots { thread_index, .. } => Some(*thread_index),
            GlobalTrack::VisualProgress => None,
        }
    }
}

impl LocalTrack {
    pub fn thread_index(&self) -> Option<ThreadIndex> {
        match self {
            LocalTrack::Thread { thread_index }
            | LocalTrack::Network { thread_index }
            | LocalTrack::Ipc { thread_index } => Some(*thread_index),
            LocalTrack::Memory { .. } => None,
        }
    }
}

impl Tracks {
    /// Every thread index referenced by any track, in track order.
    pub fn thread_indexes(&self) -> impl Iterator<Item = ThreadIndex> + '_ {
        let global = self.global.iter().filter_map(GlobalTrack::thread_index);
        let local = self
            .local
            .values()
            .flatten()
            .filter_map(LocalTrack::thread_index);
        global.chain(local)
    }

    /// Every counter index referenced by a memory track.
    pub fn counter_indexes(&self) -> impl Iterator<Item = CounterIndex> + '_ {
        self.local.values().flatten().filter_map(|track| match track {
            LocalTrack::Memory { counter_index } => Some(*counter_index),
            _ => None,
        })
    }
}
