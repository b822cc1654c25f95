use std::collections::{BTreeMap, BTreeSet};

use crate::model::{CounterIndex, GlobalTrack, LocalTrack, ThreadIndex, Tracks};

use super::ThreadIndexMapping;

/// Rewrite every track reference through the thread and counter mappings.
///
/// Tracks pointing at a removed thread or counter disappear, as do
/// screenshot tracks of threads whose screenshots were stripped. A process
/// track survives the loss of its main thread only while local tracks
/// remain under its pid.
pub(crate) fn remap_tracks(
    tracks: &Tracks,
    threads: &ThreadIndexMapping,
    counters: &[Option<CounterIndex>],
    screenshots_removed: &BTreeSet<ThreadIndex>,
) -> Tracks {
    let mut local = BTreeMap::new();
    for (pid, pid_tracks) in &tracks.local {
        let remapped: Vec<LocalTrack> = pid_tracks
            .iter()
            .filter_map(|track| remap_local_track(track, threads, counters))
            .collect();
        if !remapped.is_empty() {
            local.insert(pid.clone(), remapped);
        }
    }

    let global = tracks
        .global
        .iter()
        .filter_map(|track| match track {
            GlobalTrack::Process {
                pid,
                main_thread_index,
            } => {
                let main_thread_index = main_thread_index.and_then(|index| threads.get(index));
                (main_thread_index.is_some() || local.contains_key(pid)).then(|| {
                    GlobalTrack::Process {
                        pid: pid.clone(),
                        main_thread_index,
                    }
                })
            }
            GlobalTrack::Screenshots { id, thread_index } => {
                if screenshots_removed.contains(thread_index) {
                    return None;
                }
                threads
                    .get(*thread_index)
                    .map(|thread_index| GlobalTrack::Screenshots {
                        id: id.clone(),
                        thread_index,
                    })
            }
            GlobalTrack::VisualProgress => Some(GlobalTrack::VisualProgress),
        })
        .collect();

    Tracks { global, local }
}

fn remap_local_track(
    track: &LocalTrack,
    threads: &ThreadIndexMapping,
    counters: &[Option<CounterIndex>],
) -> Option<LocalTrack> {
    Some(match *track {
        LocalTrack::Thread { thread_index } => LocalTrack::Thread {
            thread_index: threads.get(thread_index)?,
        },
        LocalTrack::Network { thread_index } => LocalTrack::Network {
            thread_index: threads.get(thread_index)?,
        },
        LocalTrack::Ipc { thread_index } => LocalTrack::Ipc {
            thread_index: threads.get(thread_index)?,
        },
        LocalTrack::Memory { counter_index } => LocalTrack::Memory {
            counter_index: counters.get(counter_index).copied().flatten()?,
        },
    })
}
