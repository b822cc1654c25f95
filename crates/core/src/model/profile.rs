use serde::{Deserialize, Serialize};

use super::thread::{Pid, Thread, ThreadIndex};
use super::tracks::Tracks;

pub type CounterIndex = usize;

/// Installed browser extensions, as parallel columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionTable {
    pub id: Vec<String>,
    pub name: Vec<String>,
    #[serde(rename = "baseURL")]
    pub base_url: Vec<String>,
}

impl ExtensionTable {
    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMeta {
    /// Absolute start of the profile in milliseconds since the epoch. All
    /// thread times are relative to it.
    pub start_time: f64,
    /// Sampling interval in milliseconds.
    pub interval: f64,
    pub product: String,
    /// The page the profile was captured from or loaded from.
    #[serde(default, rename = "sourceURL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiling_start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiling_end_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(rename = "tabID")]
    pub tab_id: u64,
    #[serde(rename = "innerWindowID")]
    pub inner_window_id: u64,
    pub url: String,
    #[serde(rename = "embedderInnerWindowID", default)]
    pub embedder_inner_window_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterSamples {
    pub time: Vec<f64>,
    pub count: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub name: String,
    pub category: String,
    pub description: String,
    pub pid: Pid,
    pub main_thread_index: ThreadIndex,
    pub samples: CounterSamples,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub meta: ProfileMeta,
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub counters: Vec<Counter>,
    #[serde(default)]
    pub tracks: Tracks,
}

impl Profile {
    pub fn thread(&self, index: ThreadIndex) -> Option<&Thread> {
        self.threads.get(index)
    }

    /// The latest sample or marker time across all threads, relative to
    /// `meta.start_time`.
    pub fn end_time(&self) -> f64 {
        self.threads
            .iter()
            .flat_map(|thread| {
                let samples = thread.samples.time.last().copied();
                let markers = thread
                    .markers
                    .start_time
                    .iter()
                    .zip(&thread.markers.end_time)
                    .filter_map(|(start, end)| end.or(*start));
                samples.into_iter().chain(markers)
            })
            .fold(0.0, f64::max)
    }
}
