use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};

use proflens_core::memo::Memo;
use proflens_core::model::{CallTree, Profile, ThreadIndex};
use proflens_core::parsers;
use proflens_core::sanitize::{self, RemoveProfileInformation, ThreadIndexMapping};
use proflens_core::views::{call_tree_for_thread, compute_flame_graph_timing, network_chart_for_thread};
use proflens_protocol::StartEndRange;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Everything the call tree depends on besides the profile itself.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CallTreeKey {
    thread_index: ThreadIndex,
    range: Option<StartEndRange>,
    invert: bool,
}

struct LoadedProfile {
    profile: Profile,
    call_tree: Memo<CallTreeKey, CallTree>,
}

impl LoadedProfile {
    fn new(profile: Profile) -> Self {
        Self {
            profile,
            call_tree: Memo::new(),
        }
    }

    fn call_tree(&mut self, key: CallTreeKey) -> Result<&CallTree, JsError> {
        let thread = self
            .profile
            .thread(key.thread_index)
            .ok_or_else(|| JsError::new("invalid thread index"))?;
        self.call_tree
            .try_get_or_insert_with(key, || call_tree_for_thread(thread, key.range, key.invert))
            .map_err(js_error)
    }
}

/// Loaded profiles by handle. Unloading leaves a tombstone so handles are
/// never reused.
struct Registry {
    slots: Vec<Option<LoadedProfile>>,
}

impl Registry {
    const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    fn insert(&mut self, profile: Profile) -> usize {
        self.slots.push(Some(LoadedProfile::new(profile)));
        self.slots.len() - 1
    }

    fn get_mut(&mut self, handle: usize) -> Option<&mut LoadedProfile> {
        self.slots.get_mut(handle)?.as_mut()
    }

    fn remove(&mut self, handle: usize) -> Option<LoadedProfile> {
        self.slots.get_mut(handle)?.take()
    }

    fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

static PROFILES: Mutex<Registry> = Mutex::new(Registry::new());

fn js_error(error: impl Display) -> JsError {
    JsError::new(&error.to_string())
}

fn profiles() -> Result<MutexGuard<'static, Registry>, JsError> {
    PROFILES
        .lock()
        .map_err(|_| JsError::new("profile registry is poisoned"))
}

fn loaded(profiles: &mut Registry, handle: usize) -> Result<&mut LoadedProfile, JsError> {
    profiles
        .get_mut(handle)
        .ok_or_else(|| JsError::new("invalid or unloaded profile handle"))
}

fn committed_range(start: Option<f64>, end: Option<f64>) -> Option<StartEndRange> {
    Some(StartEndRange::new(start?, end?))
}

/// Parse a processed profile from JSON bytes. Returns a handle for later
/// calls.
#[wasm_bindgen]
pub fn load_profile(data: &[u8]) -> Result<usize, JsError> {
    let profile = parsers::parse_profile(data).map_err(js_error)?;
    let mut profiles = profiles()?;
    let handle = profiles.insert(profile);
    tracing::debug!(handle, "loaded profile");
    Ok(handle)
}

/// Release a loaded profile and its cached call tree. Other handles stay
/// valid; the released handle is never handed out again.
#[wasm_bindgen]
pub fn unload_profile(handle: usize) -> Result<(), JsError> {
    let mut profiles = profiles()?;
    profiles
        .remove(handle)
        .ok_or_else(|| JsError::new("invalid or unloaded profile handle"))?;
    tracing::debug!(handle, live = profiles.live_count(), "unloaded profile");
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSummary<'a> {
    name: &'a str,
    process_name: Option<&'a str>,
    pid: &'a str,
    is_main_thread: bool,
    sample_count: usize,
    marker_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSummary<'a> {
    product: &'a str,
    start_time: f64,
    interval: f64,
    end_time: f64,
    threads: Vec<ThreadSummary<'a>>,
}

/// Product, timing and per-thread summary as JSON.
#[wasm_bindgen]
pub fn get_profile_metadata(handle: usize) -> Result<String, JsError> {
    let mut profiles = profiles()?;
    let profile = &loaded(&mut profiles, handle)?.profile;
    let summary = ProfileSummary {
        product: &profile.meta.product,
        start_time: profile.meta.start_time,
        interval: profile.meta.interval,
        end_time: profile.end_time(),
        threads: profile
            .threads
            .iter()
            .map(|thread| ThreadSummary {
                name: &thread.name,
                process_name: thread.process_name.as_deref(),
                pid: &thread.pid,
                is_main_thread: thread.is_main_thread,
                sample_count: thread.samples.len(),
                marker_count: thread.markers.len(),
            })
            .collect(),
    };
    serde_json::to_string(&summary).map_err(js_error)
}

#[wasm_bindgen]
pub fn get_thread_count(handle: usize) -> Result<usize, JsError> {
    let mut profiles = profiles()?;
    Ok(loaded(&mut profiles, handle)?.profile.threads.len())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SanitizeResult {
    handle: usize,
    committed_range: Option<StartEndRange>,
    old_thread_index_to_new: ThreadIndexMapping,
}

/// Sanitize a loaded profile with a JSON directive (`null` for none).
///
/// A sanitized profile is registered under a new handle; the original
/// stays loaded so the caller can still discard the result.
#[wasm_bindgen]
pub fn sanitize_profile(handle: usize, directive: &str) -> Result<String, JsError> {
    let directive: Option<RemoveProfileInformation> =
        serde_json::from_str(directive).map_err(js_error)?;
    let mut profiles = profiles()?;
    let sanitized = sanitize::sanitize(&loaded(&mut profiles, handle)?.profile, directive.as_ref())
        .map_err(js_error)?;

    let committed_range = sanitized.committed_range;
    let old_thread_index_to_new = sanitized.old_thread_index_to_new.clone();
    let handle = if sanitized.is_sanitized() {
        let profile = sanitized.into_profile();
        profiles.insert(profile)
    } else {
        handle
    };
    serde_json::to_string(&SanitizeResult {
        handle,
        committed_range,
        old_thread_index_to_new,
    })
    .map_err(js_error)
}

/// Flame graph rows for one thread as JSON. Both range bounds must be set
/// for the range to apply.
#[wasm_bindgen]
pub fn flame_graph_timing(
    handle: usize,
    thread_index: usize,
    range_start: Option<f64>,
    range_end: Option<f64>,
    invert: bool,
) -> Result<String, JsError> {
    let mut profiles = profiles()?;
    let tree = loaded(&mut profiles, handle)?.call_tree(CallTreeKey {
        thread_index,
        range: committed_range(range_start, range_end),
        invert,
    })?;
    serde_json::to_string(&compute_flame_graph_timing(tree)).map_err(js_error)
}

/// The func path of a call node as a JSON array; `[]` when nothing is
/// selected.
#[wasm_bindgen]
pub fn call_node_path(
    handle: usize,
    thread_index: usize,
    range_start: Option<f64>,
    range_end: Option<f64>,
    invert: bool,
    call_node: Option<usize>,
) -> Result<String, JsError> {
    let mut profiles = profiles()?;
    let tree = loaded(&mut profiles, handle)?.call_tree(CallTreeKey {
        thread_index,
        range: committed_range(range_start, range_end),
        invert,
    })?;
    serde_json::to_string(&tree.path(call_node)).map_err(js_error)
}

/// Resolve a JSON func path back to a call node. `undefined` when the path
/// no longer exists.
#[wasm_bindgen]
pub fn call_node_index(
    handle: usize,
    thread_index: usize,
    range_start: Option<f64>,
    range_end: Option<f64>,
    invert: bool,
    path: &str,
) -> Result<Option<usize>, JsError> {
    let path: Vec<usize> = serde_json::from_str(path).map_err(js_error)?;
    let mut profiles = profiles()?;
    let tree = loaded(&mut profiles, handle)?.call_tree(CallTreeKey {
        thread_index,
        range: committed_range(range_start, range_end),
        invert,
    })?;
    Ok(tree.node_for_path(&path))
}

/// Network chart bars for one thread as JSON.
#[wasm_bindgen]
pub fn network_chart(
    handle: usize,
    thread_index: usize,
    visible_start: f64,
    visible_end: f64,
    pixel_width: f64,
    margin_left: f64,
) -> Result<String, JsError> {
    let mut profiles = profiles()?;
    let thread = loaded(&mut profiles, handle)?
        .profile
        .thread(thread_index)
        .ok_or_else(|| JsError::new("invalid thread index"))?;
    let bars = network_chart_for_thread(
        thread,
        StartEndRange::new(visible_start, visible_end),
        pixel_width,
        margin_left,
    )
    .map_err(js_error)?;
    serde_json::to_string(&bars).map_err(js_error)
}

/// The byte snapshot to upload.
#[wasm_bindgen]
pub fn serialize_profile(handle: usize) -> Result<Vec<u8>, JsError> {
    let mut profiles = profiles()?;
    parsers::serialize_profile(&loaded(&mut profiles, handle)?.profile).map_err(js_error)
}
