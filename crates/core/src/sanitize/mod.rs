//! Removal of personally identifying information before a profile is shared.
//!
//! [`sanitize`] never mutates its input. Without a directive it hands the
//! profile back borrowed; otherwise it builds a new profile plus the
//! old-to-new thread index mapping callers need to fix up their own state
//! (selected thread, URL state).

pub mod redact;
mod tracks;

use std::borrow::Cow;
use std::collections::BTreeSet;

use proflens_protocol::StartEndRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Counter, CounterIndex, CounterSamples, ExtensionTable, IndexIntoStringTable, MarkerPayload,
    Profile, Thread, ThreadIndex,
};
use crate::transforms::{filter_thread_to_range, shift_thread_times};

pub use redact::{remove_file_path, remove_urls, remove_urls_in_place, remove_urls_in_value};

/// What to strip from a profile. An all-default directive removes nothing
/// but still produces an owned copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoveProfileInformation {
    pub should_filter_to_committed_range: Option<StartEndRange>,
    pub should_remove_urls: bool,
    pub should_remove_threads_with_screenshots: BTreeSet<ThreadIndex>,
    pub should_remove_threads: BTreeSet<ThreadIndex>,
    pub should_remove_extensions: bool,
    pub should_remove_preference_values: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("thread index {thread_index} is out of range for {thread_count} threads")]
    InvalidThreadIndex {
        thread_index: ThreadIndex,
        thread_count: usize,
    },
}

/// Old thread index to new thread index. `None` marks a removed thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadIndexMapping(Vec<Option<ThreadIndex>>);

impl ThreadIndexMapping {
    pub fn identity(thread_count: usize) -> Self {
        Self((0..thread_count).map(Some).collect())
    }

    /// Drop `removed` from `0..thread_count`, packing the survivors in
    /// their original order.
    pub fn without(thread_count: usize, removed: &BTreeSet<ThreadIndex>) -> Self {
        let mut next = 0;
        Self(
            (0..thread_count)
                .map(|old| {
                    if removed.contains(&old) {
                        return None;
                    }
                    next += 1;
                    Some(next - 1)
                })
                .collect(),
        )
    }

    /// The new index of `old`, or `None` if it was removed or never existed.
    pub fn get(&self, old: ThreadIndex) -> Option<ThreadIndex> {
        self.0.get(old).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(old, new)| *new == Some(old))
    }

    pub fn removed_count(&self) -> usize {
        self.0.iter().filter(|new| new.is_none()).count()
    }
}

#[derive(Debug, Clone)]
pub struct SanitizedProfile<'a> {
    pub profile: Cow<'a, Profile>,
    /// The range the profile was clipped to. Callers reset their committed
    /// range when this is set, since times now start at zero.
    pub committed_range: Option<StartEndRange>,
    pub old_thread_index_to_new: ThreadIndexMapping,
}

impl SanitizedProfile<'_> {
    /// Whether a new profile was produced.
    pub fn is_sanitized(&self) -> bool {
        matches!(self.profile, Cow::Owned(_))
    }

    pub fn into_profile(self) -> Profile {
        self.profile.into_owned()
    }
}

/// Apply `directive` to `profile`.
///
/// With no directive this is the identity: the profile comes back
/// borrowed with an identity mapping.
pub fn sanitize<'a>(
    profile: &'a Profile,
    directive: Option<&RemoveProfileInformation>,
) -> Result<SanitizedProfile<'a>, SanitizeError> {
    let thread_count = profile.threads.len();
    let Some(directive) = directive else {
        return Ok(SanitizedProfile {
            profile: Cow::Borrowed(profile),
            committed_range: None,
            old_thread_index_to_new: ThreadIndexMapping::identity(thread_count),
        });
    };

    if let Some(&thread_index) = directive
        .should_remove_threads
        .iter()
        .chain(&directive.should_remove_threads_with_screenshots)
        .find(|&&index| index >= thread_count)
    {
        return Err(SanitizeError::InvalidThreadIndex {
            thread_index,
            thread_count,
        });
    }

    let mapping = ThreadIndexMapping::without(thread_count, &directive.should_remove_threads);
    let range = directive.should_filter_to_committed_range;

    let threads: Vec<Thread> = profile
        .threads
        .iter()
        .enumerate()
        .filter(|(old, _)| mapping.get(*old).is_some())
        .map(|(old, thread)| sanitize_thread(thread, old, directive))
        .collect();

    let mut counter_mapping: Vec<Option<CounterIndex>> = Vec::with_capacity(profile.counters.len());
    let mut counters = Vec::new();
    for counter in &profile.counters {
        let Some(main_thread_index) = mapping.get(counter.main_thread_index) else {
            counter_mapping.push(None);
            continue;
        };
        counter_mapping.push(Some(counters.len()));
        counters.push(Counter {
            main_thread_index,
            samples: match range {
                Some(range) => clip_counter_samples(&counter.samples, range),
                None => counter.samples.clone(),
            },
            ..counter.clone()
        });
    }

    let tracks = tracks::remap_tracks(
        &profile.tracks,
        &mapping,
        &counter_mapping,
        &directive.should_remove_threads_with_screenshots,
    );

    let mut meta = profile.meta.clone();
    let mut pages = profile.pages.clone();
    if directive.should_remove_extensions {
        meta.extensions = ExtensionTable::default();
    }
    if directive.should_remove_urls {
        if let Some(url) = meta.source_url.as_mut() {
            remove_urls_in_place(url);
        }
        for page in &mut pages {
            remove_urls_in_place(&mut page.url);
        }
    }
    if let Some(range) = range {
        meta.start_time += range.start;
        meta.profiling_start_time = Some(0.0);
        meta.profiling_end_time = Some(range.duration());
    }

    tracing::debug!(
        threads_removed = mapping.removed_count(),
        threads_kept = threads.len(),
        counters_kept = counters.len(),
        range = ?range,
        urls_removed = directive.should_remove_urls,
        "sanitized profile"
    );

    Ok(SanitizedProfile {
        profile: Cow::Owned(Profile {
            meta,
            threads,
            pages,
            counters,
            tracks,
        }),
        committed_range: range,
        old_thread_index_to_new: mapping,
    })
}

fn sanitize_thread(
    thread: &Thread,
    old_index: ThreadIndex,
    directive: &RemoveProfileInformation,
) -> Thread {
    // Collected before range filtering so images of clipped-away
    // screenshots are blanked too.
    let screenshot_images = directive
        .should_remove_threads_with_screenshots
        .contains(&old_index)
        .then(|| screenshot_images(thread));

    let mut thread = match directive.should_filter_to_committed_range {
        Some(range) => {
            let mut clipped = filter_thread_to_range(thread, range);
            shift_thread_times(&mut clipped, -range.start);
            clipped
        }
        None => thread.clone(),
    };

    if let Some(images) = screenshot_images {
        remove_screenshots(&mut thread, &images);
    }
    if directive.should_remove_urls {
        remove_thread_urls(&mut thread);
    }
    if directive.should_remove_preference_values {
        for payload in thread.markers.data.iter_mut().flatten() {
            if let MarkerPayload::PreferenceRead { pref_value, .. } = payload {
                pref_value.clear();
            }
        }
    }
    thread
}

fn screenshot_images(thread: &Thread) -> Vec<IndexIntoStringTable> {
    thread
        .markers
        .data
        .iter()
        .flatten()
        .filter_map(|payload| match payload {
            MarkerPayload::CompositorScreenshot { url, .. } => Some(*url),
            _ => None,
        })
        .collect()
}

/// Delete screenshot markers and blank the image data they pointed at.
fn remove_screenshots(thread: &mut Thread, images: &[IndexIntoStringTable]) {
    let markers = &thread.markers;
    thread.markers = markers.filtered(|i| {
        !matches!(
            markers.data[i],
            Some(MarkerPayload::CompositorScreenshot { .. })
        )
    });
    for &image in images {
        if let Some(data) = thread.string_table.get_mut(image) {
            if data.starts_with("data:") {
                data.clear();
            }
        }
    }
}

fn remove_thread_urls(thread: &mut Thread) {
    thread.etld_plus_1 = None;
    for string in &mut thread.string_table {
        remove_urls_in_place(string);
    }
    for payload in thread.markers.data.iter_mut().flatten() {
        match payload {
            MarkerPayload::Network(network) => {
                remove_urls_in_place(&mut network.uri);
                if let Some(redirect) = network.redirect_uri.as_mut() {
                    remove_urls_in_place(redirect);
                }
            }
            MarkerPayload::Text { name } => remove_urls_in_place(name),
            MarkerPayload::FileIo {
                filename: Some(filename),
                ..
            } => *filename = remove_file_path(filename),
            MarkerPayload::Unknown(fields) => {
                fields.values_mut().for_each(remove_urls_in_value);
            }
            _ => {}
        }
    }
}

fn clip_counter_samples(samples: &CounterSamples, range: StartEndRange) -> CounterSamples {
    let (time, count) = samples
        .time
        .iter()
        .zip(&samples.count)
        .filter(|(time, _)| range.contains(**time))
        .map(|(time, count)| (time - range.start, *count))
        .unzip();
    CounterSamples { time, count }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{
        CounterSamples, GlobalTrack, LocalTrack, NetworkPayload, Page, ProfileMeta, ThreadBuilder,
        Tracks,
    };

    const IMAGE: &str = "data:image/png;base64,AAAA";

    fn main_thread() -> Thread {
        let mut builder = ThreadBuilder::new("GeckoMain", "1", 10)
            .main_thread()
            .sample(0.0, &["main", "onLoad https://a.test/app.js:3:1"])
            .sample(5.0, &["main", "js::RunScript"])
            .sample(10.0, &["main"])
            .sample(15.0, &["main", "js::RunScript"]);
        let image = builder.intern(IMAGE);
        let mut thread = builder
            .marker(
                "Load 1: https://a.test/app.js",
                Some(6.0),
                Some(9.0),
                Some(MarkerPayload::Network(NetworkPayload {
                    id: 1,
                    uri: "https://a.test/app.js?token=1".into(),
                    redirect_uri: Some("https://b.test/".into()),
                    start_time: 6.0,
                    end_time: 9.0,
                    response_end: Some(8.0),
                    ..Default::default()
                })),
            )
            .marker(
                "CompositorScreenshot",
                Some(7.0),
                None,
                Some(MarkerPayload::CompositorScreenshot {
                    url: image,
                    window_id: "0x1".into(),
                    window_width: 800.0,
                    window_height: 600.0,
                }),
            )
            .marker(
                "PreferenceRead",
                Some(3.0),
                None,
                Some(MarkerPayload::PreferenceRead {
                    pref_access_time: 3.0,
                    pref_name: "browser.startup.homepage".into(),
                    pref_kind: "User".into(),
                    pref_type: "String".into(),
                    pref_value: "https://private.test/".into(),
                }),
            )
            .marker(
                "Navigation",
                Some(11.0),
                Some(12.0),
                Some(MarkerPayload::Text {
                    name: "navigated to https://c.test/private".into(),
                }),
            )
            .marker(
                "FileIO",
                Some(14.0),
                Some(15.0),
                Some(MarkerPayload::FileIo {
                    source: "PoisonIOInterposer".into(),
                    operation: "write".into(),
                    filename: Some("/home/me/.mozilla/cookies.sqlite".into()),
                }),
            )
            .build();
        thread.etld_plus_1 = Some("a.test".into());
        thread
    }

    fn counter(pid: &str, main_thread_index: ThreadIndex) -> Counter {
        Counter {
            name: "malloc".into(),
            category: "Memory".into(),
            description: "Heap allocations".into(),
            pid: pid.into(),
            main_thread_index,
            samples: CounterSamples {
                time: vec![0.0, 6.0, 11.0, 20.0],
                count: vec![1.0, 2.0, 3.0, 4.0],
            },
        }
    }

    fn profile() -> Profile {
        Profile {
            meta: ProfileMeta {
                start_time: 1_000.0,
                interval: 1.0,
                product: "Firefox".into(),
                source_url: Some("https://share.test/public/abc".into()),
                extensions: ExtensionTable {
                    id: vec!["ublock@test".into()],
                    name: vec!["uBlock".into()],
                    base_url: vec!["moz-extension://1234/".into()],
                },
                profiling_start_time: None,
                profiling_end_time: None,
            },
            threads: vec![
                main_thread(),
                ThreadBuilder::new("DOM Worker", "1", 11)
                    .sample(1.0, &["worker"])
                    .build(),
                ThreadBuilder::new("GeckoMain", "2", 20)
                    .main_thread()
                    .sample(2.0, &["content"])
                    .build(),
            ],
            pages: vec![Page {
                tab_id: 1,
                inner_window_id: 2,
                url: "https://a.test/index.html".into(),
                embedder_inner_window_id: 0,
            }],
            counters: vec![counter("1", 0), counter("2", 2)],
            tracks: Tracks {
                global: vec![
                    GlobalTrack::Process {
                        pid: "1".into(),
                        main_thread_index: Some(0),
                    },
                    GlobalTrack::Screenshots {
                        id: "0x1".into(),
                        thread_index: 0,
                    },
                    GlobalTrack::Process {
                        pid: "2".into(),
                        main_thread_index: Some(2),
                    },
                ],
                local: BTreeMap::from([
                    (
                        "1".to_string(),
                        vec![
                            LocalTrack::Network { thread_index: 0 },
                            LocalTrack::Thread { thread_index: 1 },
                            LocalTrack::Memory { counter_index: 0 },
                        ],
                    ),
                    (
                        "2".to_string(),
                        vec![
                            LocalTrack::Network { thread_index: 2 },
                            LocalTrack::Memory { counter_index: 1 },
                        ],
                    ),
                ]),
            },
        }
    }

    fn sanitized(directive: RemoveProfileInformation) -> Profile {
        sanitize(&profile(), Some(&directive))
            .expect("valid directive")
            .into_profile()
    }

    fn assert_tracks_resolve(profile: &Profile) {
        for thread_index in profile.tracks.thread_indexes() {
            assert!(thread_index < profile.threads.len(), "dangling thread {thread_index}");
        }
        for counter_index in profile.tracks.counter_indexes() {
            assert!(counter_index < profile.counters.len(), "dangling counter {counter_index}");
        }
    }

    #[test]
    fn no_directive_borrows_the_input() {
        let profile = profile();
        let result = sanitize(&profile, None).expect("no-op");
        assert!(!result.is_sanitized());
        assert!(std::ptr::eq(result.profile.as_ref(), &profile));
        assert!(result.old_thread_index_to_new.is_identity());
        assert_eq!(result.old_thread_index_to_new.len(), 3);
        assert_eq!(result.committed_range, None);
    }

    #[test]
    fn empty_directive_copies_unchanged() {
        let input = profile();
        let result = sanitize(&input, Some(&RemoveProfileInformation::default()))
            .expect("valid directive");
        assert!(result.is_sanitized());
        assert_eq!(result.into_profile(), input);
    }

    #[test]
    fn out_of_range_thread_is_rejected() {
        let directive = RemoveProfileInformation {
            should_remove_threads_with_screenshots: BTreeSet::from([7]),
            ..Default::default()
        };
        assert_eq!(
            sanitize(&profile(), Some(&directive)).map(|_| ()),
            Err(SanitizeError::InvalidThreadIndex {
                thread_index: 7,
                thread_count: 3,
            })
        );
    }

    #[test]
    fn removing_threads_packs_survivors() {
        let directive = RemoveProfileInformation {
            should_remove_threads: BTreeSet::from([0]),
            ..Default::default()
        };
        let input = profile();
        let result = sanitize(&input, Some(&directive)).expect("valid directive");
        let mapping = &result.old_thread_index_to_new;
        assert_eq!((mapping.get(0), mapping.get(1), mapping.get(2)), (None, Some(0), Some(1)));

        let profile = result.profile.as_ref();
        assert_eq!(profile.threads.len(), 2);
        assert_eq!(profile.threads[0].name, "DOM Worker");
        assert_eq!(profile.threads[1].pid, "2");
        assert_tracks_resolve(profile);
    }

    #[test]
    fn removed_main_thread_degrades_process_track() {
        let profile = sanitized(RemoveProfileInformation {
            should_remove_threads: BTreeSet::from([0]),
            ..Default::default()
        });
        assert_eq!(
            profile.tracks.global,
            vec![
                GlobalTrack::Process {
                    pid: "1".into(),
                    main_thread_index: None,
                },
                GlobalTrack::Process {
                    pid: "2".into(),
                    main_thread_index: Some(1),
                },
            ]
        );
        assert_eq!(
            profile.tracks.local["1"],
            vec![LocalTrack::Thread { thread_index: 0 }]
        );
        // The first counter belonged to the removed thread.
        assert_eq!(profile.counters.len(), 1);
        assert_eq!(profile.counters[0].main_thread_index, 1);
        assert_eq!(
            profile.tracks.local["2"],
            vec![
                LocalTrack::Network { thread_index: 1 },
                LocalTrack::Memory { counter_index: 0 },
            ]
        );
    }

    #[test]
    fn removing_every_thread_leaves_no_tracks() {
        let profile = sanitized(RemoveProfileInformation {
            should_remove_threads: BTreeSet::from([0, 1, 2]),
            ..Default::default()
        });
        assert!(profile.threads.is_empty());
        assert!(profile.counters.is_empty());
        assert_eq!(profile.tracks, Tracks::default());
    }

    #[test]
    fn urls_are_redacted_everywhere() {
        let profile = sanitized(RemoveProfileInformation {
            should_remove_urls: true,
            ..Default::default()
        });
        let thread = &profile.threads[0];
        assert!(thread.string_table.contains(&"onLoad https://<URL>".to_string()));
        assert!(thread.string_table.contains(&"Load 1: https://<URL>".to_string()));
        assert!(thread.string_table.contains(&"js::RunScript".to_string()));
        assert_eq!(thread.etld_plus_1, None);

        let Some(MarkerPayload::Network(network)) = &thread.markers.data[0] else {
            unreachable!("network marker");
        };
        assert_eq!(network.uri, "https://<URL>");
        assert_eq!(network.redirect_uri.as_deref(), Some("https://<URL>"));
        assert_eq!(
            thread.markers.data[3],
            Some(MarkerPayload::Text {
                name: "navigated to https://<URL>".into()
            })
        );
        let Some(MarkerPayload::FileIo { filename, .. }) = &thread.markers.data[4] else {
            unreachable!("file io marker");
        };
        assert_eq!(filename.as_deref(), Some("<PATH>/cookies.sqlite"));

        assert_eq!(profile.pages[0].url, "https://<URL>");
        assert_eq!(profile.meta.source_url.as_deref(), Some("https://<URL>"));
        assert_eq!(thread.markers.len(), 5);
    }

    #[test]
    fn unknown_payload_strings_are_redacted() {
        let mut input = profile();
        let serde_json::Value::Object(fields) = serde_json::json!({
            "type": "DOMEvent",
            "eventType": "click",
            "target": "https://a.test/form",
        }) else {
            unreachable!("object literal");
        };
        input.threads[0]
            .markers
            .push(0, Some(13.0), None, 0, Some(MarkerPayload::Unknown(fields)));

        let directive = RemoveProfileInformation {
            should_remove_urls: true,
            ..Default::default()
        };
        let result = sanitize(&input, Some(&directive)).expect("valid directive");
        let Some(MarkerPayload::Unknown(fields)) = &result.profile.threads[0].markers.data[5] else {
            unreachable!("unknown marker");
        };
        assert_eq!(fields["type"], "DOMEvent");
        assert_eq!(fields["eventType"], "click");
        assert_eq!(fields["target"], "https://<URL>");
    }

    #[test]
    fn screenshots_are_removed_from_listed_threads_only() {
        let directive = RemoveProfileInformation {
            should_remove_threads_with_screenshots: BTreeSet::from([0]),
            ..Default::default()
        };
        let input = profile();
        let profile = sanitized(directive);
        let thread = &profile.threads[0];
        assert_eq!(thread.markers.len(), input.threads[0].markers.len() - 1);
        assert!(
            !thread
                .markers
                .data
                .iter()
                .flatten()
                .any(|payload| matches!(payload, MarkerPayload::CompositorScreenshot { .. }))
        );
        assert!(!thread.string_table.iter().any(|string| string == IMAGE));
        assert_eq!(thread.samples, input.threads[0].samples);
        assert!(
            !profile
                .tracks
                .global
                .iter()
                .any(|track| matches!(track, GlobalTrack::Screenshots { .. }))
        );
    }

    #[test]
    fn preference_values_are_blanked() {
        let profile = sanitized(RemoveProfileInformation {
            should_remove_preference_values: true,
            ..Default::default()
        });
        let Some(MarkerPayload::PreferenceRead {
            pref_name,
            pref_value,
            ..
        }) = &profile.threads[0].markers.data[2]
        else {
            unreachable!("preference marker");
        };
        assert_eq!(pref_name, "browser.startup.homepage");
        assert_eq!(pref_value, "");
    }

    #[test]
    fn extensions_are_cleared() {
        let profile = sanitized(RemoveProfileInformation {
            should_remove_extensions: true,
            ..Default::default()
        });
        assert!(profile.meta.extensions.is_empty());
    }

    #[test]
    fn committed_range_clips_and_rebases() {
        let input = profile();
        let directive = RemoveProfileInformation {
            should_filter_to_committed_range: Some(StartEndRange::new(5.0, 12.0)),
            ..Default::default()
        };
        let result = sanitize(&input, Some(&directive)).expect("valid directive");
        assert_eq!(result.committed_range, Some(StartEndRange::new(5.0, 12.0)));

        let profile = result.into_profile();
        assert_eq!(profile.meta.start_time, 1_005.0);
        assert_eq!(profile.meta.profiling_start_time, Some(0.0));
        assert_eq!(profile.meta.profiling_end_time, Some(7.0));

        let thread = &profile.threads[0];
        assert_eq!(thread.samples.time, vec![0.0, 5.0]);
        // Network, screenshot and the navigation marker overlap 5..12.
        assert_eq!(thread.markers.start_time, vec![Some(1.0), Some(2.0), Some(6.0)]);
        let Some(MarkerPayload::Network(network)) = &thread.markers.data[0] else {
            unreachable!("network marker");
        };
        assert_eq!((network.start_time, network.response_end), (1.0, Some(3.0)));

        assert_eq!(profile.counters[0].samples.time, vec![1.0, 6.0]);
        assert_eq!(profile.counters[0].samples.count, vec![2.0, 3.0]);
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let directive = RemoveProfileInformation {
            should_remove_urls: true,
            should_remove_threads_with_screenshots: BTreeSet::from([0]),
            should_remove_extensions: true,
            should_remove_preference_values: true,
            ..Default::default()
        };
        let once = sanitized(directive.clone());
        let twice = sanitize(&once, Some(&directive))
            .expect("valid directive")
            .into_profile();
        assert_eq!(once, twice);
    }

    #[test]
    fn output_is_deterministic() {
        let directive = RemoveProfileInformation {
            should_filter_to_committed_range: Some(StartEndRange::new(0.0, 10.0)),
            should_remove_urls: true,
            should_remove_threads: BTreeSet::from([1]),
            ..Default::default()
        };
        assert_eq!(sanitized(directive.clone()), sanitized(directive));
    }

    #[test]
    fn directive_parses_from_camel_case_json() {
        let directive: RemoveProfileInformation = serde_json::from_str(
            r#"{"shouldRemoveThreads": [2], "shouldRemoveUrls": true,
                "shouldFilterToCommittedRange": {"start": 1, "end": 2}}"#,
        )
        .expect("directive json");
        assert_eq!(directive.should_remove_threads, BTreeSet::from([2]));
        assert!(directive.should_remove_urls);
        assert!(!directive.should_remove_extensions);
        assert_eq!(
            directive.should_filter_to_committed_range,
            Some(StartEndRange::new(1.0, 2.0))
        );
    }
}
