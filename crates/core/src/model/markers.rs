use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::thread::IndexIntoStringTable;

/// Marker columns. An instant marker has a start and no end; an interval
/// marker has both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarkerTable {
    pub start_time: Vec<Option<f64>>,
    pub end_time: Vec<Option<f64>>,
    pub name: Vec<IndexIntoStringTable>,
    pub category: Vec<usize>,
    pub data: Vec<Option<MarkerPayload>>,
}

impl RawMarkerTable {
    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn push(
        &mut self,
        name: IndexIntoStringTable,
        start_time: Option<f64>,
        end_time: Option<f64>,
        category: usize,
        data: Option<MarkerPayload>,
    ) -> usize {
        let index = self.name.len();
        self.name.push(name);
        self.start_time.push(start_time);
        self.end_time.push(end_time);
        self.category.push(category);
        self.data.push(data);
        index
    }

    /// Copy the rows for which `keep` returns true, preserving order.
    pub fn filtered(&self, mut keep: impl FnMut(usize) -> bool) -> RawMarkerTable {
        let mut table = RawMarkerTable::default();
        for i in (0..self.len()).filter(|&i| keep(i)) {
            table.push(
                self.name[i],
                self.start_time[i],
                self.end_time[i],
                self.category[i],
                self.data[i].clone(),
            );
        }
        table
    }
}

/// Typed marker payloads, tagged by their `type` field.
///
/// Payload kinds this crate does not model (GC, DOMEvent, UserTiming, ...)
/// are kept verbatim in [`MarkerPayload::Unknown`], `type` field included,
/// and serialize back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarkerPayload {
    Network(NetworkPayload),
    #[serde(rename_all = "camelCase")]
    CompositorScreenshot {
        /// Index into the thread's string table holding the image data URL.
        url: IndexIntoStringTable,
        window_id: String,
        window_width: f64,
        window_height: f64,
    },
    #[serde(rename_all = "camelCase")]
    PreferenceRead {
        pref_access_time: f64,
        pref_name: String,
        pref_kind: String,
        pref_type: String,
        pref_value: String,
    },
    #[serde(rename = "FileIO")]
    FileIo {
        source: String,
        operation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    Text {
        name: String,
    },
    #[serde(untagged)]
    Unknown(Map<String, Value>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPayload {
    pub id: u64,
    #[serde(rename = "URI")]
    pub uri: String,
    #[serde(rename = "RedirectURI", default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    pub status: NetworkStatus,
    #[serde(default)]
    pub pri: i32,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_lookup_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_lookup_end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_connect_end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_connection_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_end: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkStatus {
    #[serde(rename = "STATUS_START")]
    Start,
    #[serde(rename = "STATUS_STOP")]
    #[default]
    Stop,
    #[serde(rename = "STATUS_REDIRECT")]
    Redirect,
    #[serde(rename = "STATUS_CANCEL")]
    Cancel,
}

impl NetworkPayload {
    /// Move every timestamp by `delta` milliseconds.
    pub fn shift_times(&mut self, delta: f64) {
        self.start_time += delta;
        self.end_time += delta;
        for time in [
            &mut self.domain_lookup_start,
            &mut self.domain_lookup_end,
            &mut self.connect_start,
            &mut self.tcp_connect_end,
            &mut self.secure_connection_start,
            &mut self.connect_end,
            &mut self.request_start,
            &mut self.response_start,
            &mut self.response_end,
        ]
        .into_iter()
        .flatten()
        {
            *time += delta;
        }
    }

    /// The MIME type without parameters, e.g. `text/html` for
    /// `text/html; charset=utf-8`.
    pub fn mime_type(&self) -> Option<&str> {
        let content_type = self.content_type.as_deref()?;
        let mime = content_type.split(';').next().unwrap_or(content_type).trim();
        (!mime.is_empty()).then_some(mime)
    }
}

impl MarkerPayload {
    /// The payload's `type` tag.
    pub fn type_name(&self) -> &str {
        match self {
            MarkerPayload::Network(_) => "Network",
            MarkerPayload::CompositorScreenshot { .. } => "CompositorScreenshot",
            MarkerPayload::PreferenceRead { .. } => "PreferenceRead",
            MarkerPayload::FileIo { .. } => "FileIO",
            MarkerPayload::Text { .. } => "Text",
            MarkerPayload::Unknown(fields) => {
                fields.get("type").and_then(Value::as_str).unwrap_or_default()
            }
        }
    }

    /// Move every timestamp carried by a modeled payload by `delta`
    /// milliseconds. Unknown payloads are left as they are.
    pub fn shift_times(&mut self, delta: f64) {
        match self {
            MarkerPayload::Network(network) => network.shift_times(delta),
            MarkerPayload::PreferenceRead {
                pref_access_time, ..
            } => *pref_access_time += delta,
            MarkerPayload::CompositorScreenshot { .. }
            | MarkerPayload::FileIo { .. }
            | MarkerPayload::Text { .. }
            | MarkerPayload::Unknown(_) => {}
        }
    }

    /// Text a marker search matches against, beyond the marker name.
    pub fn searchable_text(&self) -> Vec<&str> {
        match self {
            MarkerPayload::Network(network) => {
                let mut fields = vec![network.uri.as_str()];
                fields.extend(network.mime_type());
                fields
            }
            MarkerPayload::PreferenceRead { pref_name, .. } => vec![pref_name.as_str()],
            MarkerPayload::FileIo {
                operation,
                filename,
                ..
            } => {
                let mut fields = vec![operation.as_str()];
                fields.extend(filename.as_deref());
                fields
            }
            MarkerPayload::Text { name } => vec![name.as_str()],
            MarkerPayload::CompositorScreenshot { .. } | MarkerPayload::Unknown(_) => Vec::new(),
        }
    }
}
