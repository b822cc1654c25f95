use crate::model::Thread;

/// Indexes of markers matching a comma-separated search string.
///
/// A marker matches when any term is a case-insensitive substring of its
/// name or of its payload's searchable fields (URL, MIME type, preference
/// name, file name). An empty search matches everything.
pub fn filter_markers_by_search(thread: &Thread, search: &str) -> Vec<usize> {
    let terms: Vec<String> = search
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect();
    let markers = &thread.markers;
    if terms.is_empty() {
        return (0..markers.len()).collect();
    }

    (0..markers.len())
        .filter(|&i| {
            let name = thread.string(markers.name[i]).unwrap_or_default();
            let payload_text = markers.data[i]
                .as_ref()
                .map(|payload| payload.searchable_text())
                .unwrap_or_default();
            std::iter::once(name)
                .chain(payload_text)
                .any(|text| {
                    let text = text.to_lowercase();
                    terms.iter().any(|term| text.contains(term.as_str()))
                })
        })
        .collect()
}
