use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

pub const REDACTED_URL: &str = "<URL>";
pub const REDACTED_PATH: &str = "<PATH>";

#[allow(clippy::expect_used)]
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b((?:https?|ftp|file|moz-extension|moz-page-thumb)://)/?[^\s/$.?#][^\s)]*")
        .expect("URL pattern is valid")
});

/// Replace everything after the scheme of each URL in `text` with `<URL>`.
///
/// `https://example.com/a?b` becomes `https://<URL>`. Text without URLs is
/// returned borrowed.
pub fn remove_urls(text: &str) -> Cow<'_, str> {
    URL_REGEX.replace_all(text, format!("${{1}}{REDACTED_URL}"))
}

/// [`remove_urls`] for an owned string, reallocating only when a URL was
/// found.
pub fn remove_urls_in_place(text: &mut String) {
    let redacted = match remove_urls(text) {
        Cow::Owned(redacted) => redacted,
        Cow::Borrowed(_) => return,
    };
    *text = redacted;
}

/// [`remove_urls_in_place`] over every string nested in a JSON value.
/// Object keys are left alone.
pub fn remove_urls_in_value(value: &mut Value) {
    match value {
        Value::String(text) => remove_urls_in_place(text),
        Value::Array(items) => items.iter_mut().for_each(remove_urls_in_value),
        Value::Object(fields) => fields.values_mut().for_each(remove_urls_in_value),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Keep only the last component of a file path, Unix or Windows style.
pub fn remove_file_path(path: &str) -> String {
    match path.rfind(['/', '\\']) {
        Some(separator) => format!("{REDACTED_PATH}{}", &path[separator..]),
        None => path.to_string(),
    }
}
