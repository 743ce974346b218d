// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Content of the first `tag` element whose `attr` equals `value`.
///
/// Prefers the element's `content` attribute and falls back to its text.
/// Blank values count as absent.
pub fn element_content(document: &Html, tag: &str, attr: &str, value: &str) -> Option<String> {
    let selector = attribute_selector(tag, attr, value)?;
    document.select(&selector).next().and_then(content_of)
}

/// Content of every `tag` element whose `attr` equals `value`, in document order
pub fn element_contents(document: &Html, tag: &str, attr: &str, value: &str) -> Vec<String> {
    match attribute_selector(tag, attr, value) {
        Some(selector) => document.select(&selector).filter_map(content_of).collect(),
        None => Vec::new(),
    }
}

/// Content of the first `<meta>` tag whose `attr` equals `value`
pub fn meta_content(document: &Html, attr: &str, value: &str) -> Option<String> {
    element_content(document, "meta", attr, value)
}

/// Persist a fetched page so a failed extraction can be diagnosed.
///
/// Returns the written path, or `None` if the page could not be saved.
pub fn write_snapshot(dir: &Path, file_name: &str, body: &str) -> Option<PathBuf> {
    let path = dir.join(file_name);
    match std::fs::write(&path, body) {
        Ok(()) => {
            warn!(path = %path.display(), "Saved fetched page for diagnosis");
            Some(path)
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to save fetched page");
            None
        }
    }
}

/// Human readable failure reason pointing at the snapshot, if one was written
pub fn reason_with_snapshot(reason: &str, snapshot: Option<&PathBuf>) -> String {
    match snapshot {
        Some(path) => format!("{reason}, see {}", path.display()),
        None => reason.to_string(),
    }
}

fn attribute_selector(tag: &str, attr: &str, value: &str) -> Option<Selector> {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Selector::parse(&format!(r#"{tag}[{attr}="{escaped}"]"#)).ok()
}

fn content_of(element: ElementRef<'_>) -> Option<String> {
    let content = match element.value().attr("content") {
        Some(content) => content.to_string(),
        None => element.text().collect::<String>(),
    };
    let trimmed = content.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
