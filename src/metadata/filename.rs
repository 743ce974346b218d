use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};

use super::record::{UNKNOWN_EPISODE, UNKNOWN_SERIES};

/// Maximum length for a single interpolated filename component
const MAX_COMPONENT_LENGTH: usize = 100;

/// Separator between the date prefix and the title components
pub const SEPARATOR: char = '-';

/// Used when a bare file name sanitizes to nothing
const UNTITLED: &str = "untitled";

/// Sortable date prefix, e.g. "2024.01.15"
pub fn date_prefix(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y.%m.%d").to_string()
}

/// Build the output file name for an episode with known titles
///
/// Format: "YYYY.MM.DD-series-episode.ext"
pub fn episode_filename(
    date: &DateTime<FixedOffset>,
    series_title: &str,
    episode_title: &str,
    extension: &str,
) -> String {
    format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}.{}",
        date_prefix(date),
        sanitize_component(series_title, UNKNOWN_SERIES),
        sanitize_component(episode_title, UNKNOWN_EPISODE),
        extension
    )
}

/// Build the output file name from a remote file name
///
/// Format: "YYYY.MM.DD-file_name"
pub fn dated_filename(date: &DateTime<FixedOffset>, file_name: &str) -> String {
    format!(
        "{}{SEPARATOR}{}",
        date_prefix(date),
        sanitize_component(file_name, UNTITLED)
    )
}

/// Make a single component safe for use in a file name
///
/// Path separators, reserved and control characters are removed, whitespace is
/// collapsed and the result is truncated. Empty results become `fallback`.
pub fn sanitize_component(value: &str, fallback: &str) -> String {
    let collapsed = collapse_whitespace(value);
    let sanitized = sanitize_filename::sanitize(&collapsed);
    let trimmed = sanitized.trim();

    if trimmed.is_empty() {
        return fallback.to_string();
    }

    truncate_at_boundary(trimmed, MAX_COMPONENT_LENGTH)
}

/// Last path segment of a URL, percent-decoded, without query string or fragment
///
/// Segments that do not decode to UTF-8 are returned as they are.
pub fn url_file_name(url: &url::Url) -> Option<Cow<'_, str>> {
    let segment = url
        .path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())?;
    Some(urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
}

/// Audio extension of a file name, lowercased, if it is a known audio type
pub fn audio_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    is_valid_audio_extension(ext).then(|| ext.to_lowercase())
}

/// Collapse runs of whitespace into single spaces
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate string at a word boundary
fn truncate_at_boundary(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }

    let truncated: String = s.chars().take(max_len).collect();
    if let Some(pos) = truncated.rfind(' ')
        && pos > max_len / 2
    {
        return truncated[..pos].to_string();
    }

    truncated.trim_end().to_string()
}

/// Check if a string is a valid audio file extension
fn is_valid_audio_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "mp3" | "m4a" | "mp4" | "aac" | "ogg" | "opus" | "wav" | "flac"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    // === Sanitization tests ===

    #[test]
    fn sanitize_preserves_plain_titles() {
        assert_eq!(sanitize_component("Episode 42", "x"), "Episode 42");
    }

    #[test]
    fn sanitize_removes_path_separators() {
        assert_eq!(sanitize_component("AC/DC: Live", "x"), "ACDC Live");
        assert_eq!(sanitize_component("a\\b", "x"), "ab");
    }

    #[test]
    fn sanitize_removes_reserved_characters() {
        let s = sanitize_component("What? <Really> \"yes\" | *no*", "x");
        for c in ['?', '<', '>', '"', '|', '*'] {
            assert!(!s.contains(c), "{s} still contains {c}");
        }
    }

    #[test]
    fn sanitize_collapses_whitespace_and_newlines() {
        assert_eq!(sanitize_component("  line1\n\nline2\t tab  ", "x"), "line1 line2 tab");
    }

    #[test]
    fn sanitize_uses_fallback_for_empty_results() {
        assert_eq!(sanitize_component("", "Unknown Series"), "Unknown Series");
        assert_eq!(sanitize_component("///", "Unknown Series"), "Unknown Series");
    }

    #[test]
    fn sanitize_keeps_unicode() {
        assert_eq!(sanitize_component("Café résumé", "x"), "Café résumé");
    }

    // === Truncation tests ===

    #[test]
    fn truncate_preserves_short_strings() {
        assert_eq!(truncate_at_boundary("short", 100), "short");
    }

    #[test]
    fn truncate_cuts_at_word_boundary() {
        let result = truncate_at_boundary("word1 word2 word3 word4 word5", 20);
        assert!(result.len() <= 20);
        assert!(!result.ends_with(' '));
        assert_eq!(result, "word1 word2 word3");
    }

    #[test]
    fn truncate_handles_no_boundaries() {
        let long = "a".repeat(150);
        assert_eq!(truncate_at_boundary(&long, 100).len(), 100);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let long = "é".repeat(150);
        assert_eq!(truncate_at_boundary(&long, 100).chars().count(), 100);
    }

    // === Filename tests ===

    #[test]
    fn date_prefix_is_sortable() {
        assert_eq!(date_prefix(&date("2024-01-05T12:00:00+00:00")), "2024.01.05");
    }

    #[test]
    fn episode_filename_orders_date_series_episode() {
        let name = episode_filename(
            &date("2024-01-15T12:00:00+00:00"),
            "The Show",
            "Pilot",
            "mp3",
        );
        assert_eq!(name, "2024.01.15-The Show-Pilot.mp3");
    }

    #[test]
    fn episode_filename_never_contains_empty_components() {
        let name = episode_filename(&date("2024-01-15T12:00:00+00:00"), "", ":::", "mp3");
        assert_eq!(name, "2024.01.15-Unknown Series-Unknown Episode.mp3");
    }

    #[test]
    fn dated_filename_prefixes_file_name() {
        let name = dated_filename(&date("2024-03-01T00:00:00+00:00"), "episode-12.mp3");
        assert_eq!(name, "2024.03.01-episode-12.mp3");
    }

    // === URL and extension tests ===

    #[test]
    fn url_file_name_ignores_query() {
        let url = Url::parse("https://cdn.example.com/a/b/ep.mp3?token=abc").unwrap();
        assert_eq!(url_file_name(&url).as_deref(), Some("ep.mp3"));
    }

    #[test]
    fn url_file_name_decodes_percent_escapes() {
        let url = Url::parse("https://cdn.example.com/My%20Show%20Ep%201.mp3").unwrap();
        assert_eq!(url_file_name(&url).as_deref(), Some("My Show Ep 1.mp3"));

        let url = Url::parse("https://cdn.example.com/caf%C3%A9.mp3").unwrap();
        assert_eq!(url_file_name(&url).as_deref(), Some("café.mp3"));
    }

    #[test]
    fn url_file_name_keeps_undecodable_segments() {
        let url = Url::parse("https://cdn.example.com/bad%FF.mp3").unwrap();
        assert_eq!(url_file_name(&url).as_deref(), Some("bad%FF.mp3"));
    }

    #[test]
    fn url_file_name_is_none_for_directories() {
        let url = Url::parse("https://example.com/shows/").unwrap();
        assert_eq!(url_file_name(&url), None);
    }

    #[test]
    fn audio_extension_recognizes_known_types() {
        assert_eq!(audio_extension("ep.MP3"), Some("mp3".to_string()));
        assert_eq!(audio_extension("ep.aac"), Some("aac".to_string()));
        assert_eq!(audio_extension("ep.opus"), Some("opus".to_string()));
    }

    #[test]
    fn audio_extension_ignores_other_types() {
        assert_eq!(audio_extension("index.html"), None);
        assert_eq!(audio_extension("no_extension"), None);
    }
}
