use chrono::{DateTime, FixedOffset, Local};

/// Episode title used when a source cannot determine one
pub const UNKNOWN_EPISODE: &str = "Unknown Episode";

/// Series title used when a source cannot determine one
pub const UNKNOWN_SERIES: &str = "Unknown Series";

/// Normalized description of one episode, as produced by every source
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    /// Location of the audio payload: a remote URL or a local file path
    pub url: String,
    /// Output file name including date prefix and extension
    pub filename: String,
    /// Known total length; only used to size the progress display
    pub duration_seconds: Option<u64>,
    pub episode_title: Option<String>,
    pub series_title: Option<String>,
    pub date_published: Option<DateTime<FixedOffset>>,
    /// `url` points at a temporary file the source materialized on disk
    pub local_artifact: bool,
}

impl MetadataRecord {
    /// Create a record with only the audio location and file name known
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            duration_seconds: None,
            episode_title: None,
            series_title: None,
            date_published: None,
            local_artifact: false,
        }
    }

    /// Episode title, or [`UNKNOWN_EPISODE`]
    pub fn episode_title(&self) -> &str {
        self.episode_title.as_deref().unwrap_or(UNKNOWN_EPISODE)
    }

    /// Series title, or [`UNKNOWN_SERIES`]
    pub fn series_title(&self) -> &str {
        self.series_title.as_deref().unwrap_or(UNKNOWN_SERIES)
    }

    /// Publish date, or the current time when the source did not provide one
    pub fn date_published(&self) -> DateTime<FixedOffset> {
        self.date_published.unwrap_or_else(now)
    }
}

/// Current local time with its offset
pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
