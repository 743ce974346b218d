use std::path::Path;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use id3::{Tag, TagLike, Timestamp, Version};
use tracing::debug;

use crate::error::TagError;
use crate::metadata::MetadataRecord;

/// Genre written to every episode
pub const GENRE: &str = "Podcast";

/// Tag values for one output file
#[derive(Debug, Clone, PartialEq)]
pub struct TagFields {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub date: DateTime<FixedOffset>,
    pub genre: String,
}

impl TagFields {
    /// Album and artist are both the series, so players group episodes by show
    pub fn from_record(record: &MetadataRecord) -> Self {
        Self {
            title: record.episode_title().to_string(),
            album: record.series_title().to_string(),
            artist: record.series_title().to_string(),
            date: record.date_published(),
            genre: GENRE.to_string(),
        }
    }
}

/// Writes descriptive tags into a finished audio file
pub trait Tagger: Send + Sync {
    fn tag(&self, path: &Path, fields: &TagFields) -> Result<(), TagError>;
}

/// ID3v2.4 tagger; existing frames not set here are preserved
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3Tagger;

impl Tagger for Id3Tagger {
    fn tag(&self, path: &Path, fields: &TagFields) -> Result<(), TagError> {
        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No readable tag, starting fresh");
                Tag::new()
            }
        };

        tag.set_title(&fields.title);
        tag.set_album(&fields.album);
        tag.set_artist(&fields.artist);
        tag.set_genre(&fields.genre);
        tag.set_date_recorded(timestamp(&fields.date));

        tag.write_to_path(path, Version::Id3v24)
            .map_err(|e| TagError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(path = %path.display(), title = %fields.title, "Wrote tags");
        Ok(())
    }
}

/// Second-precision timestamp in the date's own offset
fn timestamp(date: &DateTime<FixedOffset>) -> Timestamp {
    Timestamp {
        year: date.year(),
        month: Some(date.month() as u8),
        day: Some(date.day() as u8),
        hour: Some(date.hour() as u8),
        minute: Some(date.minute() as u8),
        second: Some(date.second() as u8),
    }
}
