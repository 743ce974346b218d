// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! player.fm episode pages.
//!
//! Everything is read from social-preview `<meta>` tags. Only the audio stream
//! URL is essential; every other field degrades to a default when absent.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use scraper::Html;
use tracing::{debug, instrument, warn};

use super::Source;
use super::html::{meta_content, reason_with_snapshot, write_snapshot};
use super::parse::{parse_datetime, parse_minutes_seconds};
use crate::error::SourceError;
use crate::http::HttpClient;
use crate::metadata::{MetadataRecord, UNKNOWN_EPISODE, UNKNOWN_SERIES, episode_filename, now};

const NAME: &str = "player.fm";

/// Written to the snapshot directory when the audio URL cannot be found
pub const SNAPSHOT_FILE: &str = "playerfm-no-parse-mp3.html";

/// Scrapes player.fm episode pages
pub struct PlayerFm<C> {
    client: C,
    snapshot_dir: PathBuf,
}

impl<C: HttpClient> PlayerFm<C> {
    /// Snapshots of unparseable pages go to the working directory
    pub fn new(client: C) -> Self {
        Self {
            client,
            snapshot_dir: PathBuf::from("."),
        }
    }

    /// Write snapshots of unparseable pages to `dir` instead
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    fn extract(&self, url: &str, body: &str) -> Result<MetadataRecord, SourceError> {
        let document = Html::parse_document(body);

        let series_title = meta_content(&document, "property", "og:site_name");
        let episode_title = meta_content(&document, "property", "og:title");
        let date_published = published(&document);
        let duration_seconds = duration_seconds(&document);

        let Some(audio_url) = meta_content(&document, "name", "twitter:player:stream") else {
            let snapshot = write_snapshot(&self.snapshot_dir, SNAPSHOT_FILE, body);
            return Err(SourceError::ExtractionFailed {
                source_name: NAME,
                url: url.to_string(),
                reason: reason_with_snapshot("could not find the mp3 URL", snapshot.as_ref()),
                snapshot,
            });
        };

        let filename = episode_filename(
            &date_published,
            series_title.as_deref().unwrap_or(UNKNOWN_SERIES),
            episode_title.as_deref().unwrap_or(UNKNOWN_EPISODE),
            "mp3",
        );

        Ok(MetadataRecord {
            duration_seconds,
            episode_title,
            series_title,
            date_published: Some(date_published),
            ..MetadataRecord::new(audio_url, filename)
        })
    }
}

#[async_trait]
impl<C: HttpClient + 'static> Source for PlayerFm<C> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn applicable(&self, url: &str) -> bool {
        url.contains("player.fm")
    }

    #[instrument(level = "debug", skip(self))]
    async fn read(&self, url: &str) -> Result<MetadataRecord, SourceError> {
        let body = self
            .client
            .get_text(url)
            .await
            .map_err(|e| SourceError::FetchFailed {
                url: url.to_string(),
                source: e,
            })?;
        debug!(bytes = body.len(), "Fetched player.fm page");

        self.extract(url, &body)
    }
}

fn published(document: &Html) -> DateTime<FixedOffset> {
    match meta_content(document, "property", "og:updated_time") {
        Some(value) => parse_datetime(&value).unwrap_or_else(|| {
            warn!(%value, "Unparseable publish date, using current time");
            now()
        }),
        None => now(),
    }
}

fn duration_seconds(document: &Html) -> Option<u64> {
    let value = meta_content(document, "property", "music:duration")?;
    let seconds = parse_minutes_seconds(&value);
    if seconds.is_none() {
        warn!(%value, "Unparseable duration, progress will be indeterminate");
    }
    seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::FixturePage;
    use tempfile::tempdir;

    const FULL_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
  <meta property="og:site_name" content="The Show">
  <meta property="og:title" content="Pilot: Where It Begins">
  <meta property="og:updated_time" content="2024-01-15T12:00:00+00:00">
  <meta property="music:duration" content="12:34">
  <meta name="twitter:player:stream" content="https://cdn.example.com/pilot.mp3">
</head><body><h1>Pilot</h1></body></html>"#;

    const NO_SITE_NAME: &str = r#"<html><head>
  <meta property="og:title" content="Pilot">
  <meta property="og:updated_time" content="2024-01-15T12:00:00+00:00">
  <meta name="twitter:player:stream" content="https://cdn.example.com/pilot.mp3">
</head></html>"#;

    const BAD_DURATION: &str = r#"<html><head>
  <meta property="og:site_name" content="The Show">
  <meta property="og:title" content="Pilot">
  <meta property="music:duration" content="abc">
  <meta property="og:updated_time" content="not a date">
  <meta name="twitter:player:stream" content="https://cdn.example.com/pilot.mp3">
</head></html>"#;

    const NO_AUDIO: &str = r#"<html><head>
  <meta property="og:site_name" content="The Show">
  <meta property="og:title" content="Pilot">
</head></html>"#;

    const URL: &str = "https://player.fm/series/the-show/pilot";

    fn source(page: &'static str, dir: &std::path::Path) -> PlayerFm<FixturePage> {
        PlayerFm::new(FixturePage(page)).with_snapshot_dir(dir)
    }

    #[tokio::test]
    async fn read_extracts_all_fields() {
        let dir = tempdir().unwrap();
        let record = source(FULL_PAGE, dir.path()).read(URL).await.unwrap();

        assert_eq!(record.url, "https://cdn.example.com/pilot.mp3");
        assert_eq!(record.series_title(), "The Show");
        assert_eq!(record.episode_title(), "Pilot: Where It Begins");
        assert_eq!(record.duration_seconds, Some(754));
        assert_eq!(
            record.date_published.unwrap().to_rfc3339(),
            "2024-01-15T12:00:00+00:00"
        );
        assert!(!record.local_artifact);
    }

    #[tokio::test]
    async fn filename_has_date_series_episode_in_order() {
        let dir = tempdir().unwrap();
        let record = source(FULL_PAGE, dir.path()).read(URL).await.unwrap();

        assert_eq!(record.filename, "2024.01.15-The Show-Pilot Where It Begins.mp3");
    }

    #[tokio::test]
    async fn missing_site_name_defaults_series() {
        let dir = tempdir().unwrap();
        let record = source(NO_SITE_NAME, dir.path()).read(URL).await.unwrap();

        assert_eq!(record.series_title(), "Unknown Series");
        assert_eq!(record.filename, "2024.01.15-Unknown Series-Pilot.mp3");
        assert_eq!(record.duration_seconds, None);
    }

    #[tokio::test]
    async fn malformed_duration_and_date_degrade() {
        let dir = tempdir().unwrap();
        let before = now();
        let record = source(BAD_DURATION, dir.path()).read(URL).await.unwrap();

        assert_eq!(record.duration_seconds, None);
        assert!(record.date_published.unwrap() >= before);
        assert_eq!(record.url, "https://cdn.example.com/pilot.mp3");
    }

    #[tokio::test]
    async fn missing_audio_url_fails_with_snapshot() {
        let dir = tempdir().unwrap();
        let err = source(NO_AUDIO, dir.path()).read(URL).await.unwrap_err();

        let snapshot = dir.path().join(SNAPSHOT_FILE);
        match &err {
            SourceError::ExtractionFailed {
                source_name,
                snapshot: Some(path),
                ..
            } => {
                assert_eq!(*source_name, "player.fm");
                assert_eq!(path, &snapshot);
            }
            other => panic!("Expected ExtractionFailed with snapshot, got {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(&snapshot).unwrap(), NO_AUDIO);
        assert!(err.to_string().contains(SNAPSHOT_FILE));
    }

    #[test]
    fn applicable_matches_player_fm_only() {
        let source = PlayerFm::new(FixturePage(""));
        assert!(source.applicable(URL));
        assert!(source.applicable("https://player.fm/series/x/ep.mp3"));
        assert!(!source.applicable("https://example.com/ep.mp3"));
    }
}
