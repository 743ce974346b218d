// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Podbean episode pages.
//!
//! Podbean embeds a schema.org `PodcastEpisode` as JSON-LD. Unlike meta-tag
//! scraping, every field of that block is required.

use std::path::PathBuf;

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::Source;
use super::html::{element_contents, reason_with_snapshot, write_snapshot};
use super::parse::parse_datetime;
use crate::error::SourceError;
use crate::http::HttpClient;
use crate::metadata::{MetadataRecord, episode_filename};

const NAME: &str = "podbean";

/// Written to the snapshot directory when no usable metadata block is found
pub const SNAPSHOT_FILE: &str = "podbean-no-parse-mp3.html";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeLd {
    name: String,
    date_published: String,
    associated_media: MediaObjectLd,
    part_of_series: SeriesLd,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaObjectLd {
    content_url: String,
}

#[derive(Debug, Deserialize)]
struct SeriesLd {
    name: String,
}

/// Reads the JSON-LD block of podbean episode pages
pub struct Podbean<C> {
    client: C,
    snapshot_dir: PathBuf,
}

impl<C: HttpClient> Podbean<C> {
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
        let episode = self.episode_block(url, body)?;

        let date_published =
            parse_datetime(&episode.date_published).ok_or_else(|| SourceError::ExtractionFailed {
                source_name: NAME,
                url: url.to_string(),
                reason: format!("unparseable datePublished '{}'", episode.date_published),
                snapshot: None,
            })?;

        let filename = episode_filename(
            &date_published,
            &episode.part_of_series.name,
            &episode.name,
            "mp3",
        );

        Ok(MetadataRecord {
            episode_title: Some(episode.name),
            series_title: Some(episode.part_of_series.name),
            date_published: Some(date_published),
            ..MetadataRecord::new(episode.associated_media.content_url, filename)
        })
    }

    /// First JSON-LD block on the page that describes a complete episode
    fn episode_block(&self, url: &str, body: &str) -> Result<EpisodeLd, SourceError> {
        let blocks = {
            let document = Html::parse_document(body);
            element_contents(&document, "script", "type", "application/ld+json")
        };

        let mut last_error = None;
        for block in &blocks {
            match serde_json::from_str::<EpisodeLd>(block) {
                Ok(episode) => return Ok(episode),
                Err(e) => {
                    debug!(error = %e, "Skipping JSON-LD block");
                    last_error = Some(e);
                }
            }
        }

        let reason = match last_error {
            Some(e) => format!("malformed metadata block: {e}"),
            None => "could not find the metadata block".to_string(),
        };
        let snapshot = write_snapshot(&self.snapshot_dir, SNAPSHOT_FILE, body);
        Err(SourceError::ExtractionFailed {
            source_name: NAME,
            url: url.to_string(),
            reason: reason_with_snapshot(&reason, snapshot.as_ref()),
            snapshot,
        })
    }
}

#[async_trait]
impl<C: HttpClient + 'static> Source for Podbean<C> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn applicable(&self, url: &str) -> bool {
        url.contains("podbean.com")
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
        debug!(bytes = body.len(), "Fetched podbean page");

        self.extract(url, &body)
    }
}
