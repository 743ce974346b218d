// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DownloadError;
use crate::logging::Verbosity;
use crate::metadata::MetadataRecord;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::source::SourceRegistry;
use crate::tag::{TagFields, Tagger};
use crate::transcode::{TranscodeJob, TranscodeOutcome, Transcoder};

/// Result of a download that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was transcoded and tagged
    Completed { path: PathBuf },
    /// Interrupted by the user; `path` may hold a partial, untagged file
    Cancelled { path: PathBuf },
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Completed { path } | Self::Cancelled { path } => path,
        }
    }
}

/// Takes one episode URL end to end: source, config, transcode, tag
pub struct Downloader {
    registry: SourceRegistry,
    transcoder: Box<dyn Transcoder>,
    tagger: Box<dyn Tagger>,
    reporter: SharedProgressReporter,
    verbosity: Option<Verbosity>,
}

impl Downloader {
    pub fn new(
        registry: SourceRegistry,
        transcoder: impl Transcoder + 'static,
        tagger: impl Tagger + 'static,
        reporter: SharedProgressReporter,
    ) -> Self {
        Self {
            registry,
            transcoder: Box::new(transcoder),
            tagger: Box::new(tagger),
            reporter,
            verbosity: None,
        }
    }

    /// Apply each episode's effective verbosity to the log filter
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Download the episode behind `url`.
    ///
    /// Series-specific settings are resolved once the source has named the
    /// series. A cancelled transcode leaves its partial output in place and
    /// skips tagging. A temporary file downloaded by the source is removed
    /// whatever the outcome.
    pub async fn download(&self, config: &Config, url: &str) -> Result<DownloadOutcome, DownloadError> {
        let source = self.registry.resolve(url)?;
        info!(url, source = source.name(), "Reading episode metadata");
        self.reporter.report(ProgressEvent::SourceResolved {
            url: url.to_string(),
            source_name: source.name().to_string(),
        });

        let record = source.read(url).await?;
        self.reporter.report(ProgressEvent::MetadataRead {
            series_title: record.series_title().to_string(),
            episode_title: record.episode_title().to_string(),
        });

        let result = self.save(config, &record).await;
        remove_local_artifact(&record).await;
        result
    }

    async fn save(&self, config: &Config, record: &MetadataRecord) -> Result<DownloadOutcome, DownloadError> {
        let effective = config.for_series(record.series_title.as_deref())?;
        if let Some(verbosity) = &self.verbosity {
            verbosity.set(effective.verbose);
        }
        debug!(?record, "Metadata extracted");
        debug!(?effective, "Resolved configuration");

        tokio::fs::create_dir_all(&effective.download_path)
            .await
            .map_err(|e| DownloadError::CreateDirectoryFailed {
                path: effective.download_path.clone(),
                source: e,
            })?;
        let destination = effective.download_path.join(&record.filename);

        let job = TranscodeJob {
            input: record.url.clone(),
            destination: destination.clone(),
            speedup: effective.speedup,
            duration_seconds: record.duration_seconds,
            verbose: effective.verbose,
        };
        info!(
            destination = %destination.display(),
            speedup = effective.speedup,
            "Transcoding"
        );

        match self.transcoder.transcode(&job, &self.reporter).await? {
            TranscodeOutcome::Terminated => Ok(DownloadOutcome::Cancelled { path: destination }),
            TranscodeOutcome::Completed => {
                self.tagger
                    .tag(&destination, &TagFields::from_record(record))?;
                self.reporter.report(ProgressEvent::Tagged {
                    destination: destination.clone(),
                });
                info!(path = %destination.display(), "Episode saved");
                Ok(DownloadOutcome::Completed { path: destination })
            }
        }
    }
}

/// Delete a temporary file a source downloaded ahead of transcoding
async fn remove_local_artifact(record: &MetadataRecord) {
    if !record.local_artifact {
        return;
    }
    match tokio::fs::remove_file(&record.url).await {
        Ok(()) => debug!(path = %record.url, "Removed temporary download"),
        Err(e) => warn!(path = %record.url, error = %e, "Could not remove temporary download"),
    }
}
