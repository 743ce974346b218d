// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! YouTube videos, via the external `yt-dlp` tool.
//!
//! YouTube stream URLs are not usable by other clients, so the selected audio
//! stream is downloaded to a temporary file first and that path becomes the
//! record's `url`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, instrument};
use url::Url;

use super::Source;
use crate::error::SourceError;
use crate::metadata::{
    MetadataRecord, UNKNOWN_EPISODE, UNKNOWN_SERIES, episode_filename, now, sanitize_component,
};

const NAME: &str = "youtube";

/// Codec family of the audio stream we accept
const AUDIO_ENCODING: &str = "aac";

/// Number of trailing stderr lines kept in error messages
const STDERR_TAIL_LINES: usize = 5;

/// Subset of `yt-dlp --dump-single-json` output
#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    /// YYYYMMDD
    upload_date: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<VideoFormat>,
}

#[derive(Debug, Deserialize)]
struct VideoFormat {
    format_id: String,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    /// Average audio bitrate in kbit/s
    abr: Option<f64>,
}

impl VideoFormat {
    fn is_audio_only(&self) -> bool {
        let has_audio = self.acodec.as_deref().is_some_and(|codec| codec != "none");
        has_audio && self.vcodec.as_deref() == Some("none")
    }

    fn is_aac(&self) -> bool {
        self.acodec
            .as_deref()
            .is_some_and(|codec| codec.starts_with("mp4a") || codec == AUDIO_ENCODING)
    }
}

/// Extracts the audio track of YouTube videos
pub struct YouTube {
    program: PathBuf,
    temp_dir: PathBuf,
}

impl Default for YouTube {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YouTube {
    /// Use the given `yt-dlp` executable; downloads go to the system temp dir
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Download audio streams to `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    async fn fetch_info(&self, url: &str) -> Result<VideoInfo, SourceError> {
        let stdout = self
            .run(url, &["--dump-single-json", "--no-playlist", "--no-warnings", url])
            .await?;

        serde_json::from_slice(&stdout).map_err(|e| SourceError::ExtractionFailed {
            source_name: NAME,
            url: url.to_string(),
            reason: format!("unexpected yt-dlp output: {e}"),
            snapshot: None,
        })
    }

    async fn download_format(
        &self,
        url: &str,
        format_id: &str,
        destination: &Path,
    ) -> Result<(), SourceError> {
        let destination = destination.to_string_lossy();
        self.run(
            url,
            &[
                "--no-playlist",
                "--quiet",
                "--no-progress",
                "--force-overwrites",
                "-f",
                format_id,
                "-o",
                &destination,
                url,
            ],
        )
        .await
        .map(|_| ())
    }

    /// Run yt-dlp to completion, returning stdout
    async fn run(&self, url: &str, args: &[&str]) -> Result<Vec<u8>, SourceError> {
        let program = self.program.display().to_string();
        debug!(%program, ?args, "Running yt-dlp");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SourceError::ToolFailed {
                program: program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::ExtractionFailed {
                source_name: NAME,
                url: url.to_string(),
                reason: format!("{program} failed ({}): {}", output.status, tail(&stderr)),
                snapshot: None,
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl Source for YouTube {
    fn name(&self) -> &'static str {
        NAME
    }

    fn applicable(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_lowercase))
            .is_some_and(|host| {
                host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be"
            })
    }

    #[instrument(level = "debug", skip(self))]
    async fn read(&self, url: &str) -> Result<MetadataRecord, SourceError> {
        let info = self.fetch_info(url).await?;
        let format = select_audio_format(&info.formats, url)?;
        let ext = format.ext.as_deref().unwrap_or("m4a");
        let temp_path = self
            .temp_dir
            .join(format!("podsync-{}.{ext}", sanitize_component(&info.id, "video")));

        info!(
            title = info.title.as_deref().unwrap_or_default(),
            format = %format.format_id,
            path = %temp_path.display(),
            "Downloading audio stream"
        );
        self.download_format(url, &format.format_id, &temp_path).await?;

        let series_title = info.channel.or(info.uploader);
        let date_published = info
            .upload_date
            .as_deref()
            .and_then(parse_upload_date)
            .unwrap_or_else(now);
        let filename = episode_filename(
            &date_published,
            series_title.as_deref().unwrap_or(UNKNOWN_SERIES),
            info.title.as_deref().unwrap_or(UNKNOWN_EPISODE),
            AUDIO_ENCODING,
        );

        Ok(MetadataRecord {
            duration_seconds: info.duration.filter(|d| *d >= 0.0).map(|d| d.round() as u64),
            episode_title: info.title,
            series_title,
            date_published: Some(date_published),
            local_artifact: true,
            ..MetadataRecord::new(temp_path.to_string_lossy(), filename)
        })
    }
}

/// Highest bitrate audio-only AAC stream
fn select_audio_format<'a>(
    formats: &'a [VideoFormat],
    url: &str,
) -> Result<&'a VideoFormat, SourceError> {
    formats
        .iter()
        .filter(|f| f.is_audio_only() && f.is_aac())
        .max_by(|a, b| a.abr.unwrap_or(0.0).total_cmp(&b.abr.unwrap_or(0.0)))
        .ok_or_else(|| SourceError::NoAudioStream {
            url: url.to_string(),
            encoding: AUDIO_ENCODING,
        })
}

fn parse_upload_date(value: &str) -> Option<DateTime<FixedOffset>> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join(" | ")
}
