// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transcoding through an external `ffmpeg` process.
//!
//! A run moves through [`TranscodeState`]: issued, zero or more progress
//! updates, then exactly one of completed, terminated or failed. The caller
//! blocks until a terminal state is reached.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use crate::error::TranscodeError;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Per-instance limits of ffmpeg's `atempo` filter
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Stderr lines kept for error reports
const STDERR_TAIL_LINES: usize = 20;

/// How long ffmpeg gets to exit after being asked to quit
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Parameters for one transcoder run
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    /// Remote URL or local file path
    pub input: String,
    pub destination: PathBuf,
    /// Tempo factor; 1.0 keeps the original speed
    pub speedup: f64,
    /// Known input length, for progress display only
    pub duration_seconds: Option<u64>,
    pub verbose: u8,
}

/// How a transcoder run ended, short of failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    Completed,
    /// Stopped on user request; the destination may hold partial output
    Terminated,
}

/// Lifecycle of a single transcoder run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeState {
    Issued,
    Running { processed_seconds: u64 },
    Completed,
    Terminated,
    Failed,
}

impl TranscodeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated | Self::Failed)
    }

    /// Apply a progress notification. Terminal states ignore it.
    pub fn progress(self, processed_seconds: u64) -> Self {
        if self.is_terminal() {
            self
        } else {
            Self::Running { processed_seconds }
        }
    }

    /// Move to a terminal state. The first terminal state sticks.
    pub fn finish(self, terminal: Self) -> Self {
        if self.is_terminal() { self } else { terminal }
    }
}

/// External tool that converts and re-times the audio
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run the job to a terminal state.
    ///
    /// Interruption by the user yields [`TranscodeOutcome::Terminated`], not an error.
    async fn transcode(
        &self,
        job: &TranscodeJob,
        reporter: &SharedProgressReporter,
    ) -> Result<TranscodeOutcome, TranscodeError>;
}

/// Runs `ffmpeg`, cancelled by Ctrl-C
pub struct FfmpegTranscoder {
    program: PathBuf,
    grace_period: Duration,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Time ffmpeg gets to exit on its own after cancellation before it is killed
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Run the job until it finishes or `cancel` resolves
    pub async fn transcode_until<F>(
        &self,
        job: &TranscodeJob,
        reporter: &SharedProgressReporter,
        cancel: F,
    ) -> Result<TranscodeOutcome, TranscodeError>
    where
        F: Future<Output = ()> + Send,
    {
        let program = self.program.display().to_string();
        let args = ffmpeg_args(job);
        debug!(%program, ?args, "Starting transcoder");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C must reach only us, so ffmpeg
        // stops through `terminate` and never exits on the signal by itself.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| TranscodeError::SpawnFailed {
                program: program.clone(),
                source: e,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(TranscodeError::SpawnFailed {
                program,
                source: std::io::Error::other("output pipes were not captured"),
            });
        };
        let stderr_tail = tokio::spawn(collect_tail(stderr));

        let mut state = TranscodeState::Issued;
        reporter.report(ProgressEvent::TranscodeStarted {
            destination: job.destination.clone(),
            duration_seconds: job.duration_seconds,
        });

        tokio::pin!(cancel);
        let mut progress_lines = BufReader::new(stdout).lines();

        let mut cancelled = loop {
            tokio::select! {
                line = progress_lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let Some(seconds) = parse_progress_line(&line) else { continue };
                        let next = state.progress(seconds);
                        if next != state {
                            reporter.report(ProgressEvent::TranscodeProgress {
                                processed_seconds: seconds,
                                duration_seconds: job.duration_seconds,
                            });
                        }
                        state = next;
                    }
                    Ok(None) => break false,
                    Err(e) => {
                        debug!(error = %e, "Progress stream closed");
                        break false;
                    }
                },
                _ = &mut cancel => break true,
            }
        };

        let mut status = None;
        if !cancelled {
            tokio::select! {
                result = child.wait() => status = Some(result),
                _ = &mut cancel => cancelled = true,
            }
        }

        if cancelled {
            self.terminate(&mut child).await;
            state = state.finish(TranscodeState::Terminated);
            warn!(
                destination = %job.destination.display(),
                "Transcoding interrupted, partial output left in place"
            );
            reporter.report(ProgressEvent::TranscodeTerminated {
                destination: job.destination.clone(),
            });
            debug!(?state, "Transcoder finished");
            return Ok(TranscodeOutcome::Terminated);
        }

        let status = match status {
            Some(result) => result.map_err(|e| TranscodeError::WaitFailed {
                program: program.clone(),
                source: e,
            })?,
            None => child.wait().await.map_err(|e| TranscodeError::WaitFailed {
                program: program.clone(),
                source: e,
            })?,
        };
        let stderr = stderr_tail.await.unwrap_or_default();

        if status.success() {
            state = state.finish(TranscodeState::Completed);
            debug!(?state, "Transcoder finished");
            reporter.report(ProgressEvent::TranscodeCompleted {
                destination: job.destination.clone(),
            });
            Ok(TranscodeOutcome::Completed)
        } else {
            state = state.finish(TranscodeState::Failed);
            debug!(?state, "Transcoder finished");
            let error = TranscodeError::Failed {
                program,
                status: status.code(),
                stderr,
            };
            reporter.report(ProgressEvent::TranscodeFailed {
                error: error.to_string(),
            });
            Err(error)
        }
    }

    /// Ask ffmpeg to quit, killing it if it does not exit within the grace period
    async fn terminate(&self, child: &mut Child) {
        info!("Stopping transcoder");
        if let Some(mut stdin) = child.stdin.take() {
            // "q" is ffmpeg's interactive quit command
            if let Err(e) = stdin.write_all(b"q").await {
                debug!(error = %e, "Could not send quit command");
            }
        }

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Transcoder exited after quit request"),
            Ok(Err(e)) => warn!(error = %e, "Failed waiting for transcoder to exit"),
            Err(_) => {
                warn!("Transcoder did not exit in time, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill transcoder");
                }
            }
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        job: &TranscodeJob,
        reporter: &SharedProgressReporter,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        self.transcode_until(job, reporter, interrupted()).await
    }
}

/// Resolves on Ctrl-C; never resolves if the signal handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C, transcoding is not interruptible");
        std::future::pending::<()>().await;
    }
}

/// Command line for one job
pub fn ffmpeg_args(job: &TranscodeJob) -> Vec<String> {
    let loglevel = if job.verbose > 0 { "debug" } else { "info" };
    vec![
        "-hide_banner".to_string(),
        "-y".to_string(),
        "-loglevel".to_string(),
        loglevel.to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-i".to_string(),
        job.input.clone(),
        "-filter:a".to_string(),
        atempo_filter(job.speedup),
        job.destination.to_string_lossy().into_owned(),
    ]
}

/// `atempo` filter chain for a tempo factor.
///
/// Factors outside a single stage's range are split into several stages whose
/// product equals the requested factor. `speedup` must be positive.
pub fn atempo_filter(speedup: f64) -> String {
    let mut stages = Vec::new();
    let mut remaining = speedup;

    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);

    stages
        .iter()
        .map(|stage| format!("atempo={stage}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Seconds of processed input from a `-progress` line, if it carries them
fn parse_progress_line(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is microseconds as well, despite its name
        "out_time_us" | "out_time_ms" => value.trim().parse::<u64>().ok().map(|us| us / 1_000_000),
        _ => None,
    }
}

async fn collect_tail<R: AsyncRead + Unpin>(reader: R) -> String {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        trace!(target: "podsync::ffmpeg", "{line}");
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}
