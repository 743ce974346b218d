use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving a URL to a source and extracting metadata
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unknown podcast source for {url}, check that the URL is correct")]
    UnknownSource { url: String },

    #[error("Failed to fetch {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{source_name} could not extract metadata from {url}: {reason}")]
    ExtractionFailed {
        source_name: &'static str,
        url: String,
        reason: String,
        /// Raw page persisted for diagnosis, if any
        snapshot: Option<PathBuf>,
    },

    #[error("No audio-only {encoding} stream available for {url}")]
    NoAudioStream { url: String, encoding: &'static str },

    #[error("Failed to run {program}: {source}")]
    ToolFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Path of the diagnostic snapshot written alongside this error, if any
    pub fn snapshot(&self) -> Option<&PathBuf> {
        match self {
            SourceError::ExtractionFailed { snapshot, .. } => snapshot.as_ref(),
            _ => None,
        }
    }
}

/// Errors that can occur while loading or resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid speedup {value} in {tier}: must be a positive number")]
    InvalidSpeedup { tier: String, value: f64 },

    /// No tier, not even the built-in defaults, provided a value. This is a bug.
    #[error("Configuration key '{key}' has no value in any tier")]
    MissingKey { key: &'static str },
}

/// Errors that can occur while running the external transcoder
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for {program}: {source}")]
    WaitFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {status:?}:\n{stderr}")]
    Failed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// Errors that can occur while writing audio tags
#[derive(Error, Debug)]
pub enum TagError {
    #[error("Failed to write tags to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },
}

/// Top-level errors for a single episode download
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
