pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod logging;
pub mod metadata;
pub mod progress;
pub mod source;
pub mod tag;
pub mod transcode;

// Re-export main types for convenience
pub use config::{Config, ConfigFile, EffectiveConfig, PartialConfig};
pub use download::{DownloadOutcome, Downloader};
pub use error::{ConfigError, DownloadError, SourceError, TagError, TranscodeError};
pub use http::{HttpClient, ReqwestClient};
pub use metadata::{MetadataRecord, UNKNOWN_EPISODE, UNKNOWN_SERIES};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use source::{Source, SourceRegistry};
pub use tag::{Id3Tagger, TagFields, Tagger};
pub use transcode::{FfmpegTranscoder, TranscodeJob, TranscodeOutcome, Transcoder};
