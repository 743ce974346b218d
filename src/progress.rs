use std::path::PathBuf;
use std::sync::Arc;

/// Events emitted while downloading a single episode
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A source strategy claimed the URL
    SourceResolved { url: String, source_name: String },

    /// Metadata has been extracted from the source
    MetadataRead {
        series_title: String,
        episode_title: String,
    },

    /// The transcoder process has been issued
    TranscodeStarted {
        destination: PathBuf,
        /// Expected length of the input, if the source knew it
        duration_seconds: Option<u64>,
    },

    /// Transcoder progress update
    TranscodeProgress {
        /// Seconds of input processed so far
        processed_seconds: u64,
        duration_seconds: Option<u64>,
    },

    /// The transcoder finished successfully
    TranscodeCompleted { destination: PathBuf },

    /// The transcoder was terminated on request; the destination may be partial
    TranscodeTerminated { destination: PathBuf },

    /// The transcoder exited with an error
    TranscodeFailed { error: String },

    /// Tags have been written to the output file
    Tagged { destination: PathBuf },
}

/// Trait for reporting progress events during a download.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Collects every event for later inspection
    #[derive(Default)]
    pub struct RecordingReporter {
        pub events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
