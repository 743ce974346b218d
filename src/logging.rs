use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Default filter directives for a verbosity level
pub fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,podsync=info",
        1 => "warn,podsync=debug",
        _ => "info,podsync=trace",
    }
}

/// Current verbosity, applied to the log filter whenever it changes.
///
/// The level only becomes final once the series is known, so the filter is
/// installed with the command line level and adjusted later. A detached
/// instance (the default) tracks the level without touching any filter.
#[derive(Clone, Default)]
pub struct Verbosity {
    level: Arc<AtomicU8>,
    filter: Option<FilterHandle>,
}

impl Verbosity {
    fn detached(level: u8) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(level)),
            filter: None,
        }
    }

    fn with_filter(level: u8, filter: FilterHandle) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(level)),
            filter: Some(filter),
        }
    }

    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    /// Switch to `verbose`, replacing the log filter if the level changed
    pub fn set(&self, verbose: u8) {
        if self.level.swap(verbose, Ordering::Relaxed) == verbose {
            return;
        }
        if let Some(filter) = &self.filter
            && let Err(e) = filter.reload(EnvFilter::new(default_directives(verbose)))
        {
            warn!(error = %e, "Could not change log level");
        }
    }
}

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence over the verbosity level and is never replaced
/// later. ANSI colors are only used when stderr is a terminal, so redirected
/// logs stay clean.
pub fn init_logging(verbose: u8) -> Verbosity {
    let from_env = EnvFilter::try_from_default_env().ok();
    let pinned = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(default_directives(verbose)));
    let (filter, handle) = reload::Layer::new(filter);

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(console::Term::stderr().is_term())
                .with_target(verbose > 0),
        )
        .try_init();

    if result.is_err() || pinned {
        return Verbosity::detached(verbose);
    }
    tracing::debug!(verbose, "Logging initialized");
    Verbosity::with_filter(verbose, handle)
}
