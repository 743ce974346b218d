use tracing::debug;

use super::{Direct, Mp3, PlayerFm, Podbean, Source, YouTube};
use crate::error::SourceError;
use crate::http::HttpClient;

/// Priority-ordered list of sources; the first applicable one wins
pub struct SourceRegistry {
    sources: Vec<Box<dyn Source>>,
}

impl SourceRegistry {
    /// Registry with an explicit priority order
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        Self { sources }
    }

    /// All built-in sources.
    ///
    /// Site-specific scrapers come first, then YouTube, then the generic
    /// file matchers: a player.fm page whose URL ends in `.mp3` must still be
    /// scraped, and `Direct` (audio extension on the path) is more specific
    /// than `Mp3` (`.mp3` anywhere in the URL).
    pub fn with_defaults<C: HttpClient + Clone + 'static>(client: C) -> Self {
        Self::new(vec![
            Box::new(PlayerFm::new(client.clone())),
            Box::new(Podbean::new(client)),
            Box::new(YouTube::default()),
            Box::new(Direct),
            Box::new(Mp3),
        ])
    }

    /// Pick the source for `url`
    pub fn resolve(&self, url: &str) -> Result<&dyn Source, SourceError> {
        let source = self
            .sources
            .iter()
            .find(|source| source.applicable(url))
            .map(|source| source.as_ref())
            .ok_or_else(|| SourceError::UnknownSource {
                url: url.to_string(),
            })?;

        debug!(url, source = source.name(), "Resolved source");
        Ok(source)
    }

    /// Source names in priority order
    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }
}
