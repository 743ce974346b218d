use async_trait::async_trait;
use url::Url;

use super::Source;
use crate::error::SourceError;
use crate::metadata::{MetadataRecord, audio_extension, dated_filename, now, url_file_name};

const NAME: &str = "direct";

/// Links straight to an audio file; nothing is fetched before transcoding
#[derive(Debug, Default, Clone, Copy)]
pub struct Direct;

#[async_trait]
impl Source for Direct {
    fn name(&self) -> &'static str {
        NAME
    }

    fn applicable(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|url| url_file_name(&url).and_then(|name| audio_extension(&name)))
            .is_some()
    }

    async fn read(&self, url: &str) -> Result<MetadataRecord, SourceError> {
        let extraction_failed = |reason: &str| SourceError::ExtractionFailed {
            source_name: NAME,
            url: url.to_string(),
            reason: reason.to_string(),
            snapshot: None,
        };

        let parsed = Url::parse(url).map_err(|e| extraction_failed(&e.to_string()))?;
        let file_name =
            url_file_name(&parsed).ok_or_else(|| extraction_failed("URL has no file name"))?;
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name.as_ref(), |(stem, _)| stem);

        Ok(MetadataRecord {
            episode_title: Some(stem.to_string()),
            ..MetadataRecord::new(url, dated_filename(&now(), &file_name))
        })
    }
}
