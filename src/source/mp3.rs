use std::borrow::Cow;

use async_trait::async_trait;
use url::Url;

use super::Source;
use crate::error::SourceError;
use crate::metadata::{MetadataRecord, dated_filename, now, url_file_name};

const NAME: &str = "mp3";

/// Used when the URL has no usable last path segment
const FALLBACK_NAME: &str = "episode";

/// Fallback for URLs that mention an mp3 anywhere, e.g. in a query string
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3;

#[async_trait]
impl Source for Mp3 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn applicable(&self, url: &str) -> bool {
        url.to_lowercase().contains(".mp3")
    }

    async fn read(&self, url: &str) -> Result<MetadataRecord, SourceError> {
        let base_name = match Url::parse(url) {
            Ok(parsed) => url_file_name(&parsed).map(Cow::into_owned),
            Err(_) => url.rsplit('/').next().map(str::to_string),
        }
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

        let file_name = if base_name.to_lowercase().ends_with(".mp3") {
            base_name
        } else {
            format!("{base_name}.mp3")
        };

        Ok(MetadataRecord::new(url, dated_filename(&now(), &file_name)))
    }
}
