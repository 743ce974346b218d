// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Source strategies turn an episode URL into a [`MetadataRecord`].
//!
//! | Source | Module | Matches | Method |
//! |--------|--------|---------|--------|
//! | player.fm | [`playerfm`] | `player.fm` | `<meta>` tag scraping |
//! | Podbean | [`podbean`] | `podbean.com` | JSON-LD block |
//! | YouTube | [`youtube`] | youtube.com, youtu.be | yt-dlp, audio stream saved locally |
//! | Direct | [`direct`] | path ends in an audio extension | none |
//! | Mp3 | [`mp3`] | `.mp3` anywhere | none |

mod direct;
mod html;
mod mp3;
mod parse;
mod playerfm;
mod podbean;
mod registry;
mod youtube;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::metadata::MetadataRecord;

pub use direct::Direct;
pub use mp3::Mp3;
pub use playerfm::PlayerFm;
pub use podbean::Podbean;
pub use registry::SourceRegistry;
pub use youtube::YouTube;

/// A provider-specific extraction strategy
#[async_trait]
pub trait Source: Send + Sync {
    /// Short identifier used in logs and progress output
    fn name(&self) -> &'static str;

    /// Whether this source handles `url`.
    ///
    /// Must be cheap and free of side effects: no network I/O.
    fn applicable(&self, url: &str) -> bool;

    /// Extract metadata for `url`, fetching whatever the source needs
    async fn read(&self, url: &str) -> Result<MetadataRecord, SourceError>;
}
