mod filename;
mod record;

pub use filename::{
    SEPARATOR, audio_extension, date_prefix, dated_filename, episode_filename, sanitize_component,
    url_file_name,
};
pub use record::{MetadataRecord, UNKNOWN_EPISODE, UNKNOWN_SERIES, now};
