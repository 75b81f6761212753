/// Subtitle parsing and indexing module
///
/// Builds an ordered in-memory index over SRT caption tracks and supports
/// the range queries and pause-based merging the rest of the pipeline is
/// built on.

pub mod srt;
pub mod track;

// Re-export main types
pub use srt::{get_last_lines, merge_by_pause, parse_srt_content, query_range};
pub use track::{SubtitleTrack, TrackQuality};

use serde::{Deserialize, Serialize};

/// A single caption entry from an SRT track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubtitleEntry {
    /// 1-based index, stable per parsed track
    pub index: u32,
    /// Start time in seconds
    pub start_sec: f64,
    /// End time in seconds
    pub end_sec: f64,
    /// Caption text with markup stripped
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(index: u32, start_sec: f64, end_sec: f64, text: String) -> Self {
        Self {
            index,
            start_sec,
            end_sec,
            text: text.trim().to_string(),
        }
    }
}
