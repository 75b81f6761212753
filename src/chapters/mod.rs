/// Chapter modelling and boundary resolution module
///
/// Raw AI-proposed chapters carry only a start time and a title. This module
/// derives contiguous ranges from them, merges ranges that are too short,
/// splits ranges that are too long and extracts per-chapter subtitle text.

pub mod markdown;
pub mod resolver;
pub mod segments;

// Re-export main types
pub use markdown::{
    detect_video_type, extract_key_points, extract_speakers, generate_fallback_proposals,
    parse_chapter_proposals, validate_proposals,
};
pub use resolver::{chapter_quality, resolve_chapters, validate_chapters, ChapterQuality, ResolverError};
pub use segments::{extract_segments, ChapterSegment};

use serde::{Deserialize, Serialize};

/// A raw AI-proposed chapter boundary, before resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterProposal {
    /// Start time in seconds
    pub start_sec: f64,
    /// Chapter title
    pub title: String,
}

impl ChapterProposal {
    pub fn new(start_sec: f64, title: impl Into<String>) -> Self {
        Self {
            start_sec,
            title: title.into(),
        }
    }
}

/// A resolved chapter with derived range and subtitle coverage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedChapter {
    /// 0-based position in the resolved list
    pub index: usize,
    /// Start time in seconds
    pub start_sec: f64,
    /// End time in seconds
    pub end_sec: f64,
    /// Chapter title, possibly combined or part-numbered
    pub title: String,
    /// Derived span in seconds
    pub duration_sec: f64,
    /// Subtitle entries whose start falls within the range
    pub entry_count: usize,
}
