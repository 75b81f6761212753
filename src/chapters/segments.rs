use tracing::debug;

use super::ChapterProposal;
use crate::subtitles::{query_range, SubtitleEntry};
use crate::timecode::format_time_range;

/// A chapter's slice of the subtitle track, ready for translation
#[derive(Debug, Clone)]
pub struct ChapterSegment {
    /// 0-based chapter index
    pub index: usize,
    /// Chapter title
    pub title: String,
    /// Start time in seconds
    pub start_sec: f64,
    /// End time, `None` for the open-ended final chapter
    pub end_sec: Option<f64>,
    /// Human-readable range label ("MM:SS - MM:SS" or "MM:SS - End")
    pub time_range: String,
    /// Extracted subtitle text, possibly empty
    pub text: String,
}

/// Extract one text segment per chapter from the subtitle index.
///
/// Each chapter's end is the next chapter's start; the last chapter is
/// open-ended. Extraction extends past the nominal end to the next sentence
/// boundary, so adjacent segments may overlap by a few entries.
pub fn extract_segments(
    chapters: &[ChapterProposal],
    entries: &[SubtitleEntry],
) -> Vec<ChapterSegment> {
    chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| {
            let end_sec = chapters.get(index + 1).map(|next| next.start_sec);
            let time_range = format_time_range(chapter.start_sec, end_sec);
            let text = query_range(entries, chapter.start_sec, end_sec);
            debug!(
                "Segment {} ({}): {} chars",
                index,
                time_range,
                text.len()
            );
            ChapterSegment {
                index,
                title: chapter.title.clone(),
                start_sec: chapter.start_sec,
                end_sec,
                time_range,
                text,
            }
        })
        .collect()
}
