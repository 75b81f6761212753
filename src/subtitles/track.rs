use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::srt::{merge_by_pause, parse_srt_content};
use super::SubtitleEntry;
use crate::timecode::format_timestamp;

/// An ordered, immutable caption track parsed from SRT content
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    entries: Vec<SubtitleEntry>,
}

/// Quality metrics for a parsed track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackQuality {
    pub entry_count: usize,
    pub time_span_sec: f64,
    pub covered_duration_sec: f64,
    pub coverage_percent: f64,
    pub avg_entry_duration_sec: f64,
    pub total_text_length: usize,
}

impl SubtitleTrack {
    /// Parse raw SRT content into a track. Malformed blocks are dropped.
    pub fn from_srt(raw: &str) -> Self {
        Self {
            entries: parse_srt_content(raw),
        }
    }

    pub fn from_entries(entries: Vec<SubtitleEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Media duration implied by the track (end of the last entry).
    pub fn total_duration(&self) -> f64 {
        self.entries.last().map_or(0.0, |entry| entry.end_sec)
    }

    /// First start and last end, when the track has any entries.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some((first.start_sec, last.end_sec))
    }

    /// Paragraph-merged transcript with "(MM:SS) text" lines, the form fed
    /// to the summary prompt.
    pub fn clean_transcript(&self, merge_interval_sec: f64) -> String {
        merge_by_pause(&self.entries, merge_interval_sec)
            .into_iter()
            .map(|(start_sec, text)| format!("({}) {}", format_timestamp(start_sec), text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Prepend a video-information header to a transcript.
    pub fn with_header(&self, transcript: &str, title: &str, channel: &str, url: &str) -> String {
        let duration_sec = self.total_duration();
        format!(
            "===== Video Information =====\n\
             Title: {}\n\
             Channel: {}\n\
             URL: {}\n\
             Duration: {} ({:.0}s)\n\
             Subtitles: {} entries\n\
             =============================\n\n{}",
            title,
            channel,
            url,
            format_timestamp(duration_sec),
            duration_sec,
            self.entries.len(),
            transcript
        )
    }

    /// Check the track against quality expectations, returning issue strings.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.entries.is_empty() {
            issues.push("No subtitle entries found".to_string());
            return issues;
        }

        let empty_count = self
            .entries
            .iter()
            .filter(|entry| entry.text.trim().is_empty())
            .count();
        if empty_count > 0 {
            issues.push(format!("{} entries with empty text", empty_count));
        }

        let short_count = self
            .entries
            .iter()
            .filter(|entry| entry.end_sec - entry.start_sec < 0.5)
            .count();
        if short_count * 10 > self.entries.len() {
            issues.push(format!("{} very short entries", short_count));
        }

        // Overlaps are tolerated downstream but worth surfacing
        let overlap_count = self
            .entries
            .windows(2)
            .filter(|pair| pair[0].end_sec > pair[1].start_sec)
            .count();
        if overlap_count > 0 {
            issues.push(format!("{} overlapping entry pairs", overlap_count));
        }

        if issues.is_empty() {
            info!("Subtitle validation passed: {} entries", self.entries.len());
        } else {
            warn!("Subtitle validation issues: {:?}", issues);
        }

        issues
    }

    /// Coverage and density metrics for the track.
    pub fn quality(&self) -> TrackQuality {
        if self.entries.is_empty() {
            return TrackQuality {
                entry_count: 0,
                time_span_sec: 0.0,
                covered_duration_sec: 0.0,
                coverage_percent: 0.0,
                avg_entry_duration_sec: 0.0,
                total_text_length: 0,
            };
        }

        let (first_start, last_end) = (
            self.entries[0].start_sec,
            self.entries[self.entries.len() - 1].end_sec,
        );
        let time_span_sec = last_end - first_start;
        let covered_duration_sec: f64 = self
            .entries
            .iter()
            .map(|entry| entry.end_sec - entry.start_sec)
            .sum();
        let total_text_length: usize = self.entries.iter().map(|entry| entry.text.len()).sum();

        TrackQuality {
            entry_count: self.entries.len(),
            time_span_sec,
            covered_duration_sec,
            coverage_percent: if time_span_sec > 0.0 {
                covered_duration_sec / time_span_sec * 100.0
            } else {
                0.0
            },
            avg_entry_duration_sec: covered_duration_sec / self.entries.len() as f64,
            total_text_length,
        }
    }
}
