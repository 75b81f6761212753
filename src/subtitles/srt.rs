use regex::Regex;
use tracing::{debug, warn};

use super::SubtitleEntry;
use crate::timecode::parse_timestamp;

/// Parse raw SRT content into subtitle entries.
///
/// Blocks are separated by blank lines. A block needs an index line, a
/// "start --> end" timestamp line and at least one text line; anything
/// that does not fit is skipped rather than failing the whole track.
pub fn parse_srt_content(raw: &str) -> Vec<SubtitleEntry> {
    let block_splitter = Regex::new(r"\n\s*\n").unwrap();
    let timestamp_line =
        Regex::new(r"^(\d{2}:\d{2}:\d{2}[.,]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[.,]\d{3})").unwrap();
    let markup_tag = Regex::new(r"<[^>]+>").unwrap();

    let mut entries = Vec::new();

    for block in block_splitter.split(raw) {
        let lines: Vec<&str> = block.trim().lines().collect();
        if lines.len() < 3 {
            debug!("Skipping short subtitle block: {:?}", lines.first());
            continue;
        }

        let captures = match timestamp_line.captures(lines[1]) {
            Some(captures) => captures,
            None => {
                warn!("Skipping block without timestamp line: {}", lines[1]);
                continue;
            }
        };

        let start_sec = match parse_timestamp(&captures[1]) {
            Some(value) => value,
            None => {
                warn!("Skipping block with unparseable start: {}", &captures[1]);
                continue;
            }
        };
        let end_sec = match parse_timestamp(&captures[2]) {
            Some(value) => value,
            None => {
                warn!("Skipping block with unparseable end: {}", &captures[2]);
                continue;
            }
        };

        let joined = lines[2..].join("\n");
        let text = markup_tag.replace_all(&joined, "").trim().to_string();
        if text.is_empty() {
            continue;
        }

        let index = (entries.len() + 1) as u32;
        entries.push(SubtitleEntry::new(index, start_sec, end_sec, text));
    }

    if entries.is_empty() {
        warn!("No valid subtitle entries found");
    } else {
        debug!("Parsed {} subtitle entries", entries.len());
    }

    entries
}

/// Concatenate the text of entries whose start falls in `[start_sec, end_sec)`.
///
/// If the last included entry cuts off mid-sentence, subsequent entries are
/// pulled in until one ends with terminal punctuation so a chapter boundary
/// never truncates a sentence. An open end takes everything from `start_sec`.
pub fn query_range(entries: &[SubtitleEntry], start_sec: f64, end_sec: Option<f64>) -> String {
    let mut texts: Vec<&str> = Vec::new();

    for entry in entries {
        if entry.start_sec < start_sec {
            continue;
        }

        let within = match end_sec {
            Some(end) => entry.start_sec < end,
            None => true,
        };

        if within {
            texts.push(&entry.text);
        } else {
            // Past the upper bound: extend only while the sentence is open.
            match texts.last() {
                Some(last) if !ends_sentence(last) => {
                    texts.push(&entry.text);
                    if ends_sentence(&entry.text) {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    texts.join("\n")
}

/// Group consecutive entries into paragraphs.
///
/// A paragraph keeps growing while its elapsed span stays under
/// `max_gap_sec`, or while the previous entry left a sentence open and the
/// next entry follows within 2 seconds. Returns `(start_sec, merged_text)`
/// pairs; empty input yields empty output.
pub fn merge_by_pause(entries: &[SubtitleEntry], max_gap_sec: f64) -> Vec<(f64, String)> {
    let mut merged = Vec::new();
    if entries.is_empty() {
        return merged;
    }

    let mut current_start = entries[0].start_sec;
    let mut last_end = entries[0].end_sec;
    let mut texts: Vec<&str> = Vec::new();

    for entry in entries {
        let span_reached = entry.start_sec - current_start >= max_gap_sec;
        let sentence_pause = texts.last().map_or(false, |last| ends_sentence(last))
            && entry.start_sec - last_end > 2.0;

        if (span_reached || sentence_pause) && !texts.is_empty() {
            merged.push((current_start, texts.join(" ")));
            current_start = entry.start_sec;
            texts.clear();
        }

        texts.push(&entry.text);
        last_end = entry.end_sec;
    }

    if !texts.is_empty() {
        merged.push((current_start, texts.join(" ")));
    }

    merged
}

/// Last `n` lines of a text, used as rolling context between chapters.
pub fn get_last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].join("\n")
}

fn ends_sentence(text: &str) -> bool {
    matches!(
        text.trim_end().chars().last(),
        Some('.') | Some('?') | Some('!')
    )
}
