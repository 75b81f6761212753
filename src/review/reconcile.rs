use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::timecode::{format_timestamp, parse_timestamp, END_SENTINEL};

/// A row from the chapter navigation table; ground truth for final ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterTableEntry {
    pub start_sec: f64,
    pub end_sec: f64,
    pub title: String,
    pub summary: String,
}

/// A time-stamped content block from the translation section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslationBlock {
    pub start_sec: f64,
    pub end_sec: f64,
    pub content: String,
}

const NO_CONTENT_PLACEHOLDER: &str = "*(no translated content for this chapter)*";

/// Parse the chapter navigation table out of a composite document.
///
/// Rows look like `| 00:00 - 05:00 | Title | one-line summary |`. Rows with
/// `start >= end` or a blank title are discarded.
pub fn parse_chapter_table(doc: &str) -> Vec<ChapterTableEntry> {
    let row_pattern = Regex::new(
        r"\|\s*(\d{1,2}:\d{2}(?::\d{2})?)\s*[-–]\s*(\d{1,2}:\d{2}(?::\d{2})?)\s*\|\s*([^|]+)\s*\|\s*([^|]+)\s*\|",
    )
    .unwrap();

    let mut entries = Vec::new();
    for captures in row_pattern.captures_iter(doc) {
        let start_sec = match parse_timestamp(&captures[1]) {
            Some(value) => value,
            None => continue,
        };
        let end_sec = match parse_timestamp(&captures[2]) {
            Some(value) => value,
            None => continue,
        };
        let title = captures[3].trim().to_string();

        if start_sec >= end_sec || title.is_empty() {
            debug!(
                "Discarding chapter table row: {} - {}",
                &captures[1], &captures[2]
            );
            continue;
        }

        entries.push(ChapterTableEntry {
            start_sec,
            end_sec,
            title,
            summary: captures[4].trim().to_string(),
        });
    }

    entries
}

/// Parse the time-stamped blocks of a document's translation section.
///
/// Two dialects are supported: fine-grained `**(a - b)**` paragraph markers,
/// and `### (a - b) Title` chapter headings where `b` may be the literal
/// "End". Dialect 1 is tried first; dialect 2 is a fallback used only when
/// dialect 1 matches nothing, so partial matches never mix.
pub fn parse_translation_blocks(doc: &str) -> Vec<TranslationBlock> {
    match locate_translation_section(doc) {
        Some(bounds) => parse_blocks_in_section(&doc[bounds.content_start..bounds.content_end]),
        None => Vec::new(),
    }
}

/// Reassign translation blocks to the chapters that contain their start
/// times, regenerating the translation section in chapter order. If the
/// document has no chapter table or no blocks, it is returned unchanged.
pub fn reconcile_document(doc: &str) -> String {
    try_reconcile(doc).unwrap_or_else(|| doc.to_string())
}

/// Remove fine-grained `**(a - b)**` markers and their trailing blank line.
///
/// Chapter-heading timestamps are left untouched. Safe to run repeatedly;
/// must only run after reconciliation, which needs the markers.
pub fn strip_fine_timestamps(doc: &str) -> String {
    // The trailing branch also covers a marker on the final line of a
    // document with no terminating newline.
    let marker = Regex::new(
        r"\*\*\(\d{1,2}:\d{2}(?::\d{2})?\s*[-–]\s*(?:\d{1,2}:\d{2}(?::\d{2})?|End)\)\*\*(?:\s*\n\s*\n?|\s*\z)",
    )
    .unwrap();
    marker.replace_all(doc, "").to_string()
}

/// Build a new translation section from a chapter table and loose blocks.
///
/// Each chapter gets its heading and summary, then every unclaimed block
/// whose start lies in `[chapter.start, chapter.end)` in ascending start
/// order. A chapter with no blocks gets an explicit placeholder; a block is
/// claimed by the first containing chapter only.
pub fn rebuild_translation_section(
    table: &[ChapterTableEntry],
    blocks: &[TranslationBlock],
) -> String {
    let mut lines: Vec<String> = vec!["## 📝 Full Translation".to_string(), String::new()];
    let mut used = vec![false; blocks.len()];

    for chapter in table {
        lines.push(format!(
            "### ({} - {}) {}",
            format_timestamp(chapter.start_sec),
            format_timestamp(chapter.end_sec),
            chapter.title
        ));
        lines.push(format!("> {}", chapter.summary));
        lines.push(String::new());

        let mut matched = false;
        for (i, block) in blocks.iter().enumerate() {
            if used[i] || block.start_sec < chapter.start_sec || block.start_sec >= chapter.end_sec
            {
                continue;
            }
            used[i] = true;
            matched = true;

            lines.push(format!(
                "**({} - {})**",
                format_timestamp(block.start_sec),
                block_end_label(block.end_sec)
            ));
            lines.push(String::new());
            lines.push(block.content.clone());
            lines.push(String::new());
        }

        if !matched {
            lines.push(NO_CONTENT_PLACEHOLDER.to_string());
            lines.push(String::new());
        }
    }

    let unclaimed = used.iter().filter(|flag| !**flag).count();
    if unclaimed > 0 {
        warn!("{} translation blocks matched no chapter", unclaimed);
    }

    lines.join("\n")
}

pub(super) fn try_reconcile(doc: &str) -> Option<String> {
    let table = parse_chapter_table(doc);
    if table.is_empty() {
        info!("No chapter table found, skipping reconciliation");
        return None;
    }

    let bounds = match locate_translation_section(doc) {
        Some(bounds) => bounds,
        None => {
            info!("No translation section found, skipping reconciliation");
            return None;
        }
    };

    let blocks = parse_blocks_in_section(&doc[bounds.content_start..bounds.content_end]);
    if blocks.is_empty() {
        info!("No translation blocks found, skipping reconciliation");
        return None;
    }

    debug!(
        "Reconciling {} blocks into {} chapters",
        blocks.len(),
        table.len()
    );
    let section = rebuild_translation_section(&table, &blocks);

    let mut result = String::with_capacity(doc.len() + section.len());
    result.push_str(&doc[..bounds.heading_start]);
    result.push_str(&section);
    result.push('\n');
    result.push_str(&doc[bounds.replace_end..]);
    Some(result)
}

struct SectionBounds {
    heading_start: usize,
    content_start: usize,
    /// Blocks are parsed up to the first horizontal rule
    content_end: usize,
    /// Replacement extends to the generated-footer rule, keeping the footer
    replace_end: usize,
}

fn locate_translation_section(doc: &str) -> Option<SectionBounds> {
    let heading = Regex::new(r"## 📝 Full Translation\s*\n").unwrap();
    let found = heading.find(doc)?;

    let after = &doc[found.end()..];
    let content_end = after
        .find("\n---")
        .map_or(doc.len(), |pos| found.end() + pos);

    let footer = Regex::new(r"\n---\s*\n\*Generated").unwrap();
    let replace_end = footer
        .find(after)
        .map_or(doc.len(), |m| found.end() + m.start());

    Some(SectionBounds {
        heading_start: found.start(),
        content_start: found.end(),
        content_end,
        replace_end,
    })
}

fn parse_blocks_in_section(section: &str) -> Vec<TranslationBlock> {
    let mut blocks = parse_fine_blocks(section);
    if blocks.is_empty() {
        blocks = parse_heading_blocks(section);
    }

    blocks.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));
    blocks
}

/// Dialect 1: `**(a - b)**` markers immediately preceding a paragraph.
fn parse_fine_blocks(section: &str) -> Vec<TranslationBlock> {
    let marker =
        Regex::new(r"\*\*\((\d{1,2}:\d{2}(?::\d{2})?)\s*[-–]\s*(\d{1,2}:\d{2}(?::\d{2})?)\)\*\*")
            .unwrap();

    let markers: Vec<(usize, usize, f64, f64)> = marker
        .captures_iter(section)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let start_sec = parse_timestamp(&captures[1])?;
            let end_sec = parse_timestamp(&captures[2])?;
            Some((whole.start(), whole.end(), start_sec, end_sec))
        })
        .collect();

    slice_block_contents(section, &markers)
}

/// Dialect 2: `### (a - b) Title` headings, with "End" for the open final range.
fn parse_heading_blocks(section: &str) -> Vec<TranslationBlock> {
    let marker = Regex::new(
        r"###\s*\((\d{1,2}:\d{2}(?::\d{2})?)\s*[-–]\s*(\d{1,2}:\d{2}(?::\d{2})?|End)\)[^\n]*",
    )
    .unwrap();

    let markers: Vec<(usize, usize, f64, f64)> = marker
        .captures_iter(section)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let start_sec = parse_timestamp(&captures[1])?;
            let end_sec = if &captures[2] == "End" {
                END_SENTINEL
            } else {
                parse_timestamp(&captures[2])?
            };
            Some((whole.start(), whole.end(), start_sec, end_sec))
        })
        .collect();

    slice_block_contents(section, &markers)
}

/// Block content runs from the end of its marker to the start of the next
/// marker (or the end of the section). Blocks with no content are dropped.
fn slice_block_contents(
    section: &str,
    markers: &[(usize, usize, f64, f64)],
) -> Vec<TranslationBlock> {
    let mut blocks = Vec::new();

    for (i, &(_, content_from, start_sec, end_sec)) in markers.iter().enumerate() {
        let content_to = markers.get(i + 1).map_or(section.len(), |next| next.0);
        let content = section[content_from..content_to].trim();
        if content.is_empty() {
            continue;
        }
        blocks.push(TranslationBlock {
            start_sec,
            end_sec,
            content: content.to_string(),
        });
    }

    blocks
}

fn block_end_label(end_sec: f64) -> String {
    if end_sec >= END_SENTINEL {
        "End".to_string()
    } else {
        format_timestamp(end_sec)
    }
}
