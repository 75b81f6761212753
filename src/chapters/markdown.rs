use regex::Regex;
use tracing::debug;

use super::ChapterProposal;

/// Extract chapter proposals from AI summary markdown.
///
/// Tries the chapter table first (`| 05:30 | Title | ... |` rows, with or
/// without an end time after the start), then two list-style fallbacks.
/// Patterns are tried in priority order and only the first one that matches
/// anything contributes, so dialects never mix.
pub fn parse_chapter_proposals(summary: &str) -> Vec<ChapterProposal> {
    let table_pattern = Regex::new(
        r"\|\s*(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*[-–]\s*\d{1,2}:\d{2}(?::\d{2})?)?\s*\|\s*([^|]+)\s*\|",
    )
    .unwrap();

    let mut proposals = collect_proposals(&table_pattern, summary);
    if !proposals.is_empty() {
        debug!("Parsed {} chapter proposals from table", proposals.len());
        return proposals;
    }

    // List-format variations: "- **00:00-01:30**: Title" or "- **00:00** - Title"
    let list_patterns = [
        Regex::new(r"-\s*\*\*(\d{1,2}):(\d{2})(?::(\d{2}))?(?:-[^*]+)?\*\*[：:]\s*(.+)").unwrap(),
        Regex::new(r"-\s*\*\*(\d{1,2}):(\d{2})(?::(\d{2}))?\*\*\s*[-–—]\s*(.+)").unwrap(),
    ];

    for pattern in &list_patterns {
        proposals = collect_proposals(pattern, summary);
        if !proposals.is_empty() {
            debug!("Parsed {} chapter proposals from list", proposals.len());
            break;
        }
    }

    proposals
}

fn collect_proposals(pattern: &Regex, summary: &str) -> Vec<ChapterProposal> {
    pattern
        .captures_iter(summary)
        .map(|captures| {
            let first: u32 = captures[1].parse().unwrap_or(0);
            let second: u32 = captures[2].parse().unwrap_or(0);
            let start_sec = match captures.get(3) {
                // H:MM:SS form
                Some(third) => {
                    let secs: u32 = third.as_str().parse().unwrap_or(0);
                    (first * 3600 + second * 60 + secs) as f64
                }
                // MM:SS form
                None => (first * 60 + second) as f64,
            };
            ChapterProposal::new(start_sec, captures[4].trim())
        })
        .collect()
}

/// Classify the video from summary keywords; "general" when nothing matches.
pub fn detect_video_type(summary: &str) -> &'static str {
    let lowered = summary.to_lowercase();
    if lowered.contains("interview") || lowered.contains("访谈") || lowered.contains("采访") {
        "interview"
    } else if lowered.contains("speech")
        || lowered.contains("presentation")
        || lowered.contains("演讲")
    {
        "speech"
    } else if lowered.contains("tutorial") || lowered.contains("教程") {
        "tutorial"
    } else if lowered.contains("news") || lowered.contains("新闻") {
        "news"
    } else if lowered.contains("analysis") || lowered.contains("分析") {
        "analysis"
    } else {
        "general"
    }
}

/// Pull speaker names from a `**Speakers**: Alice, Bob` line.
pub fn extract_speakers(summary: &str) -> Vec<String> {
    let pattern = Regex::new(r"(?m)^[-*\s]*\*\*Speakers?\*\*[：:]\s*(.+)$").unwrap();
    match pattern.captures(summary) {
        Some(captures) => captures[1]
            .split([',', '、'])
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Bullet lines under a TL;DR or key-points heading, capped at five.
pub fn extract_key_points(summary: &str) -> Vec<String> {
    let heading = Regex::new(r"(?im)^#{2,3}.*(?:TL;DR|Key Points).*$").unwrap();
    let section_start = match heading.find(summary) {
        Some(found) => found.end(),
        None => return Vec::new(),
    };

    let rest = &summary[section_start..];
    let section = match rest.find("\n#") {
        Some(pos) => &rest[..pos],
        None => rest,
    };

    let bullet = Regex::new(r"(?m)^\s*[-*]\s+(.+)$").unwrap();
    bullet
        .captures_iter(section)
        .take(5)
        .map(|captures| captures[1].trim().to_string())
        .collect()
}

/// Sanity check on raw proposals; reports issues, never reorders.
pub fn validate_proposals(proposals: &[ChapterProposal]) -> Vec<String> {
    let mut issues = Vec::new();

    if proposals.is_empty() {
        issues.push("No chapter proposals".to_string());
        return issues;
    }

    for (i, pair) in proposals.windows(2).enumerate() {
        if pair[1].start_sec < pair[0].start_sec {
            issues.push(format!("Proposals out of order at index {}", i + 1));
        }
    }
    for (i, proposal) in proposals.iter().enumerate() {
        if proposal.title.trim().is_empty() {
            issues.push(format!("Proposal {} has an empty title", i));
        }
    }

    issues
}

/// Interval-based chapters for when the summary yields no usable proposals.
pub fn generate_fallback_proposals(total_duration_sec: f64, interval_sec: u64) -> Vec<ChapterProposal> {
    let total = total_duration_sec.max(0.0) as u64;
    if interval_sec == 0 || total <= interval_sec {
        return vec![ChapterProposal::new(0.0, "Full Video")];
    }

    (0..total)
        .step_by(interval_sec as usize)
        .map(|start| {
            ChapterProposal::new(start as f64, format!("Part {}", start / interval_sec + 1))
        })
        .collect()
}
