use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{ChapterProposal, OptimizedChapter};
use crate::subtitles::SubtitleEntry;

/// Rejected duration policy passed to [`resolve_chapters`].
#[derive(Debug, Error, PartialEq)]
pub enum ResolverError {
    #[error("duration bounds must be positive (min {min}s, max {max}s)")]
    NonPositiveBounds { min: f64, max: f64 },

    #[error("min duration {min}s exceeds max duration {max}s")]
    InvertedBounds { min: f64, max: f64 },
}

/// Aggregate metrics over a resolved chapter list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterQuality {
    pub total_chapters: usize,
    pub total_duration_sec: f64,
    pub avg_duration_sec: f64,
    pub min_duration_sec: f64,
    pub max_duration_sec: f64,
    pub std_dev_duration_sec: f64,
    pub avg_entry_count: f64,
}

/// Resolve raw chapter proposals into contiguous, duration-bounded chapters.
///
/// Proposals are assumed sorted ascending by start time and are not
/// re-sorted. Ends are derived from the next proposal's start, with the
/// total media duration closing the last chapter. A single left-to-right
/// merge pass folds chapters shorter than `min_duration_sec` into their
/// successor (titles joined with " & "); a merged chapter is not
/// re-evaluated, and a short final chapter with no successor stays short.
/// Chapters longer than `max_duration_sec` are then split into equal parts
/// labelled "(Part k/n)", the last part absorbing any remainder.
pub fn resolve_chapters(
    proposals: &[ChapterProposal],
    entries: &[SubtitleEntry],
    total_duration_sec: f64,
    min_duration_sec: f64,
    max_duration_sec: f64,
) -> Result<Vec<OptimizedChapter>, ResolverError> {
    if min_duration_sec <= 0.0 || max_duration_sec <= 0.0 {
        return Err(ResolverError::NonPositiveBounds {
            min: min_duration_sec,
            max: max_duration_sec,
        });
    }
    if min_duration_sec > max_duration_sec {
        return Err(ResolverError::InvertedBounds {
            min: min_duration_sec,
            max: max_duration_sec,
        });
    }

    if proposals.is_empty() {
        warn!("No chapters to optimize");
        return Ok(Vec::new());
    }
    if entries.is_empty() {
        warn!("No subtitle entries for optimization");
        return Ok(Vec::new());
    }

    // Derive the end of each chapter from its successor's start
    let mut ranged: Vec<(f64, f64, String)> = Vec::with_capacity(proposals.len());
    for (i, proposal) in proposals.iter().enumerate() {
        let end_sec = match proposals.get(i + 1) {
            Some(next) => next.start_sec,
            None => total_duration_sec,
        };
        ranged.push((proposal.start_sec, end_sec, proposal.title.clone()));
    }

    // Merge pass: single scan, short chapters absorb their successor
    let mut merged: Vec<(f64, f64, String)> = Vec::with_capacity(ranged.len());
    let mut i = 0;
    while i < ranged.len() {
        let (start_sec, end_sec, ref title) = ranged[i];
        let duration = end_sec - start_sec;

        if duration >= min_duration_sec {
            merged.push((start_sec, end_sec, title.clone()));
            i += 1;
        } else if i + 1 < ranged.len() {
            let (_, next_end, ref next_title) = ranged[i + 1];
            merged.push((start_sec, next_end, format!("{} & {}", title, next_title)));
            i += 2;
        } else {
            // Last chapter with no successor to merge into
            merged.push((start_sec, end_sec, title.clone()));
            i += 1;
        }
    }

    // Split pass: divide over-long chapters into equal-width parts
    let mut resolved: Vec<(f64, f64, String)> = Vec::with_capacity(merged.len());
    for (start_sec, end_sec, title) in merged {
        let duration = end_sec - start_sec;

        if duration <= max_duration_sec {
            resolved.push((start_sec, end_sec, title));
            continue;
        }

        let num_parts = (duration / max_duration_sec).ceil() as usize;
        let part_duration = duration / num_parts as f64;

        for k in 0..num_parts {
            let part_start = start_sec + k as f64 * part_duration;
            // Exact original end on the last part so no span is lost to rounding
            let part_end = if k == num_parts - 1 {
                end_sec
            } else {
                start_sec + (k + 1) as f64 * part_duration
            };
            resolved.push((
                part_start,
                part_end,
                format!("{} (Part {}/{})", title, k + 1, num_parts),
            ));
        }
    }

    let chapters = resolved
        .into_iter()
        .enumerate()
        .map(|(index, (start_sec, end_sec, title))| {
            let entry_count = entries
                .iter()
                .filter(|entry| entry.start_sec >= start_sec && entry.start_sec < end_sec)
                .count();
            OptimizedChapter {
                index,
                start_sec,
                end_sec,
                title,
                duration_sec: end_sec - start_sec,
                entry_count,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Resolved {} proposals into {} chapters",
        proposals.len(),
        chapters.len()
    );
    Ok(chapters)
}

/// Check a resolved chapter list against duration policy, returning issue strings.
pub fn validate_chapters(
    chapters: &[OptimizedChapter],
    min_duration_sec: f64,
    max_duration_sec: f64,
) -> Vec<String> {
    let mut issues = Vec::new();

    for pair in chapters.windows(2) {
        if pair[0].end_sec > pair[1].start_sec {
            issues.push(format!(
                "Overlapping chapters {} and {}",
                pair[0].index, pair[1].index
            ));
        } else if pair[0].end_sec < pair[1].start_sec {
            issues.push(format!(
                "Gap between chapters {} and {}",
                pair[0].index, pair[1].index
            ));
        }
    }

    for chapter in chapters {
        if chapter.title.trim().is_empty() {
            issues.push(format!("Chapter {} has empty title", chapter.index));
        }
        if chapter.duration_sec < min_duration_sec {
            issues.push(format!(
                "Chapter {} too short: {:.0}s",
                chapter.index, chapter.duration_sec
            ));
        }
        if chapter.duration_sec > max_duration_sec {
            issues.push(format!(
                "Chapter {} too long: {:.0}s",
                chapter.index, chapter.duration_sec
            ));
        }
    }

    issues
}

/// Duration and coverage statistics over a resolved chapter list.
pub fn chapter_quality(chapters: &[OptimizedChapter]) -> ChapterQuality {
    if chapters.is_empty() {
        return ChapterQuality {
            total_chapters: 0,
            total_duration_sec: 0.0,
            avg_duration_sec: 0.0,
            min_duration_sec: 0.0,
            max_duration_sec: 0.0,
            std_dev_duration_sec: 0.0,
            avg_entry_count: 0.0,
        };
    }

    let count = chapters.len() as f64;
    let total: f64 = chapters.iter().map(|c| c.duration_sec).sum();
    let avg = total / count;
    let variance = chapters
        .iter()
        .map(|c| (c.duration_sec - avg).powi(2))
        .sum::<f64>()
        / count;
    let min = chapters
        .iter()
        .map(|c| c.duration_sec)
        .fold(f64::INFINITY, f64::min);
    let max = chapters
        .iter()
        .map(|c| c.duration_sec)
        .fold(f64::NEG_INFINITY, f64::max);
    let avg_entries = chapters.iter().map(|c| c.entry_count).sum::<usize>() as f64 / count;

    ChapterQuality {
        total_chapters: chapters.len(),
        total_duration_sec: total,
        avg_duration_sec: avg,
        min_duration_sec: min,
        max_duration_sec: max,
        std_dev_duration_sec: variance.sqrt(),
        avg_entry_count: avg_entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposals(raw: &[(f64, &str)]) -> Vec<ChapterProposal> {
        raw.iter()
            .map(|(start, title)| ChapterProposal::new(*start, *title))
            .collect()
    }

    fn entries_every(step: f64, total: f64) -> Vec<SubtitleEntry> {
        let mut entries = Vec::new();
        let mut start = 0.0;
        let mut index = 1;
        while start < total {
            entries.push(SubtitleEntry::new(
                index,
                start,
                start + step.min(total - start),
                "text.".to_string(),
            ));
            index += 1;
            start += step;
        }
        entries
    }

    #[test]
    fn test_no_merges_or_splits_needed() {
        let proposals = proposals(&[(0.0, "Intro"), (400.0, "Deep Dive"), (1200.0, "Wrap")]);
        let entries = entries_every(10.0, 1500.0);

        let chapters = resolve_chapters(&proposals, &entries, 1500.0, 300.0, 900.0).unwrap();

        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].start_sec, 0.0);
        assert_eq!(chapters[0].end_sec, 400.0);
        assert_eq!(chapters[0].title, "Intro");
        assert_eq!(chapters[1].end_sec, 1200.0);
        assert_eq!(chapters[2].end_sec, 1500.0);
        assert_eq!(chapters[2].duration_sec, 300.0);
    }

    #[test]
    fn test_short_chapter_merges_with_next() {
        let proposals = proposals(&[(0.0, "A"), (100.0, "B"), (1000.0, "C")]);
        let entries = entries_every(10.0, 1000.0);

        let chapters = resolve_chapters(&proposals, &entries, 1000.0, 300.0, 1000.0).unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "A & B");
        assert_eq!(chapters[0].start_sec, 0.0);
        assert_eq!(chapters[0].end_sec, 1000.0);
        // Trailing zero-duration chapter is kept, not dropped
        assert_eq!(chapters[1].title, "C");
        assert_eq!(chapters[1].start_sec, 1000.0);
        assert_eq!(chapters[1].end_sec, 1000.0);
        assert_eq!(chapters[1].duration_sec, 0.0);
        assert_eq!(chapters[1].entry_count, 0);
    }

    #[test]
    fn test_merge_is_single_pass() {
        // A+B merged span is still short of min, but the pass does not
        // re-evaluate merged chapters.
        let proposals = proposals(&[(0.0, "A"), (50.0, "B"), (150.0, "C")]);
        let entries = entries_every(10.0, 600.0);

        let chapters = resolve_chapters(&proposals, &entries, 600.0, 200.0, 900.0).unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "A & B");
        assert_eq!(chapters[0].duration_sec, 150.0);
        assert_eq!(chapters[1].title, "C");
    }

    #[test]
    fn test_last_chapter_may_stay_short() {
        let proposals = proposals(&[(0.0, "A"), (500.0, "B")]);
        let entries = entries_every(10.0, 600.0);

        let chapters = resolve_chapters(&proposals, &entries, 600.0, 300.0, 900.0).unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].title, "B");
        assert_eq!(chapters[1].duration_sec, 100.0);
    }

    #[test]
    fn test_long_chapter_splits_into_parts() {
        let proposals = proposals(&[(0.0, "Marathon")]);
        let entries = entries_every(10.0, 2000.0);

        let chapters = resolve_chapters(&proposals, &entries, 2000.0, 180.0, 900.0).unwrap();

        // ceil(2000 / 900) = 3 parts
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].title, "Marathon (Part 1/3)");
        assert_eq!(chapters[1].title, "Marathon (Part 2/3)");
        assert_eq!(chapters[2].title, "Marathon (Part 3/3)");
        assert_eq!(chapters[0].start_sec, 0.0);
        assert_eq!(chapters[2].end_sec, 2000.0);
        for chapter in &chapters {
            assert!(chapter.duration_sec <= 900.0);
        }
    }

    #[test]
    fn test_resolved_chapters_are_contiguous() {
        let proposals = proposals(&[
            (0.0, "A"),
            (90.0, "B"),
            (700.0, "C"),
            (800.0, "D"),
            (3000.0, "E"),
        ]);
        let entries = entries_every(5.0, 4000.0);

        let chapters = resolve_chapters(&proposals, &entries, 4000.0, 180.0, 900.0).unwrap();

        assert_eq!(chapters[0].start_sec, 0.0);
        for pair in chapters.windows(2) {
            assert_eq!(pair[0].end_sec, pair[1].start_sec);
        }
        assert_eq!(chapters.last().unwrap().end_sec, 4000.0);
    }

    #[test]
    fn test_entry_count_by_start_containment() {
        let proposals = proposals(&[(0.0, "A"), (400.0, "B")]);
        // One entry straddles the boundary: starts at 395, ends at 405.
        // It counts for A only, by start containment.
        let entries = vec![
            SubtitleEntry::new(1, 10.0, 20.0, "a.".to_string()),
            SubtitleEntry::new(2, 395.0, 405.0, "b.".to_string()),
            SubtitleEntry::new(3, 400.0, 410.0, "c.".to_string()),
        ];

        let chapters = resolve_chapters(&proposals, &entries, 800.0, 300.0, 900.0).unwrap();

        assert_eq!(chapters[0].entry_count, 2);
        assert_eq!(chapters[1].entry_count, 1);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let proposals = proposals(&[(0.0, "A")]);
        let entries = entries_every(10.0, 100.0);

        assert!(matches!(
            resolve_chapters(&proposals, &entries, 100.0, 0.0, 900.0),
            Err(ResolverError::NonPositiveBounds { .. })
        ));
        assert!(matches!(
            resolve_chapters(&proposals, &entries, 100.0, -5.0, 900.0),
            Err(ResolverError::NonPositiveBounds { .. })
        ));
        assert!(matches!(
            resolve_chapters(&proposals, &entries, 100.0, 180.0, 0.0),
            Err(ResolverError::NonPositiveBounds { .. })
        ));
        assert!(matches!(
            resolve_chapters(&proposals, &entries, 100.0, 900.0, 180.0),
            Err(ResolverError::InvertedBounds { .. })
        ));
    }

    #[test]
    fn test_empty_inputs_yield_empty_output() {
        let entries = entries_every(10.0, 100.0);
        assert!(resolve_chapters(&[], &entries, 100.0, 180.0, 900.0)
            .unwrap()
            .is_empty());

        let proposals = proposals(&[(0.0, "A")]);
        assert!(resolve_chapters(&proposals, &[], 100.0, 180.0, 900.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_validate_flags_policy_violations() {
        let chapters = vec![
            OptimizedChapter {
                index: 0,
                start_sec: 0.0,
                end_sec: 500.0,
                title: "A".to_string(),
                duration_sec: 500.0,
                entry_count: 10,
            },
            OptimizedChapter {
                index: 1,
                start_sec: 400.0,
                end_sec: 450.0,
                title: "".to_string(),
                duration_sec: 50.0,
                entry_count: 2,
            },
        ];

        let issues = validate_chapters(&chapters, 180.0, 900.0);
        assert!(issues.iter().any(|m| m.contains("Overlapping")));
        assert!(issues.iter().any(|m| m.contains("empty title")));
        assert!(issues.iter().any(|m| m.contains("too short")));
    }

    #[test]
    fn test_quality_metrics() {
        let proposals = proposals(&[(0.0, "A"), (400.0, "B")]);
        let entries = entries_every(10.0, 800.0);
        let chapters = resolve_chapters(&proposals, &entries, 800.0, 300.0, 900.0).unwrap();

        let quality = chapter_quality(&chapters);
        assert_eq!(quality.total_chapters, 2);
        assert_eq!(quality.total_duration_sec, 800.0);
        assert_eq!(quality.avg_duration_sec, 400.0);
        assert_eq!(quality.min_duration_sec, 400.0);
        assert_eq!(quality.max_duration_sec, 400.0);
        assert_eq!(quality.std_dev_duration_sec, 0.0);
        assert_eq!(quality.avg_entry_count, 40.0);
    }
}
