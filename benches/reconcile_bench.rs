use criterion::{black_box, criterion_group, criterion_main, Criterion};
use yt_digest_rust::chapters::{resolve_chapters, ChapterProposal};
use yt_digest_rust::review::{reconcile_document, strip_fine_timestamps};
use yt_digest_rust::subtitles::parse_srt_content;
use yt_digest_rust::timecode::format_timestamp;
use yt_digest_rust::SubtitleEntry;

/// A generated document with a drifted translation body: every block starts
/// 30 seconds into its chapter, so reconciliation has real work to do.
fn sample_document(chapters: usize) -> String {
    let mut lines = vec!["# Bench Video".to_string(), String::new()];

    lines.push("| Time | Chapter | Summary |".to_string());
    lines.push("|------|---------|---------|".to_string());
    for i in 0..chapters {
        let start = (i * 300) as f64;
        let end = ((i + 1) * 300) as f64;
        lines.push(format!(
            "| {} - {} | Chapter {} | summary {} |",
            format_timestamp(start),
            format_timestamp(end),
            i + 1,
            i + 1
        ));
    }

    lines.push(String::new());
    lines.push("## 📝 Full Translation".to_string());
    lines.push(String::new());
    for i in 0..chapters {
        let start = (i * 300 + 30) as f64;
        let end = (i * 300 + 200) as f64;
        lines.push(format!(
            "**({} - {})**",
            format_timestamp(start),
            format_timestamp(end)
        ));
        lines.push(String::new());
        lines.push(format!(
            "Translated paragraph {} with enough text to resemble a real chapter body. \
             It runs for a couple of sentences and mentions timestamps in passing.",
            i + 1
        ));
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push("*Generated by yt-digest - bench*".to_string());
    lines.join("\n")
}

fn srt_time(total_ms: u64) -> String {
    let ms = total_ms % 1000;
    let secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        ms
    )
}

fn sample_srt(cues: usize) -> String {
    let mut blocks = Vec::with_capacity(cues);
    for i in 0..cues {
        let start_ms = (i as u64) * 5000;
        blocks.push(format!(
            "{}\n{} --> {}\nBench cue number {} with a short sentence.\n",
            i + 1,
            srt_time(start_ms),
            srt_time(start_ms + 4500),
            i + 1
        ));
    }
    blocks.join("\n")
}

fn bench_reconcile(c: &mut Criterion) {
    let doc = sample_document(20);
    c.bench_function("reconcile_20_chapters", |b| {
        b.iter(|| black_box(reconcile_document(black_box(&doc))))
    });

    let reconciled = reconcile_document(&doc);
    c.bench_function("strip_fine_timestamps", |b| {
        b.iter(|| black_box(strip_fine_timestamps(black_box(&reconciled))))
    });
}

fn bench_srt_parsing(c: &mut Criterion) {
    let raw = sample_srt(2000);
    c.bench_function("parse_srt_2000_cues", |b| {
        b.iter(|| black_box(parse_srt_content(black_box(&raw))))
    });
}

fn bench_chapter_resolution(c: &mut Criterion) {
    let proposals: Vec<ChapterProposal> = (0..30)
        .map(|i| ChapterProposal::new((i * 240) as f64, format!("Chapter {}", i + 1)))
        .collect();
    let entries: Vec<SubtitleEntry> = (0..1440)
        .map(|i| {
            SubtitleEntry::new(
                i as u32 + 1,
                (i * 5) as f64,
                (i * 5 + 4) as f64,
                format!("Entry {}.", i + 1),
            )
        })
        .collect();

    c.bench_function("resolve_30_chapters", |b| {
        b.iter(|| {
            black_box(resolve_chapters(
                black_box(&proposals),
                black_box(&entries),
                7200.0,
                180.0,
                900.0,
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_reconcile,
    bench_srt_parsing,
    bench_chapter_resolution
);
criterion_main!(benches);
