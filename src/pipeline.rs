use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use crate::analysis;
use crate::archive::Archive;
use crate::chapters::{extract_segments, resolve_chapters, ChapterProposal};
use crate::config::{load_channels, Config};
use crate::fetcher::{self, VideoInfo};
use crate::llm::{create_completion, Completion};
use crate::output;
use crate::review;
use crate::subtitles::SubtitleTrack;
use crate::timecode::format_timestamp;
use crate::translate::{self, TranslateOptions};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Metadata,
    Subtitles,
    Transcript,
    Analysis,
    Chapters,
    Translation,
    Document,
    Save,
}

/// Outcome for a single video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub video: VideoInfo,
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub failed_stage: Option<PipelineStage>,
    pub error: Option<String>,
    pub failed_chapters: usize,
    pub processing_time: Duration,
}

impl PipelineResult {
    fn completed(
        video: VideoInfo,
        output_path: PathBuf,
        failed_chapters: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            video,
            success: true,
            output_path: Some(output_path),
            failed_stage: None,
            error: None,
            failed_chapters,
            processing_time: elapsed,
        }
    }

    /// A skip is a successful outcome without a document.
    fn skipped(video: VideoInfo, reason: String, elapsed: Duration) -> Self {
        Self {
            video,
            success: true,
            output_path: None,
            failed_stage: None,
            error: Some(reason),
            failed_chapters: 0,
            processing_time: elapsed,
        }
    }

    fn failed(video: VideoInfo, stage: PipelineStage, error: String, elapsed: Duration) -> Self {
        error!("[{}] Failed at {:?}: {}", video.video_id, stage, error);
        Self {
            video,
            success: false,
            output_path: None,
            failed_stage: Some(stage),
            error: Some(error),
            failed_chapters: 0,
            processing_time: elapsed,
        }
    }

    fn is_skip(&self) -> bool {
        self.success && self.output_path.is_none()
    }
}

/// Overall batch outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub results: Vec<PipelineResult>,
}

impl BatchSummary {
    fn from_results(results: Vec<PipelineResult>, total_time: Duration) -> Self {
        let successful = results
            .iter()
            .filter(|r| r.success && r.output_path.is_some())
            .count();
        let skipped = results.iter().filter(|r| r.is_skip()).count();
        let failed = results.iter().filter(|r| !r.success).count();
        Self {
            total: results.len(),
            successful,
            skipped,
            failed,
            total_time,
            results,
        }
    }
}

/// Per-run behavior switches
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Process the video even when the duration filter would skip it
    pub skip_filters: bool,
}

/// End-to-end digest pipeline, shared across videos.
///
/// Holds the loaded configuration, the completion provider and the resolved
/// prompt templates. Cloning is cheap, so directory mode hands each worker
/// its own copy.
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    completion: Arc<dyn Completion>,
    summary_prompt: String,
    translate_prompt: String,
}

impl Pipeline {
    pub async fn new(config: Config) -> Result<Self> {
        let completion: Arc<dyn Completion> = create_completion(&config.completion)?.into();
        if !completion.is_available().await {
            warn!(
                "Completion command '{}' did not answer the availability probe",
                config.completion.command
            );
        }

        let summary_prompt = config
            .prompts
            .load_or(&config.prompts.summary_file, analysis::DEFAULT_SUMMARY_PROMPT)
            .await;
        let translate_prompt = config
            .prompts
            .load_or(&config.prompts.translate_file, translate::DEFAULT_TRANSLATE_PROMPT)
            .await;

        info!("🔧 Pipeline initialized");
        debug!("{}", config.summary());

        Ok(Self {
            config,
            completion,
            summary_prompt,
            translate_prompt,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check every configured channel once and process new uploads.
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let mut archive = Archive::load(&self.config.archive_path()).await;

        let mut channels = self.config.channels.clone();
        if channels.is_empty() {
            channels = load_channels(&self.config.monitor.channels_file);
        }
        if channels.is_empty() {
            warn!("No channels configured, nothing to do");
            return Ok(BatchSummary::from_results(Vec::new(), start_time.elapsed()));
        }

        info!(
            "🚀 Checking {} channels (last {}h)",
            channels.len(),
            self.config.monitor.lookback_hours
        );

        let options = PipelineOptions::default();
        let mut results = Vec::new();
        for channel in &channels {
            info!("📡 Channel: {}", channel.name);
            let videos = match fetcher::list_recent_videos(
                &channel.url,
                self.config.monitor.lookback_hours,
            )
            .await
            {
                Ok(videos) => videos,
                Err(fetch_error) => {
                    error!("Failed to list videos for {}: {}", channel.name, fetch_error);
                    continue;
                }
            };
            debug!("{} recent videos on {}", videos.len(), channel.name);

            for video in videos {
                if archive.is_processed(&video.video_id) {
                    debug!("Already handled: {}", video.video_id);
                    continue;
                }
                results.push(
                    self.process_video(&mut archive, &video.video_id, &options)
                        .await,
                );
            }
        }

        let summary = BatchSummary::from_results(results, start_time.elapsed());
        print_summary(&summary);
        Ok(summary)
    }

    /// Process one video end to end, recording the outcome in the archive.
    pub async fn process_video(
        &self,
        archive: &mut Archive,
        video_id: &str,
        options: &PipelineOptions,
    ) -> PipelineResult {
        let result = self.run_video(video_id, options).await;
        self.record(archive, &result).await;
        result
    }

    /// Offline mode: digest every `.srt` file under a directory.
    pub async fn process_directory(&self, input_dir: &Path) -> Result<BatchSummary> {
        let start_time = Instant::now();

        let files = fetcher::discover_srt_files(input_dir);
        if files.is_empty() {
            warn!("No .srt files under {}", input_dir.display());
            return Ok(BatchSummary::from_results(Vec::new(), start_time.elapsed()));
        }

        tokio::fs::create_dir_all(&self.config.output.dir).await?;
        info!(
            "🚀 Processing {} subtitle files from {}",
            files.len(),
            input_dir.display()
        );

        let archive = Arc::new(Mutex::new(
            Archive::load(&self.config.archive_path()).await,
        ));
        let semaphore = Arc::new(Semaphore::new(self.config.performance.max_concurrent));
        let total = files.len();

        let mut handles = Vec::with_capacity(total);
        for (index, path) in files.into_iter().enumerate() {
            let pipeline = self.clone();
            let archive = Arc::clone(&archive);
            let semaphore = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                debug!("📄 File {}/{}: {}", index + 1, total, path.display());
                pipeline.process_local_file(&archive, &path).await
            }));
        }

        let mut results = Vec::with_capacity(total);
        for outcome in join_all(handles).await {
            match outcome {
                Ok(result) => results.push(result),
                Err(join_error) => error!("Worker panicked: {}", join_error),
            }
        }

        let summary = BatchSummary::from_results(results, start_time.elapsed());

        let report_path = self.config.output.dir.join("processing_results.json");
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                if let Err(write_error) = tokio::fs::write(&report_path, json).await {
                    warn!("Failed to write {}: {}", report_path.display(), write_error);
                } else {
                    info!("💾 Results saved to: {}", report_path.display());
                }
            }
            Err(serialize_error) => warn!("Failed to serialize results: {}", serialize_error),
        }

        print_summary(&summary);
        Ok(summary)
    }

    async fn run_video(&self, video_id: &str, options: &PipelineOptions) -> PipelineResult {
        let started = Instant::now();

        let video = match fetcher::fetch_video_info(video_id).await {
            Ok(video) => video,
            Err(fetch_error) => {
                return PipelineResult::failed(
                    stub_info(video_id),
                    PipelineStage::Metadata,
                    fetch_error.to_string(),
                    started.elapsed(),
                )
            }
        };
        info!("▶️ Processing: {} ({})", video.title, video.video_id);

        if !options.skip_filters {
            let min_sec = (self.config.monitor.min_duration_minutes * 60) as f64;
            if let Some(duration) = video.duration_sec {
                if duration < min_sec {
                    let reason =
                        format!("Skipped: duration too short ({})", format_timestamp(duration));
                    info!("⏭️ {} - {}", video.title, reason);
                    return PipelineResult::skipped(video, reason, started.elapsed());
                }
            }
        }

        let subtitle_dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(io_error) => {
                return PipelineResult::failed(
                    video,
                    PipelineStage::Subtitles,
                    io_error.to_string(),
                    started.elapsed(),
                )
            }
        };
        let raw_srt = match fetcher::download_subtitles(
            &video.video_id,
            &self.config.monitor.subtitle_language,
            subtitle_dir.path(),
        )
        .await
        {
            Ok(content) => content,
            Err(download_error) => {
                return PipelineResult::failed(
                    video,
                    PipelineStage::Subtitles,
                    download_error.to_string(),
                    started.elapsed(),
                )
            }
        };

        self.run_stages(video, &raw_srt, started).await
    }

    async fn process_local_file(&self, archive: &Mutex<Archive>, path: &Path) -> PipelineResult {
        let started = Instant::now();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "subtitle".to_string());
        let video = VideoInfo {
            video_id: format!("local:{}", stem),
            title: stem,
            channel: "local".to_string(),
            upload_date: String::new(),
            url: path.display().to_string(),
            duration_sec: None,
        };

        if archive.lock().await.is_processed(&video.video_id) {
            debug!("Already handled: {}", video.video_id);
            return PipelineResult::skipped(
                video,
                "Skipped: already processed".to_string(),
                started.elapsed(),
            );
        }

        let result = match tokio::fs::read_to_string(path).await {
            Ok(raw_srt) => self.run_stages(video, &raw_srt, started).await,
            Err(read_error) => PipelineResult::failed(
                video,
                PipelineStage::Subtitles,
                format!("Failed to read {}: {}", path.display(), read_error),
                started.elapsed(),
            ),
        };

        let mut archive = archive.lock().await;
        self.record(&mut archive, &result).await;
        result
    }

    /// The content pipeline shared by online and offline modes.
    async fn run_stages(&self, video: VideoInfo, raw_srt: &str, started: Instant) -> PipelineResult {
        let track = SubtitleTrack::from_srt(raw_srt);
        if track.is_empty() {
            return PipelineResult::failed(
                video,
                PipelineStage::Transcript,
                "No usable subtitle entries".to_string(),
                started.elapsed(),
            );
        }
        for issue in track.validate() {
            warn!("[{}] Subtitle issue: {}", video.video_id, issue);
        }

        let transcript = track.clean_transcript(self.config.subtitles.merge_interval_sec as f64);
        let headered = track.with_header(&transcript, &video.title, &video.channel, &video.url);
        let total_duration_sec = match video.duration_sec {
            Some(duration) => duration,
            None => track.time_span().map(|(_, end)| end).unwrap_or(0.0),
        };

        let analysis_result = match analysis::analyze(
            self.completion.as_ref(),
            &self.summary_prompt,
            &headered,
            total_duration_sec,
            self.config.chapters.fallback_interval_sec,
        )
        .await
        {
            Ok(result) => result,
            Err(analysis_error) => {
                return PipelineResult::failed(
                    video,
                    PipelineStage::Analysis,
                    analysis_error.to_string(),
                    started.elapsed(),
                )
            }
        };

        let optimized = match resolve_chapters(
            &analysis_result.chapters,
            track.entries(),
            total_duration_sec,
            self.config.chapters.min_duration_sec as f64,
            self.config.chapters.max_duration_sec as f64,
        ) {
            Ok(chapters) => chapters,
            Err(resolve_error) => {
                return PipelineResult::failed(
                    video,
                    PipelineStage::Chapters,
                    resolve_error.to_string(),
                    started.elapsed(),
                )
            }
        };
        let proposals: Vec<ChapterProposal> = optimized
            .iter()
            .map(|chapter| ChapterProposal::new(chapter.start_sec, chapter.title.clone()))
            .collect();
        let segments = extract_segments(&proposals, track.entries());
        info!("📑 {} chapters resolved", segments.len());

        let translate_options = TranslateOptions {
            context_lines: self.config.translation.context_lines,
            max_retries: self.config.translation.max_retries,
            retry_delay_sec: self.config.translation.retry_delay_sec,
        };
        let outcome = translate::translate_chapters(
            self.completion.as_ref(),
            &self.translate_prompt,
            &segments,
            &analysis_result.video_type,
            &analysis_result.speakers,
            &translate_options,
        )
        .await;
        if outcome.translated.is_empty() && !segments.is_empty() {
            warn!("[{}] No chapters translated successfully", video.video_id);
        }

        let mut doc = output::generate_markdown(
            &video,
            &analysis_result.summary_markdown,
            &outcome.translated,
            &outcome.failed,
        );
        if self.config.review.enabled {
            doc = review::review_content(&doc, self.config.review.strip_fine_timestamps);
        }
        for issue in output::validate_document(&doc) {
            warn!("[{}] Document issue: {}", video.video_id, issue);
        }

        let path = match output::save_document(
            &doc,
            &video.title,
            &video.channel,
            &self.config.output.dir,
            self.config.output.filename_max_length,
        )
        .await
        {
            Ok(path) => path,
            Err(save_error) => {
                return PipelineResult::failed(
                    video,
                    PipelineStage::Save,
                    save_error.to_string(),
                    started.elapsed(),
                )
            }
        };
        if let Err(transcript_error) = output::save_clean_transcript(
            &headered,
            &video.title,
            &video.channel,
            &self.config.output.dir,
            self.config.output.filename_max_length,
        )
        .await
        {
            warn!(
                "[{}] Failed to save clean transcript: {}",
                video.video_id, transcript_error
            );
        }

        let elapsed = started.elapsed();
        info!("✅ COMPLETE - {} ({:.1}s)", video.title, elapsed.as_secs_f64());
        PipelineResult::completed(video, path, outcome.failed.len(), elapsed)
    }

    /// Record an outcome in the archive and persist it.
    async fn record(&self, archive: &mut Archive, result: &PipelineResult) {
        let video = &result.video;
        if result.success {
            match (&result.output_path, &result.error) {
                (Some(path), _) => archive.mark_processed(
                    &video.video_id,
                    &video.title,
                    path,
                    result.failed_chapters,
                ),
                (None, Some(reason)) => archive.mark_skipped(&video.video_id, &video.title, reason),
                (None, None) => {}
            }
        } else if let Some(stage_error) = &result.error {
            archive.mark_failed(&video.video_id, &video.title, stage_error);
        }
        if let Err(save_error) = archive.save().await {
            warn!("Failed to save archive: {}", save_error);
        }
    }
}

fn stub_info(video_id: &str) -> VideoInfo {
    VideoInfo {
        video_id: video_id.to_string(),
        title: video_id.to_string(),
        channel: "Unknown Channel".to_string(),
        upload_date: String::new(),
        url: fetcher::video_url(video_id),
        duration_sec: None,
    }
}

/// Monitor loop: run a batch, sleep, reload configuration, repeat.
pub async fn run_loop(config_path: Option<&Path>) -> Result<()> {
    loop {
        let config = Config::load(config_path)?;
        config.validate()?;
        let interval_hours = config.monitor.check_interval_hours;

        let pipeline = Pipeline::new(config).await?;
        if let Err(batch_error) = pipeline.run_batch().await {
            error!("Batch run failed: {}", batch_error);
        }

        if interval_hours == 0 {
            info!("Check interval is 0, stopping after one pass");
            return Ok(());
        }
        info!("😴 Next check in {}h", interval_hours);
        tokio::time::sleep(Duration::from_secs(interval_hours * 3600)).await;
    }
}

/// Log the end-of-run report.
pub fn print_summary(summary: &BatchSummary) {
    info!("{}", "=".repeat(60));
    info!("PROCESSING SUMMARY");
    info!("{}", "=".repeat(60));
    info!(
        "Total: {} | Successful: {} | Skipped: {} | Failed: {}",
        summary.total, summary.successful, summary.skipped, summary.failed
    );

    let successful: Vec<_> = summary
        .results
        .iter()
        .filter(|r| r.success && r.output_path.is_some())
        .collect();
    if !successful.is_empty() {
        info!("✅ SUCCESSFUL:");
        for result in successful {
            info!(
                "  • {} - {:.1}s",
                result.video.title,
                result.processing_time.as_secs_f64()
            );
        }
    }

    let failed: Vec<_> = summary.results.iter().filter(|r| !r.success).collect();
    if !failed.is_empty() {
        info!("❌ FAILED:");
        for result in failed {
            info!(
                "  • {} - {:?}: {}",
                result.video.title,
                result.failed_stage.unwrap_or(PipelineStage::Metadata),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
