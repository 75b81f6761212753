use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info};

use yt_digest_rust::archive::Archive;
use yt_digest_rust::config::Config;
use yt_digest_rust::fetcher::extract_video_id;
use yt_digest_rust::pipeline::{run_loop, Pipeline, PipelineOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("yt-digest")
        .version("0.1.0")
        .author("sunj")
        .about("YouTube channel monitor producing bilingual digest documents")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("video")
                .short('v')
                .long("video")
                .value_name("URL_OR_ID")
                .help("Process a single video and exit, bypassing duration filters"),
        )
        .arg(
            Arg::new("dir")
                .short('d')
                .long("dir")
                .value_name("DIR")
                .help("Process .srt files from a directory (offline mode)"),
        )
        .arg(
            Arg::new("loop")
                .short('l')
                .long("loop")
                .help("Keep monitoring on the configured interval")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("retry-failed")
                .long("retry-failed")
                .help("Re-queue previously failed videos before the run")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logging
    let filter = if matches.get_flag("verbose") {
        "yt_digest=debug,yt_digest_rust=debug"
    } else {
        "yt_digest=info,yt_digest_rust=info,warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    info!("🚀 yt-digest starting...");
    info!("{}", config.summary());

    if matches.get_flag("retry-failed") {
        let mut archive = Archive::load(&config.archive_path()).await;
        let requeued = archive.retry_failed();
        if requeued > 0 {
            archive.save().await?;
        }
        info!("🔄 {} failed videos re-queued", requeued);
    }

    if let Some(video) = matches.get_one::<String>("video") {
        let video_id = extract_video_id(video)
            .ok_or_else(|| anyhow::anyhow!("Unrecognized video URL or id: {}", video))?;

        let pipeline = Pipeline::new(config).await?;
        let mut archive = Archive::load(&pipeline.config().archive_path()).await;
        let options = PipelineOptions { skip_filters: true };
        let result = pipeline.process_video(&mut archive, &video_id, &options).await;

        return match result.output_path {
            Some(path) => {
                info!("🎉 Document written to {}", path.display());
                Ok(())
            }
            None => Err(anyhow::anyhow!(
                "Processing failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            )),
        };
    }

    if let Some(dir) = matches.get_one::<String>("dir") {
        let dir = PathBuf::from(dir);
        if !dir.exists() {
            error!("Input directory does not exist: {}", dir.display());
            return Err(anyhow::anyhow!("Input directory not found"));
        }
        let pipeline = Pipeline::new(config).await?;
        pipeline.process_directory(&dir).await?;
        return Ok(());
    }

    if matches.get_flag("loop") {
        return run_loop(config_path.as_deref()).await;
    }

    let pipeline = Pipeline::new(config).await?;
    pipeline.run_batch().await?;
    info!("🎉 Run complete");
    Ok(())
}
