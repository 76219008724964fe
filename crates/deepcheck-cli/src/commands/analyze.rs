use std::path::Path;

use anyhow::Context;
use deepcheck_media::{select_analyzer, EngineConfig};
use deepcheck_storage::AuditLog;
use tracing::info;

/// Analyze one video, append the verdict and print it as JSON.
pub async fn run_analyze(video: &Path, sequence_length: u32, log: &Path) -> anyhow::Result<()> {
    let engine = EngineConfig::from_env().context("Invalid engine configuration")?;
    let analyzer = select_analyzer(&engine).context("Failed to select analyzer")?;
    info!("Analysis mode: {}", analyzer.mode());

    let video_path = video.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&video_path, sequence_length))
        .await
        .context("Analysis task panicked")?
        .with_context(|| format!("Failed to analyze {}", video.display()))?;

    AuditLog::new(log).append(&outcome.record).await?;

    print!("{}", outcome.record.to_json_line()?);
    for (frame, face) in outcome.side_images.frames.iter().zip(&outcome.side_images.faces) {
        info!("Side images: {} {}", frame, face);
    }
    Ok(())
}
