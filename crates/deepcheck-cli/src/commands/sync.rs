use std::path::Path;

use deepcheck_storage::{ModelManifest, ModelSync, SyncAction, SyncOptions};

/// Download checkpoints listed in `manifest` into `models_dir`.
pub async fn run_sync_models(
    manifest: &Path,
    models_dir: &Path,
    force: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let manifest = ModelManifest::load(manifest).await?;
    if manifest.models.is_empty() {
        println!("No entries found in manifest; nothing to download.");
        return Ok(());
    }

    let sync = ModelSync::new(models_dir)?;
    let outcomes = sync.sync(&manifest, &SyncOptions { force, dry_run }).await?;

    for outcome in &outcomes {
        let dest = outcome.destination.display();
        match outcome.action {
            SyncAction::WouldDownload => println!("[DRY-RUN] would download {} -> {}", outcome.filename, dest),
            SyncAction::WouldSkip => println!("[DRY-RUN] skip {} -> {}", outcome.filename, dest),
            SyncAction::Skipped => println!("Skipping {}: already present and matches expected hash.", outcome.filename),
            SyncAction::Downloaded { verified: true } => println!("Downloaded and verified {}", outcome.filename),
            SyncAction::Downloaded { verified: false } => println!("Downloaded {}", outcome.filename),
        }
    }
    if !dry_run {
        println!("Model sync complete.");
    }
    Ok(())
}
