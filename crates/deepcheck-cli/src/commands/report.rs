use std::path::Path;

use anyhow::anyhow;
use chrono::Utc;
use deepcheck_models::render_report;
use deepcheck_storage::AuditLog;

/// Print the text report for the newest verdict on `video`.
pub async fn run_report(video: &str, log: &Path) -> anyhow::Result<()> {
    let record = AuditLog::new(log)
        .latest_for(video)
        .await?
        .ok_or_else(|| anyhow!("No analysis recorded for {} in {}", video, log.display()))?;
    print!("{}", render_report(&record, Utc::now()));
    Ok(())
}
