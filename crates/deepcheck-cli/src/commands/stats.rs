use std::path::Path;

use deepcheck_storage::AuditLog;

pub async fn run_stats(log: &Path) -> anyhow::Result<()> {
    let stats = AuditLog::new(log).stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
