use anyhow::Context;
use deepcheck_media::{ml_unavailable_reason, CheckpointSelector, EngineConfig, ModePreference};

/// Print the analysis path this configuration selects and why.
pub async fn run_selfcheck() -> anyhow::Result<()> {
    let engine = EngineConfig::from_env().context("Invalid engine configuration")?;

    println!("selfcheck: models_dir={}", engine.models_dir.display());
    println!("selfcheck: backbone={}", engine.backbone_model_path.display());

    let checkpoints = CheckpointSelector::new(&engine.models_dir, &engine.checkpoint_extension)
        .scan()
        .map(|found| found.len())
        .unwrap_or(0);
    println!("selfcheck: checkpoints found={checkpoints}");

    match (engine.mode, ml_unavailable_reason(&engine)) {
        (ModePreference::Demo, _) => println!("selfcheck: mode=demo (forced)"),
        (_, None) => println!("selfcheck: mode=ml"),
        (ModePreference::Ml, Some(reason)) => {
            anyhow::bail!("ml mode requested but {}", reason);
        }
        (ModePreference::Auto, Some(reason)) => println!("selfcheck: mode=demo ({reason})"),
    }

    println!("selfcheck: ok");
    Ok(())
}
