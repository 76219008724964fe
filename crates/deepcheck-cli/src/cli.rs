//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default verdict log, shared with the API server.
pub const DEFAULT_LOG: &str = "logs/detections.jsonl";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Deepcheck: video authenticity analysis",
    long_about = "Classifies videos as authentic or manipulated using trained checkpoints, \
                  with a frame-statistics fallback when no model can run."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a video and append the verdict to the log
    Analyze {
        /// Video file to analyze
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        /// Number of frames the checkpoint was trained on
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
        sequence_length: u32,

        /// Verdict log to append to
        #[arg(long, value_name = "PATH", default_value = DEFAULT_LOG)]
        log: PathBuf,
    },

    /// Print statistics over the verdict log
    Stats {
        #[arg(long, value_name = "PATH", default_value = DEFAULT_LOG)]
        log: PathBuf,
    },

    /// Print the report for the latest verdict on a video
    Report {
        /// Video file name as recorded in the log
        #[arg(value_name = "VIDEO")]
        video: String,

        #[arg(long, value_name = "PATH", default_value = DEFAULT_LOG)]
        log: PathBuf,
    },

    /// Download checkpoints listed in a manifest
    #[command(name = "sync-models")]
    SyncModels {
        /// Path to the manifest JSON file
        #[arg(long, value_name = "PATH", default_value = "model_manifest.json")]
        manifest: PathBuf,

        /// Directory where checkpoints will be stored
        #[arg(long, value_name = "DIR", default_value = "models")]
        models_dir: PathBuf,

        /// Re-download files even if they already exist
        #[arg(long)]
        force: bool,

        /// Print the actions without downloading
        #[arg(long)]
        dry_run: bool,
    },

    /// Report which analysis path this machine would use
    Selfcheck,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from(["deepcheck", "analyze", "clip.mp4", "--sequence-length", "40"])
            .unwrap();
        match cli.command {
            Commands::Analyze {
                video,
                sequence_length,
                log,
            } => {
                assert_eq!(video, PathBuf::from("clip.mp4"));
                assert_eq!(sequence_length, 40);
                assert_eq!(log, PathBuf::from(DEFAULT_LOG));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_zero_sequence_length_rejected() {
        assert!(Cli::try_parse_from(["deepcheck", "analyze", "clip.mp4", "-n", "0"]).is_err());
    }

    #[test]
    fn test_parse_sync_models_flags() {
        let cli = Cli::try_parse_from(["deepcheck", "sync-models", "--dry-run", "--models-dir", "/tmp/m"])
            .unwrap();
        match cli.command {
            Commands::SyncModels {
                manifest,
                models_dir,
                force,
                dry_run,
            } => {
                assert_eq!(manifest, PathBuf::from("model_manifest.json"));
                assert_eq!(models_dir, PathBuf::from("/tmp/m"));
                assert!(!force);
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
