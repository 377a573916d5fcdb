//! Command line arguments for the `seat` binary

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct SeatArgs {
    #[command(subcommand)]
    pub command: SeatCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum SeatCommand {
    /// Run every trial of a block against the renderer and display
    Run(RunCommand),

    /// Validate the config files and resolve addresses without running anything
    Check(CheckCommand),
}

#[derive(Debug, Args, Clone)]
pub struct ConfigFiles {
    /// Application config (endpoints, renderer launch)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Block config (scene, root directory, trials)
    #[arg(short = 'b', long = "block")]
    pub block: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub files: ConfigFiles,

    /// Parent of the per-run output directory (default: the block file's directory)
    #[arg(short = 'l', long = "log-dir")]
    pub log_dir: Option<PathBuf>,
}

impl RunCommand {
    /// Where this run's timestamped output directory is created
    pub fn log_base(&self) -> PathBuf {
        match (&self.log_dir, self.files.block.parent()) {
            (Some(dir), _) => dir.clone(),
            (None, Some(parent)) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            (None, _) => PathBuf::from("."),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct CheckCommand {
    #[command(flatten)]
    pub files: ConfigFiles,

    /// Write addresses resolved from the environment back to the app config
    #[arg(long = "save-resolved")]
    pub save_resolved: bool,
}
