//! Block runner
//!
//! Runs every trial of a block through a [`Session`] and writes one JSON
//! line per presented trial to `trials.jsonl` in a fresh, timestamped run
//! directory. An interrupt flag is checked between trials; a trial in
//! progress always completes.

use chrono::{DateTime, Local, Utc};
use seat_core::net::address::{resolve_endpoints_with, EndpointAddresses};
use seat_core::paths::check_path_is_file;
use seat_core::renderer::lifecycle::{SCENE_FILE_NAME, SKYBOX_FILE_NAME};
use seat_core::{
    AppConfig, BlockConfig, RendererState, Scene, SceneKind, SeatError, Session, SetupOutcome,
};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// File name of the trial log inside the run directory
pub const TRIAL_LOG_FILE_NAME: &str = "trials.jsonl";

/// Run directories are named after the time the run started
pub const RUN_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Granularity of the interruptible inter-trial wait
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Seat(#[from] SeatError),

    /// Setup failed in a way the operator can fix by editing the config
    #[error("Setup failed: {0}")]
    SetupFailed(SeatError),

    #[error("Cannot write trial log {path}: {source}")]
    TrialLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Each run gets its own directory; an existing one is never reused
    #[error("Cannot create run directory {path}: {source}")]
    RunDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Create `<base>/<started as RUN_DIR_FORMAT>`, failing if it already exists
pub fn create_run_dir(base: &Path, started: DateTime<Local>) -> Result<PathBuf, RunError> {
    let path = base.join(started.format(RUN_DIR_FORMAT).to_string());
    let dir_error = |source| RunError::RunDirectory {
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(base).map_err(dir_error)?;
    std::fs::create_dir(&path).map_err(dir_error)?;
    tracing::info!(path = %path.display(), "Run directory created");
    Ok(path)
}

/// One line of the trial log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub timestamp: DateTime<Utc>,
    pub stimulus_id: usize,
    pub probe_level_db: f64,
    pub target_gain: f64,
}

/// Append-only JSON-lines log of presented trials
pub struct TrialLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TrialLog {
    /// Create `<dir>/trials.jsonl`. An existing log is never appended to.
    pub fn create(dir: &Path) -> Result<Self, RunError> {
        let path = dir.join(TRIAL_LOG_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| RunError::TrialLog {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), "Trial log created");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Create a run directory under `base` and the log inside it
    pub fn for_run(base: &Path, started: DateTime<Local>) -> Result<Self, RunError> {
        Self::create(&create_run_dir(base, started)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record and flush it to disk
    pub fn append(&mut self, record: &TrialRecord) -> Result<(), RunError> {
        let line = serde_json::to_string(record).map_err(SeatError::from)?;
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|source| RunError::TrialLog {
                path: self.path.clone(),
                source,
            })
    }
}

/// How a block run ended
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub presented: usize,
    pub total: usize,
    pub interrupted: bool,
    pub final_state: RendererState,
}

/// Configure, set up and start `session`, present every trial of `block`,
/// then close the session. The session is closed on every exit path.
pub fn run_block(
    mut session: Session,
    block: &BlockConfig,
    log: &mut TrialLog,
    running: &AtomicBool,
) -> Result<RunSummary, RunError> {
    let inter_trial_interval = block.inter_trial_interval()?;

    session.configure(block)?;
    if let SetupOutcome::Recoverable(e) = session.setup()? {
        return Err(RunError::SetupFailed(e));
    }
    session.start()?;

    let total = block.trials.len();
    let mut presented = 0;
    let mut interrupted = false;

    for (index, trial) in block.trials.iter().enumerate() {
        if !running.load(Ordering::SeqCst) {
            interrupted = true;
            break;
        }

        let gain = session.set_probe_level(trial.probe_level_db)?;
        tracing::info!(
            trial = index + 1,
            total,
            stimulus_id = trial.stimulus_id,
            probe_level_db = trial.probe_level_db,
            "Presenting trial"
        );
        session.present_trial(trial.stimulus_id)?;
        presented += 1;

        log.append(&TrialRecord {
            timestamp: Utc::now(),
            stimulus_id: trial.stimulus_id,
            probe_level_db: trial.probe_level_db,
            target_gain: gain.linear(),
        })?;

        if index + 1 < total {
            wait_unless_interrupted(inter_trial_interval, running);
        }
    }

    if interrupted {
        tracing::warn!(presented, total, "Block interrupted");
    }

    let final_state = session.close();
    Ok(RunSummary {
        presented,
        total,
        interrupted,
        final_state,
    })
}

/// What `seat check` found
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub scene: SceneKind,
    pub trials: usize,
    pub addresses: EndpointAddresses,
}

/// Validate both config files and resolve every address without touching
/// the network or the renderer. With `save_resolved`, addresses resolved
/// through the environment are written back to `config_path`.
pub fn check_files<F>(
    config_path: &Path,
    block_path: &Path,
    save_resolved: bool,
    lookup: F,
) -> Result<CheckReport, RunError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AppConfig::load(config_path)?;
    let block = BlockConfig::load(block_path)?;

    check_path_is_file(&block.root_dir.join(SCENE_FILE_NAME))?;
    check_path_is_file(&block.root_dir.join(SKYBOX_FILE_NAME))?;
    let scene = Scene::from_block(&block)?;
    let addresses = resolve_endpoints_with(&mut config, lookup)?;

    if save_resolved {
        config.save(config_path)?;
    }

    Ok(CheckReport {
        scene: scene.kind(),
        trials: block.trials.len(),
        addresses,
    })
}

/// Sleep for `duration`, returning early once `running` is cleared
fn wait_unless_interrupted(duration: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + duration;
    loop {
        let now = Instant::now();
        if now >= deadline || !running.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(INTERRUPT_POLL.min(deadline - now));
    }
}
