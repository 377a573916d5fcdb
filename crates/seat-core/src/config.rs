//! Application and block configuration
//!
//! Two JSON documents configure a run:
//! - [`AppConfig`]: where the display, renderer and sample players live and
//!   how the renderer is launched. Stable across blocks.
//! - [`BlockConfig`]: which scene to run, where its materials live, trial
//!   timing and the list of trials.
//!
//! Both are plain values passed into constructors; nothing is looked up from
//! ambient process state.

use crate::error::{Result, SeatError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_display_ipaddress() -> String {
    "127.0.0.1".to_string()
}

fn default_display_port() -> u16 {
    7000
}

fn default_renderer_port() -> u16 {
    9877
}

fn default_ip_env_variable() -> Option<String> {
    Some("TASCAR_IP_FILE".to_string())
}

fn default_renderer_command() -> String {
    "/usr/bin/tascar_cli".to_string()
}

fn default_startup_grace_ms() -> u64 {
    300
}

fn default_source_ports() -> [u16; 3] {
    [9001, 9002, 9003]
}

/// How the renderer binary is reached from this machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Through Windows Subsystem for Linux, as root
    #[default]
    Wsl,
    /// Directly on this host
    Native,
}

/// Unity video display endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_ipaddress")]
    pub ipaddress: String,
    #[serde(default = "default_display_port")]
    pub oscport: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            ipaddress: default_display_ipaddress(),
            oscport: default_display_port(),
        }
    }
}

/// TASCAR renderer endpoint and launch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Host address; may be empty and resolved through `ip_env_variable`
    #[serde(default)]
    pub ipaddress: String,
    #[serde(default = "default_renderer_port")]
    pub oscport: u16,
    /// Environment variable naming a file whose first line is the host address
    #[serde(default = "default_ip_env_variable")]
    pub ip_env_variable: Option<String>,
    #[serde(default)]
    pub launch: LaunchMode,
    /// Renderer executable as seen from where it runs
    #[serde(default = "default_renderer_command")]
    pub command: String,
    /// How long to wait after spawning before checking the process is alive
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            ipaddress: String::new(),
            oscport: default_renderer_port(),
            ip_env_variable: default_ip_env_variable(),
            launch: LaunchMode::default(),
            command: default_renderer_command(),
            startup_grace_ms: default_startup_grace_ms(),
        }
    }
}

impl RendererConfig {
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}

/// TASCAR sample players: one host, three source ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default)]
    pub ipaddress: String,
    #[serde(default = "default_ip_env_variable")]
    pub ip_env_variable: Option<String>,
    /// Ports of `source1`, `source2` and `source3`
    #[serde(default = "default_source_ports")]
    pub source_ports: [u16; 3],
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            ipaddress: String::new(),
            ip_env_variable: default_ip_env_variable(),
            source_ports: default_source_ports(),
        }
    }
}

/// Network and renderer configuration for a whole session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
}

impl AppConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SeatError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&contents)?;
        tracing::info!(path = %path.display(), "Loaded app config");
        Ok(config)
    }

    /// Save as pretty JSON, creating parent directories if needed.
    /// `seat check --save-resolved` uses this to persist resolved addresses.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "App config saved to disk");
        Ok(())
    }
}

/// Which experiment variant a block runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Probe-level demo that toggles a tone's mute; no speech material needed
    TargetToneInNoise,
    /// Speech target with two point-source maskers
    TargetSpeechTwoMaskers,
}

/// One trial in a block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub stimulus_id: usize,
    /// SNR of target relative to maskers, in dB
    #[serde(default)]
    pub probe_level_db: f64,
}

/// Everything needed to run one block of trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    pub scene: SceneKind,
    /// Directory holding `tascar_scene.tsc`, `skybox.mp4` and the video list
    pub root_dir: PathBuf,
    /// Seconds between masker onset and target onset
    #[serde(default)]
    pub pre_target_delay: f64,
    #[serde(default)]
    pub present_target_video: bool,
    /// Text file (relative to `root_dir`) listing one video path per stimulus
    #[serde(default)]
    pub target_video_list_file: Option<PathBuf>,
    /// Seconds to wait after each trial
    #[serde(default)]
    pub inter_trial_interval: f64,
    #[serde(default)]
    pub trials: Vec<TrialSpec>,
}

impl BlockConfig {
    /// Load from a JSON file and validate timing values
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SeatError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            scene = ?config.scene,
            trials = config.trials.len(),
            "Loaded block config"
        );
        Ok(config)
    }

    /// Reject negative or non-finite delays, out-of-range stimulus ids and
    /// non-finite probe levels
    pub fn validate(&self) -> Result<()> {
        seconds_to_duration("pre_target_delay", self.pre_target_delay)?;
        seconds_to_duration("inter_trial_interval", self.inter_trial_interval)?;
        if let Some(bad) = self.trials.iter().find(|t| t.stimulus_id == usize::MAX) {
            return Err(SeatError::Configuration(format!(
                "stimulus id {} is out of range",
                bad.stimulus_id
            )));
        }
        if let Some(bad) = self.trials.iter().find(|t| !t.probe_level_db.is_finite()) {
            return Err(SeatError::Configuration(format!(
                "trial {} has non-finite probe level",
                bad.stimulus_id
            )));
        }
        if self.present_target_video && self.target_video_list_file.is_none() {
            return Err(SeatError::Configuration(
                "present_target_video requires target_video_list_file".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pre_target_delay(&self) -> Result<Duration> {
        seconds_to_duration("pre_target_delay", self.pre_target_delay)
    }

    pub fn inter_trial_interval(&self) -> Result<Duration> {
        seconds_to_duration("inter_trial_interval", self.inter_trial_interval)
    }
}

fn seconds_to_duration(name: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        SeatError::Configuration(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, seconds
        ))
    })
}
