//! SEAT Core - Renderer lifecycle, trial sequencing and OSC endpoints
//!
//! This library drives a listening-effort experiment rig: a TASCAR spatial
//! audio renderer, three TASCAR sample players and a Unity video display, all
//! reached over OSC/UDP. It owns the renderer process from start to stop and
//! emits the timed message sequence that presents each trial.

pub mod config;
pub mod error;
pub mod net;
pub mod paths;
pub mod renderer;
pub mod scene;
pub mod session;
pub mod trial;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, BlockConfig, SceneKind};
pub use error::{Result, SeatError};
pub use renderer::lifecycle::{LifecycleEvent, RendererLifecycle, RendererState, SetupOutcome};
pub use scene::Scene;
pub use session::Session;
pub use trial::probe::{GainSetting, ProbeLevelController};
pub use trial::sequencer::{TrialParameters, TrialSequencer};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Date this library was built (set by build.rs)
pub const BUILD_DATE: &str = env!("BUILD_DATE");
