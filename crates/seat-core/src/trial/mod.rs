//! Trial module
//!
//! - SNR to linear gain conversion ([`probe`])
//! - Timed message sequence that presents one trial ([`sequencer`])

pub mod probe;
pub mod sequencer;

pub use probe::{GainSetting, ProbeLevelController};
pub use sequencer::{TrialParameters, TrialSequencer, LIP_SYNC_DELAY};
