//! Experiment scenes
//!
//! A scene decides what a trial sounds and looks like. Both scenes share the
//! renderer lifecycle; they differ in configuration needs and in the message
//! sequence of a trial.

use crate::config::{BlockConfig, SceneKind};
use crate::error::Result;
use crate::net::endpoints::NetworkEndpoints;
use crate::net::osc::OscType;
use crate::trial::probe::{GainSetting, ProbeLevelController};
use crate::trial::sequencer::{TrialParameters, TrialSequencer};
use std::thread;
use std::time::Duration;

/// How long the tone is unmuted in the tone-in-noise demo
pub const TONE_ON_DURATION: Duration = Duration::from_millis(500);

/// A configured experiment scene
#[derive(Debug, Clone)]
pub enum Scene {
    /// Demo of probe-level control without speech material: each trial
    /// unmutes the renderer's target tone briefly
    TargetToneInNoise,
    /// Speech target with two point-source maskers on the sample players
    TargetSpeechTwoMaskers {
        sequencer: TrialSequencer,
        probe: ProbeLevelController,
    },
}

impl Scene {
    /// Validate the scene-specific parts of a block
    pub fn from_block(block: &BlockConfig) -> Result<Self> {
        match block.scene {
            SceneKind::TargetToneInNoise => Ok(Scene::TargetToneInNoise),
            SceneKind::TargetSpeechTwoMaskers => Ok(Scene::TargetSpeechTwoMaskers {
                sequencer: TrialSequencer::new(TrialParameters::from_block(block)?),
                probe: ProbeLevelController::new(),
            }),
        }
    }

    pub fn kind(&self) -> SceneKind {
        match self {
            Scene::TargetToneInNoise => SceneKind::TargetToneInNoise,
            Scene::TargetSpeechTwoMaskers { .. } => SceneKind::TargetSpeechTwoMaskers,
        }
    }

    /// Set the SNR for subsequent trials. The tone demo ignores it.
    pub fn set_probe_level(&mut self, snr_db: f64) -> GainSetting {
        match self {
            Scene::TargetToneInNoise => GainSetting::UNITY,
            Scene::TargetSpeechTwoMaskers { probe, .. } => probe.set_probe_level(snr_db),
        }
    }

    pub fn target_gain(&self) -> GainSetting {
        match self {
            Scene::TargetToneInNoise => GainSetting::UNITY,
            Scene::TargetSpeechTwoMaskers { probe, .. } => probe.gain(),
        }
    }

    pub fn present_trial(&self, endpoints: &NetworkEndpoints, stimulus_id: usize) -> Result<()> {
        match self {
            Scene::TargetToneInNoise => {
                endpoints
                    .renderer
                    .send("/main/target/mute", vec![OscType::Int(0)])?;
                thread::sleep(TONE_ON_DURATION);
                endpoints
                    .renderer
                    .send("/main/target/mute", vec![OscType::Int(1)])
            }
            Scene::TargetSpeechTwoMaskers { sequencer, probe } => {
                sequencer.present_trial(endpoints, probe.gain(), stimulus_id)
            }
        }
    }
}
