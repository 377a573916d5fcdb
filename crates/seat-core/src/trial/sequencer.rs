//! Trial presentation sequence
//!
//! One trial is a short, fixed, blocking sequence:
//!
//! 1. add masker clips on `source1` and `source3`
//! 2. sleep for the pre-target delay
//! 3. start the talker video on the display (optional)
//! 4. sleep for the lip-sync margin
//! 5. add the target clip on `source2` at the current probe gain
//!
//! Sleeps block the calling thread; a trial cannot be cancelled once begun.
//! Sends are fire and forget and any error propagates to the caller as-is.

use crate::config::BlockConfig;
use crate::error::{Result, SeatError};
use crate::net::endpoints::{NetworkEndpoints, SamplerSource};
use crate::net::osc::OscType;
use crate::paths::read_path_list;
use crate::trial::probe::GainSetting;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Delay between starting the talker video and starting the target audio
pub const LIP_SYNC_DELAY: Duration = Duration::from_millis(150);

/// Each clip plays once
pub const LOOP_COUNT: i32 = 1;

/// Video player id used for trial videos
pub const TARGET_VIDEO_PLAYER_ID: i32 = 2;

/// Immutable per-block trial timing and material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialParameters {
    pub pre_target_delay: Duration,
    pub present_target_video: bool,
    /// Video for each stimulus, indexed by stimulus id
    pub target_videos: Vec<PathBuf>,
}

impl TrialParameters {
    /// Build from a block, reading and checking the video list when needed
    pub fn from_block(block: &BlockConfig) -> Result<Self> {
        let target_videos = match (&block.target_video_list_file, block.present_target_video) {
            (Some(list), true) => read_path_list(&block.root_dir.join(list))?,
            (None, true) => {
                return Err(SeatError::Configuration(
                    "present_target_video requires target_video_list_file".to_string(),
                ))
            }
            (_, false) => Vec::new(),
        };

        Ok(Self {
            pre_target_delay: block.pre_target_delay()?,
            present_target_video: block.present_target_video,
            target_videos,
        })
    }

    pub fn video_for(&self, stimulus_id: usize) -> Result<&Path> {
        self.target_videos
            .get(stimulus_id)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                SeatError::Configuration(format!(
                    "no target video listed for stimulus {} ({} listed)",
                    stimulus_id,
                    self.target_videos.len()
                ))
            })
    }
}

/// Emits the message sequence for one trial
#[derive(Debug, Clone)]
pub struct TrialSequencer {
    params: TrialParameters,
    target: SamplerSource,
    maskers: [SamplerSource; 2],
    masker_gain: GainSetting,
}

impl TrialSequencer {
    pub fn new(params: TrialParameters) -> Self {
        Self {
            params,
            target: SamplerSource::Source2,
            maskers: [SamplerSource::Source1, SamplerSource::Source3],
            masker_gain: GainSetting::UNITY,
        }
    }

    pub fn params(&self) -> &TrialParameters {
        &self.params
    }

    /// Present stimulus `stimulus_id` with the target at `target_gain`.
    /// The caller is responsible for the renderer being active.
    pub fn present_trial(
        &self,
        endpoints: &NetworkEndpoints,
        target_gain: GainSetting,
        stimulus_id: usize,
    ) -> Result<()> {
        // Resolve before anything is sent so a bad id cannot leave maskers playing alone
        let clip = clip_number(stimulus_id)?;
        let video = if self.params.present_target_video {
            Some(self.params.video_for(stimulus_id)?)
        } else {
            None
        };

        tracing::debug!(stimulus_id, gain = target_gain.linear(), "Presenting trial");

        for masker in self.maskers {
            endpoints.sampler(masker).send(
                &add_address(masker, clip),
                clip_args(self.masker_gain),
            )?;
        }

        thread::sleep(self.params.pre_target_delay);

        if let Some(video) = video {
            endpoints.display.send(
                "/video/play",
                vec![
                    OscType::Int(TARGET_VIDEO_PLAYER_ID),
                    OscType::String(video.to_string_lossy().into_owned()),
                ],
            )?;
        }

        thread::sleep(LIP_SYNC_DELAY);

        endpoints
            .sampler(self.target)
            .send(&add_address(self.target, clip), clip_args(target_gain))
    }
}

/// TASCAR sound files are numbered from 1
pub fn clip_number(stimulus_id: usize) -> Result<usize> {
    stimulus_id.checked_add(1).ok_or_else(|| {
        SeatError::Configuration(format!("stimulus id {} is out of range", stimulus_id))
    })
}

/// `/<source>/<clip>/add`
fn add_address(source: SamplerSource, clip: usize) -> String {
    format!("/{}/{}/add", source.name(), clip)
}

fn clip_args(gain: GainSetting) -> Vec<OscType> {
    vec![OscType::Int(LOOP_COUNT), OscType::Float(gain.linear() as f32)]
}
