//! Probe-level control
//!
//! The probe level is the SNR of the target relative to the maskers, in dB.
//! Maskers stay at unity gain, so the SNR maps directly onto the target's
//! linear gain: `gain = 10^(snr / 20)`.

/// Linear gain applied to a sample player clip
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct GainSetting(f64);

impl GainSetting {
    pub const UNITY: GainSetting = GainSetting(1.0);

    /// Convert an SNR in dB to a linear amplitude gain
    pub fn from_snr_db(snr_db: f64) -> Self {
        GainSetting(10f64.powf(snr_db / 20.0))
    }

    pub fn linear(self) -> f64 {
        self.0
    }
}

impl Default for GainSetting {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Holds the target gain used by subsequent trials
#[derive(Debug, Clone, Default)]
pub struct ProbeLevelController {
    gain: GainSetting,
    probe_level_db: Option<f64>,
}

impl ProbeLevelController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the gain for `snr_db`. No range check: a non-finite SNR gives a
    /// non-finite or zero gain, so callers should reject those first.
    pub fn set_probe_level(&mut self, snr_db: f64) -> GainSetting {
        self.gain = GainSetting::from_snr_db(snr_db);
        self.probe_level_db = Some(snr_db);
        tracing::debug!(snr_db, gain = self.gain.linear(), "Probe level set");
        self.gain
    }

    pub fn gain(&self) -> GainSetting {
        self.gain
    }

    /// Last probe level set, if any
    pub fn probe_level_db(&self) -> Option<f64> {
        self.probe_level_db
    }
}
