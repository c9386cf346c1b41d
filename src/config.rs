use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::features::Band;
use crate::audio::tempo::valid_fold_range;

/// All tunable analysis parameters. Every section falls back to its
/// defaults when absent from a config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    #[serde(default)]
    pub peaks: PeakConfig,
    #[serde(default)]
    pub bands: BandsConfig,
    #[serde(default)]
    pub tempo: TempoConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EnvelopeConfig {
    /// RMS windows per second; 50 gives ~20ms windows.
    #[serde(default = "default_windows_per_second")]
    pub windows_per_second: u32,
    /// Per-window decay applied to the running volume.
    #[serde(default = "default_decay")]
    pub decay: f32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PeakConfig {
    /// Forced scan advance after each detected peak.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: f64,
}

/// Detection parameters for one frequency band.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BandParams {
    /// High-pass cutoff in Hz; `None` leaves the low edge open.
    #[serde(default)]
    pub min_frequency: Option<f32>,
    /// Low-pass cutoff in Hz; `None` leaves the high edge open.
    #[serde(default)]
    pub max_frequency: Option<f32>,
    pub expected_max_peaks_per_minute: f64,
    pub initial_absolute_threshold: f32,
    pub initial_relative_threshold: f32,
    pub sustain_absolute_threshold: f32,
    pub sustain_relative_threshold: f32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BandsConfig {
    #[serde(default = "default_sub_bass")]
    pub sub_bass: BandParams,
    #[serde(default = "default_bass")]
    pub bass: BandParams,
    #[serde(default = "default_beat")]
    pub beat: BandParams,
    #[serde(default = "default_treble")]
    pub treble: BandParams,
}

/// Which statistic of the folded tempo histogram becomes the inferred BPM.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TempoEstimator {
    Mean,
    Median,
    /// Robust to the odd-multiple intervals (3x, 5x) that fold off the pulse.
    #[default]
    Mode,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TempoConfig {
    /// Minimum beat-band peak density required before inferring tempo.
    #[serde(default = "default_min_beats_per_minute")]
    pub min_beats_per_minute: f64,
    /// How many following peaks each peak is paired with.
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
    #[serde(default = "default_min_interval_seconds")]
    pub min_interval_seconds: f64,
    /// Lower edge of the octave-folding range.
    #[serde(default = "default_min_bpm")]
    pub min_bpm: f64,
    /// Upper edge of the octave-folding range.
    #[serde(default = "default_max_bpm")]
    pub max_bpm: f64,
    #[serde(default)]
    pub estimator: TempoEstimator,
    /// Used when neither a tag nor inference yields a tempo.
    #[serde(default = "default_bpm")]
    pub default_bpm: f64,
}

impl BandsConfig {
    pub fn params(&self, band: Band) -> &BandParams {
        match band {
            Band::SubBass => &self.sub_bass,
            Band::Bass => &self.bass,
            Band::Beat => &self.beat,
            Band::Treble => &self.treble,
        }
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            windows_per_second: default_windows_per_second(),
            decay: default_decay(),
        }
    }
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
        }
    }
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            sub_bass: default_sub_bass(),
            bass: default_bass(),
            beat: default_beat(),
            treble: default_treble(),
        }
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_beats_per_minute: default_min_beats_per_minute(),
            lookahead: default_lookahead(),
            min_interval_seconds: default_min_interval_seconds(),
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
            estimator: TempoEstimator::default(),
            default_bpm: default_bpm(),
        }
    }
}

fn default_windows_per_second() -> u32 { 50 }
fn default_decay() -> f32 { 0.9 }
fn default_cooldown_seconds() -> f64 { 1.0 / 16.0 }
fn default_min_beats_per_minute() -> f64 { 45.0 }
fn default_lookahead() -> usize { 9 }
fn default_min_interval_seconds() -> f64 { 0.25 }
fn default_min_bpm() -> f64 { 90.0 }
fn default_max_bpm() -> f64 { 180.0 }
fn default_bpm() -> f64 { 120.0 }

fn default_sub_bass() -> BandParams {
    BandParams {
        min_frequency: Some(20.0),
        max_frequency: Some(50.0),
        expected_max_peaks_per_minute: 60.0,
        initial_absolute_threshold: 0.2,
        initial_relative_threshold: 0.8,
        sustain_absolute_threshold: 0.15,
        sustain_relative_threshold: 0.6,
    }
}

fn default_bass() -> BandParams {
    BandParams {
        min_frequency: Some(50.0),
        max_frequency: Some(90.0),
        expected_max_peaks_per_minute: 120.0,
        initial_absolute_threshold: 0.2,
        initial_relative_threshold: 0.8,
        sustain_absolute_threshold: 0.15,
        sustain_relative_threshold: 0.6,
    }
}

fn default_beat() -> BandParams {
    BandParams {
        min_frequency: Some(90.0),
        max_frequency: Some(200.0),
        expected_max_peaks_per_minute: 300.0,
        initial_absolute_threshold: 0.15,
        initial_relative_threshold: 0.7,
        sustain_absolute_threshold: 0.1,
        sustain_relative_threshold: 0.5,
    }
}

// Treble sustains much more loosely than it starts so decaying shimmer
// stays one peak.
fn default_treble() -> BandParams {
    BandParams {
        min_frequency: Some(2048.0),
        max_frequency: None,
        expected_max_peaks_per_minute: 120.0,
        initial_absolute_threshold: 0.1,
        initial_relative_threshold: 0.5,
        sustain_absolute_threshold: 0.05,
        sustain_relative_threshold: 0.25,
    }
}

impl AnalysisConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.envelope.windows_per_second == 0 {
            return Err("envelope.windows_per_second must be positive".into());
        }
        if !valid_fold_range(self.tempo.min_bpm, self.tempo.max_bpm) {
            return Err(format!(
                "tempo range {}-{} BPM must satisfy 0 < min_bpm and min_bpm * 2 <= max_bpm",
                self.tempo.min_bpm, self.tempo.max_bpm
            ));
        }
        if !(self.tempo.default_bpm.is_finite() && self.tempo.default_bpm > 0.0) {
            return Err(format!("tempo.default_bpm {} must be positive", self.tempo.default_bpm));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Option<AnalysisConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    let cfg: AnalysisConfig = match toml::from_str(&content) {
        Ok(cfg) => cfg,
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            return None;
        }
    };
    if let Err(reason) = cfg.validate() {
        log::warn!("Invalid config {}: {}", path.display(), reason);
        return None;
    }
    Some(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.envelope.windows_per_second, 50);
        assert_eq!(cfg.tempo.estimator, TempoEstimator::Mode);
        assert_eq!(cfg.bands.treble.max_frequency, None);
        assert_eq!(cfg.bands.beat, default_beat());
    }

    #[test]
    fn partial_sections_override() {
        let src = r#"
            [tempo]
            estimator = "median"
            default_bpm = 100.0

            [bands.treble]
            min_frequency = 4000.0
            expected_max_peaks_per_minute = 90.0
            initial_absolute_threshold = 0.2
            initial_relative_threshold = 0.6
            sustain_absolute_threshold = 0.1
            sustain_relative_threshold = 0.3
        "#;
        let cfg: AnalysisConfig = toml::from_str(src).unwrap();
        assert_eq!(cfg.tempo.estimator, TempoEstimator::Median);
        assert_eq!(cfg.tempo.default_bpm, 100.0);
        assert_eq!(cfg.tempo.lookahead, 9);
        assert_eq!(cfg.bands.treble.min_frequency, Some(4000.0));
        assert_eq!(cfg.bands.treble.max_frequency, None);
        assert_eq!(cfg.bands.bass, default_bass());
    }

    #[test]
    fn defaults_validate() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn degenerate_tempo_range_is_rejected() {
        for src in [
            "[tempo]\nmax_bpm = 0.0",
            "[tempo]\nmin_bpm = -5.0",
            "[tempo]\nmin_bpm = 100.0\nmax_bpm = 150.0",
        ] {
            let cfg: AnalysisConfig = toml::from_str(src).unwrap();
            assert!(cfg.validate().is_err(), "{}", src);
        }

        let path = std::env::temp_dir().join(format!("trackscope-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[tempo]\nmax_bpm = 0.0\n").unwrap();
        assert!(load_config(&path).is_none());
        let _ = std::fs::remove_file(&path);
    }
}
