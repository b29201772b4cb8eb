//! Pipeline configuration.
//!
//! [`ExtractConfig`] holds every tunable parameter of the trial-extraction
//! pipeline, [`LoadOptions`] the XDF reader switches and [`ReplayConfig`]
//! the session-replay settings.  All defaults reproduce the recording setup
//! the pipeline was built for (5 kHz NeurOne amplifier, "Game State" marker
//! stream).
//!
//! Every struct deserialises from JSON with missing fields falling back to
//! their defaults, so a config file only needs to list what it changes:
//!
//! ```json
//! { "path": "/data/session1", "files": ["run1.xdf", "run2.xdf"], "include_emg": true }
//! ```
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Names of the two streams the extractor reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamNames {
    /// Irregular string stream carrying the game state flags.
    pub markers: String,
    /// Continuous amplifier stream.
    pub eeg: String,
}

impl Default for StreamNames {
    fn default() -> Self {
        Self { markers: "Game State".into(), eeg: "NeuroneStream".into() }
    }
}

/// Marker labels delimiting a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerLabels {
    pub left: String,
    pub right: String,
    pub stop: String,
}

impl Default for MarkerLabels {
    fn default() -> Self {
        Self {
            left: "Monster left".into(),
            right: "Monster right".into(),
            stop: "Monster destroyed".into(),
        }
    }
}

/// XDF reader post-processing switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Map every stream onto the recording host's clock using the
    /// ClockOffset chunks (least-squares line over collection time).
    pub synchronize_clocks: bool,
    /// Replace timestamps of regularly sampled streams by a linear fit over
    /// sample index, segment by segment.
    pub dejitter_timestamps: bool,
    /// Gap (seconds) that starts a new dejitter segment.
    pub jitter_break_secs: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { synchronize_clocks: true, dejitter_timestamps: true, jitter_break_secs: 1.0 }
    }
}

/// Configuration of the trial-extraction pipeline.
///
/// Construct with struct-update syntax:
///
/// ```
/// use xdfepoch::ExtractConfig;
///
/// let cfg = ExtractConfig {
///     files: vec!["run1.xdf".into()],
///     target_sfreq: 125.0,
///     ..ExtractConfig::default()
/// };
/// assert_eq!(cfg.downsample_factor(5000.0), 40);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Directory prepended to every entry of `files`.
    pub path: PathBuf,
    /// Recordings to process, in order.
    pub files: Vec<String>,
    /// Seconds of signal kept before each start marker.
    ///
    /// Default: `1.0`.
    pub pre_roll_secs: f64,
    /// Output rate after block averaging.
    ///
    /// Default: `250.0` Hz (factor 20 at 5 kHz).
    pub target_sfreq: f64,
    /// Copy the leg EMG channels into the C3/C4/CP3/CP4 slots and raise the
    /// low-pass cutoff to [`lowpass_emg`](Self::lowpass_emg).
    pub include_emg: bool,
    /// Samples per conditioning chunk at the native rate.
    ///
    /// Default: `400`.
    pub chunk_samples: usize,
    /// Shortest accepted start → stop gap, in seconds.
    ///
    /// Default: `1.0`.
    pub min_trial_secs: f64,
    /// Power-line frequency removed by the notch filter.
    pub notch_freq: f64,
    /// Quality factor of the notch filter.
    pub notch_q: f64,
    /// Butterworth low-pass order.
    pub lowpass_order: usize,
    /// Low-pass cutoff for EEG-only extraction (Hz).
    pub lowpass_eeg: f64,
    /// Low-pass cutoff when EMG channels are substituted in (Hz).
    pub lowpass_emg: f64,
    /// Weight of the newest sample in the running standardizer.
    pub standardize_factor_new: f64,
    /// Lower bound of the running standard deviation.
    pub standardize_eps: f64,
    /// Log and skip unreadable files instead of aborting the run.
    ///
    /// Default: `false` (the first read error is returned).  Every other
    /// per-file error is always logged and skipped.
    pub skip_unreadable: bool,
    pub streams: StreamNames,
    pub labels: MarkerLabels,
    pub load: LoadOptions,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            files: Vec::new(),
            pre_roll_secs: 1.0,
            target_sfreq: 250.0,
            include_emg: false,
            chunk_samples: 400,
            min_trial_secs: 1.0,
            notch_freq: 50.0,
            notch_q: 30.0,
            lowpass_order: 6,
            lowpass_eeg: 40.0,
            lowpass_emg: 120.0,
            standardize_factor_new: 1e-3,
            standardize_eps: 1e-4,
            skip_unreadable: false,
            streams: StreamNames::default(),
            labels: MarkerLabels::default(),
            load: LoadOptions::default(),
        }
    }
}

impl ExtractConfig {
    /// Read a JSON config file; absent fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        read_json(path.as_ref())
    }

    /// Full paths of all input files, in processing order.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| self.path.join(f)).collect()
    }

    /// Low-pass cutoff in effect for this run.
    pub fn lowpass_cutoff(&self) -> f64 {
        if self.include_emg {
            self.lowpass_emg
        } else {
            self.lowpass_eeg
        }
    }

    /// Block-averaging factor: `round(native / target)`, at least 1.
    pub fn downsample_factor(&self, native_sfreq: f64) -> usize {
        ((native_sfreq / self.target_sfreq).round() as usize).max(1)
    }

    /// Minimum start → stop distance in native samples (5000 at 5 kHz).
    pub fn min_trial_samples(&self, native_sfreq: f64) -> usize {
        (self.min_trial_secs * native_sfreq).round() as usize
    }

    /// Pre-roll in native samples.
    pub fn pre_roll_samples(&self, native_sfreq: f64) -> usize {
        (self.pre_roll_secs * native_sfreq).round() as usize
    }

    /// Check the parameters against the native rate of a recording.
    pub fn validate(&self, native_sfreq: f64) -> Result<()> {
        let bad = |msg: String| Err(Error::InvalidConfig(msg));
        if !(native_sfreq > 0.0) {
            return bad(format!("native sampling rate must be positive, got {native_sfreq}"));
        }
        if !(self.target_sfreq > 0.0) || self.target_sfreq > native_sfreq {
            return bad(format!(
                "target_sfreq {} must be in (0, {native_sfreq}]",
                self.target_sfreq
            ));
        }
        if self.pre_roll_secs < 0.0 {
            return bad(format!("pre_roll_secs must be >= 0, got {}", self.pre_roll_secs));
        }
        if self.chunk_samples == 0 {
            return bad("chunk_samples must be > 0".into());
        }
        if self.downsample_factor(native_sfreq) > self.chunk_samples {
            return bad(format!(
                "downsample factor {} exceeds chunk size {}",
                self.downsample_factor(native_sfreq),
                self.chunk_samples
            ));
        }
        let nyquist = native_sfreq / 2.0;
        for (what, f) in [("notch_freq", self.notch_freq), ("low-pass cutoff", self.lowpass_cutoff())] {
            if !(f > 0.0 && f < nyquist) {
                return bad(format!("{what} {f} Hz outside (0, {nyquist}) Hz"));
            }
        }
        if self.lowpass_order == 0 {
            return bad("lowpass_order must be >= 1".into());
        }
        if !(self.notch_q > 0.0) {
            return bad(format!("notch_q must be positive, got {}", self.notch_q));
        }
        Ok(())
    }
}

/// Configuration of the session replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub path: PathBuf,
    pub files: Vec<String>,
    /// Poll interval of the pacing loop in milliseconds.
    pub tick_ms: u64,
    /// Start each file immediately; otherwise wait for the start hook.
    pub auto: bool,
    /// Interval between progress log lines, seconds.
    pub progress_secs: f64,
    pub streams: StreamNames,
    pub load: LoadOptions,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            files: Vec::new(),
            tick_ms: 1,
            auto: true,
            progress_secs: 60.0,
            streams: StreamNames::default(),
            load: LoadOptions::default(),
        }
    }
}

impl ReplayConfig {
    /// Read a JSON config file; absent fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        read_json(path.as_ref())
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| self.path.join(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_defaults() {
        let cfg = ExtractConfig::default();
        assert_eq!(cfg.downsample_factor(5000.0), 20);
        assert_eq!(cfg.min_trial_samples(5000.0), 5000);
        assert_eq!(cfg.pre_roll_samples(5000.0), 5000);
        assert_eq!(cfg.lowpass_cutoff(), 40.0);
        assert!(cfg.validate(5000.0).is_ok());
    }

    #[test]
    fn thresholds_scale_with_rate() {
        let cfg = ExtractConfig { pre_roll_secs: 0.5, ..ExtractConfig::default() };
        assert_eq!(cfg.min_trial_samples(1000.0), 1000);
        assert_eq!(cfg.pre_roll_samples(1000.0), 500);
        assert_eq!(cfg.downsample_factor(1000.0), 4);
    }

    #[test]
    fn emg_raises_cutoff() {
        let cfg = ExtractConfig { include_emg: true, ..ExtractConfig::default() };
        assert_eq!(cfg.lowpass_cutoff(), 120.0);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: ExtractConfig =
            serde_json::from_str(r#"{ "files": ["a.xdf"], "include_emg": true, "labels": { "stop": "end" } }"#)
                .unwrap();
        assert_eq!(cfg.files, vec!["a.xdf"]);
        assert!(cfg.include_emg);
        assert_eq!(cfg.labels.stop, "end");
        assert_eq!(cfg.labels.left, "Monster left");
        assert_eq!(cfg.chunk_samples, 400);
    }

    #[test]
    fn validate_rejects_cutoff_above_nyquist() {
        let cfg = ExtractConfig { lowpass_eeg: 300.0, ..ExtractConfig::default() };
        assert!(matches!(cfg.validate(500.0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn config_files_load_with_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replay.json");
        std::fs::write(&path, r#"{ "files": ["a.xdf"], "tick_ms": 5, "auto": false }"#).unwrap();
        let cfg = ReplayConfig::from_json_file(&path).unwrap();
        assert_eq!((cfg.tick_ms, cfg.auto), (5, false));
        assert_eq!(cfg.streams.eeg, "NeuroneStream");

        let cfg = ExtractConfig::from_json_file(&path);
        assert!(cfg.is_ok(), "unknown fields are ignored");

        std::fs::write(&path, "{ not json").unwrap();
        let err = ReplayConfig::from_json_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
        assert!(ReplayConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn file_paths_join_directory() {
        let cfg = ExtractConfig {
            path: PathBuf::from("/data"),
            files: vec!["a.xdf".into(), "b.xdf".into()],
            ..ExtractConfig::default()
        };
        assert_eq!(cfg.file_paths(), vec![PathBuf::from("/data/a.xdf"), PathBuf::from("/data/b.xdf")]);
    }
}
