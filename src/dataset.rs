//! Dataset assembly: recordings in, labelled trial matrices out.
//!
//! Per file:
//!
//! ```text
//! Recording ─► marker stream ─► align to EEG timestamps ─► starts / stops
//!     │                                                       │
//!     └─► EEG stream ─► layout ─► [EMG substitution] ─► EEG rows
//!                                                             │
//!                     segment ─► condition each window ◄──────┘
//! ```
//!
//! Files are processed sequentially in the configured order, sharing one
//! [`Standardizer`] so its running statistics carry over from file to file.
//! A file that fails (unknown layout, missing stream, ...) is logged and
//! recorded in its [`FileReport`]; the run goes on.  Only [`Error::Read`]
//! is returned, unless `skip_unreadable` is set.
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::channels::{pick_kind, substitute_emg, ChannelKind, ChannelLayout};
use crate::condition::Conditioner;
use crate::config::ExtractConfig;
use crate::epoch::{binarize_labels, segment, SegmentRule, Start};
use crate::error::{Error, Result};
use crate::events::align_markers;
use crate::normalize::{ExponentialStandardizer, Standardizer};
use crate::recording::{self, Recording};

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileReport {
    pub file: PathBuf,
    /// Left/right start markers found.
    pub n_starts: usize,
    /// Trials emitted.
    pub n_trials: usize,
    /// Starts skipped because the stop came too soon.
    pub n_malformed: usize,
    /// Starts dropped because no stop followed.
    pub n_incomplete: usize,
    /// The file contributed nothing because of `error`.
    pub skipped: bool,
    /// Why the file was skipped.
    pub error: Option<String>,
}

impl FileReport {
    fn skipped(file: PathBuf, err: &Error) -> Self {
        Self { file, skipped: true, error: Some(err.to_string()), ..Self::default() }
    }
}

/// Trials of a single recording.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileDataset {
    /// `[C, T_i]` per trial.
    pub x: Vec<Array2<f32>>,
    /// `0` (left) / `1` (right) per trial.
    pub y: Vec<i64>,
    pub report: FileReport,
}

/// Trials of a whole run, in file order then trial order.
///
/// `x.len() == y.len()` always holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub x: Vec<Array2<f32>>,
    pub y: Vec<i64>,
    pub reports: Vec<FileReport>,
}

impl Dataset {
    pub fn append(&mut self, file: FileDataset) {
        debug_assert_eq!(file.x.len(), file.y.len());
        self.x.extend(file.x);
        self.y.extend(file.y);
        self.reports.push(file.report);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Number of trials per class, `[left, right]`.
    pub fn class_counts(&self) -> [usize; 2] {
        let right = self.y.iter().filter(|&&l| l == 1).count();
        [self.y.len() - right, right]
    }
}

/// Extract every trial of one loaded recording.
pub fn extract_recording(
    rec: &Recording,
    cfg: &ExtractConfig,
    conditioner: &Conditioner,
    standardizer: &mut dyn Standardizer,
) -> Result<FileDataset> {
    let file = rec.path.clone().unwrap_or_default();

    let markers = rec.require(&cfg.streams.markers)?.markers()?;
    let eeg = rec.require(&cfg.streams.eeg)?;
    let raw = eeg.numeric()?;
    let layout = ChannelLayout::for_width(raw.nrows())?;

    let data = if cfg.include_emg {
        let mut full = raw.clone();
        substitute_emg(&mut full, &layout)?;
        pick_kind(&full, &layout, ChannelKind::Eeg)
    } else {
        pick_kind(raw, &layout, ChannelKind::Eeg)
    };

    let table = align_markers(&eeg.timestamps, &markers);
    // No stop label at all: every start ends up incomplete.
    let mut stops = match table.code_of(&cfg.labels.stop) {
        Some(code) => table.samples_with(code),
        None => {
            log::warn!("{}: stop label '{}' never occurs", file.display(), cfg.labels.stop);
            Vec::new()
        }
    };
    let start_codes: Vec<usize> = [&cfg.labels.left, &cfg.labels.right]
        .into_iter()
        .filter_map(|l| table.code_of(l))
        .collect();

    let start_events = table.filter_codes(&start_codes);
    let codes: Vec<usize> = start_events.iter().map(|e| e.code).collect();
    let starts: Vec<Start> = start_events
        .iter()
        .zip(binarize_labels(&codes))
        .map(|(e, label)| Start { sample: e.sample, label })
        .collect();
    stops.sort_unstable();

    let sfreq = eeg.sfreq();
    let rule = SegmentRule {
        min_samples: cfg.min_trial_samples(sfreq),
        pre_roll_samples: cfg.pre_roll_samples(sfreq),
    };
    let seg = segment(&starts, &stops, rule);
    if seg.clamped > 0 {
        log::debug!("{} window(s) clamped at the first sample", seg.clamped);
    }

    let mut out = FileDataset::default();
    for window in &seg.trials {
        out.x.push(conditioner.condition_trial(data.view(), window, standardizer));
        out.y.push(i64::from(window.label));
    }

    out.report = FileReport {
        file,
        n_starts: starts.len(),
        n_trials: seg.trials.len(),
        n_malformed: seg.malformed,
        n_incomplete: seg.incomplete,
        skipped: false,
        error: None,
    };
    if seg.malformed > 0 || seg.incomplete > 0 {
        log::warn!(
            "{}: dropped {} malformed and {} incomplete trial(s)",
            out.report.file.display(),
            seg.malformed,
            seg.incomplete
        );
    }
    Ok(out)
}

/// Load and extract one file.
pub fn extract_file(
    path: &Path,
    cfg: &ExtractConfig,
    standardizer: &mut dyn Standardizer,
) -> Result<FileDataset> {
    let rec = recording::load_with(path, &cfg.load)?;
    let sfreq = rec.require(&cfg.streams.eeg)?.sfreq();
    let conditioner = Conditioner::new(cfg, sfreq)?;
    extract_recording(&rec, cfg, &conditioner, standardizer)
}

/// Run the whole pipeline over `cfg.files` with a fresh
/// [`ExponentialStandardizer`].
pub fn extract(cfg: &ExtractConfig) -> Result<Dataset> {
    let mut standardizer = ExponentialStandardizer::from_config(cfg);
    extract_with(cfg, &mut standardizer)
}

/// Run the whole pipeline over `cfg.files` with a caller-owned standardizer.
pub fn extract_with(cfg: &ExtractConfig, standardizer: &mut dyn Standardizer) -> Result<Dataset> {
    let mut dataset = Dataset::default();
    for path in cfg.file_paths() {
        log::info!("reading {}", path.display());
        match extract_file(&path, cfg, standardizer) {
            Ok(file) => {
                log::info!(
                    "{}: {} trial(s) from {} start marker(s)",
                    path.display(),
                    file.report.n_trials,
                    file.report.n_starts
                );
                dataset.append(file);
            }
            Err(err @ Error::Read { .. }) if !cfg.skip_unreadable => return Err(err),
            Err(err) => {
                log::warn!("{}: skipped: {err}", path.display());
                dataset.reports.push(FileReport::skipped(path, &err));
            }
        }
    }
    let [left, right] = dataset.class_counts();
    log::info!(
        "extracted {} trial(s) ({left} left, {right} right) from {} file(s)",
        dataset.len(),
        dataset.reports.len()
    );
    Ok(dataset)
}
