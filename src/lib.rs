//! # xdfepoch — trial extraction for LSL/XDF EEG recordings in pure Rust
//!
//! `xdfepoch` turns motor-task sessions recorded with Lab Streaming Layer
//! into a labelled trial dataset.  The XDF container is decoded natively (no
//! liblsl) and every DSP step reproduces the SciPy routine of the same name
//! (`iirnotch`, `butter(output='sos')`, `sosfiltfilt`).
//!
//! ## Pipeline overview
//!
//! ```text
//! session.xdf
//!   │
//!   ├─ recording::load()        native XDF reader, clock sync + dejitter
//!   ├─ channels                 72/75-channel layout, optional EMG → C3/C4/CP3/CP4
//!   ├─ events::align_markers()  marker → nearest EEG sample, sorted label legend
//!   ├─ epoch::segment()         start ↔ next stop, drop malformed / incomplete
//!   └─ condition (per 400-sample chunk)
//!        ├─ notch 50 Hz          zero-phase
//!        ├─ Butterworth LP       40 Hz (120 Hz with EMG), zero-phase
//!        ├─ block average        5 kHz → 250 Hz
//!        └─ standardize          exponential running mean / variance
//!             │
//!             └─→ Dataset { x: Vec<[64, T_i] f32>, y: Vec<i64> }   (0 = left, 1 = right)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use xdfepoch::{extract, ExtractConfig};
//!
//! let cfg = ExtractConfig {
//!     path: "data/session1".into(),
//!     files: vec!["run1.xdf".into(), "run2.xdf".into()],
//!     ..ExtractConfig::default()
//! };
//! let ds = extract(&cfg).unwrap();
//! for (x, y) in ds.x.iter().zip(&ds.y) {
//!     println!("trial {:?} label {y}", x.dim());
//! }
//! xdfepoch::io::write_dataset(&ds, "trials.safetensors".as_ref()).unwrap();
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use xdfepoch::recording::load;
//! use xdfepoch::events::align_markers;
//! use xdfepoch::filter::{butter_lowpass, sosfiltfilt};
//!
//! let rec = load("run1.xdf").unwrap();
//! let eeg = rec.require("NeuroneStream").unwrap();
//! let markers = rec.require("Game State").unwrap().markers().unwrap();
//! let table = align_markers(&eeg.timestamps, &markers);
//! println!("legend: {:?}", table.legend);
//!
//! let sos = butter_lowpass(6, 40.0, eeg.sfreq());
//! let ch0 = eeg.numeric().unwrap().row(0).to_vec();
//! let smooth = sosfiltfilt(&sos, &ch0);
//! ```
//!
//! Recorded sessions can also be played back at their original pace (see
//! [`replay`]), and video frames mapped onto the LSL clock (see [`sync`]).

pub mod channels;
pub mod condition;
pub mod config;
pub mod dataset;
pub mod epoch;
pub mod error;
pub mod events;
pub mod filter;
pub mod io;
pub mod normalize;
pub mod recording;
pub mod replay;
pub mod resample;
pub mod sync;
pub mod xdf;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `xdfepoch::Foo` without having to know the internal module layout.

// config
pub use config::{ExtractConfig, LoadOptions, MarkerLabels, ReplayConfig, StreamNames};

// errors
pub use error::{Error, Result, XdfError};

// recording
pub use recording::{load, load_with, Recording, Sample, Series, Stream};

// channels
pub use channels::{ChannelKind, ChannelLayout, EMG_SUBSTITUTIONS};

// events
pub use events::{align_markers, nearest_sample, nearest_sample_scan, Event, EventTable, Marker};

// epoch
pub use epoch::{binarize_labels, segment, SegmentRule, Segmentation, Start, TrialWindow};

// conditioning
pub use condition::Conditioner;
pub use normalize::{ExponentialStandardizer, Standardizer};
pub use resample::block_average;

// dataset
pub use dataset::{extract, extract_file, extract_recording, extract_with, Dataset, FileDataset, FileReport};

// replay
pub use replay::{Clock, Outlet, ReplaySchedule, ReplayStats, WallClock};
