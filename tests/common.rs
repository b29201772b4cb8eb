/// Shared helpers: synthetic XDF sessions for integration tests.
use ndarray::Array2;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use xdfepoch::xdf::{ChannelFormat, StreamHeader, XdfWriter};

pub const SFREQ: f64 = 5000.0;
pub const T0: f64 = 1000.0;

pub const LEFT: &str = "Monster left";
pub const RIGHT: &str = "Monster right";
pub const STOP: &str = "Monster destroyed";

/// Description of a synthetic session: amplifier width, length in samples
/// and markers placed exactly on sample times.
#[derive(Debug, Clone)]
pub struct Session {
    pub width: usize,
    pub n_samples: usize,
    pub markers: Vec<(usize, &'static str)>,
}

#[allow(unused)]
impl Session {
    pub fn new(n_samples: usize, markers: &[(usize, &'static str)]) -> Self {
        Self { width: 72, n_samples, markers: markers.to_vec() }
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Deterministic multi-channel signal: slow rhythms, line noise and a
/// per-channel offset, so every row differs.
pub fn synthetic_eeg(width: usize, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((width, n), |(c, i)| {
        let t = i as f64 / SFREQ;
        let c = c as f64;
        20.0 * (2.0 * PI * (8.0 + 0.25 * c) * t).sin()
            + 5.0 * (2.0 * PI * 50.0 * t + c).sin()
            + 3.0 * (2.0 * PI * (1.0 + 0.1 * c) * t).cos()
            + c
    })
}

/// XDF bytes of `session` with the default stream names.
pub fn session_bytes(session: &Session) -> Vec<u8> {
    let mut w = XdfWriter::new();
    w.add_stream(StreamHeader::new(1, "Game State", "Flags", 1, 0.0, ChannelFormat::String));
    w.add_stream(StreamHeader::new(2, "NeuroneStream", "EEG", session.width, SFREQ, ChannelFormat::Float32));

    let times: Vec<f64> = (0..session.n_samples).map(|i| T0 + i as f64 / SFREQ).collect();
    let data = synthetic_eeg(session.width, session.n_samples);
    w.add_numeric_samples(2, &times, data.view()).unwrap();

    let (stamps, labels): (Vec<f64>, Vec<Vec<String>>) = session
        .markers
        .iter()
        .map(|&(sample, label)| (T0 + sample as f64 / SFREQ, vec![label.to_string()]))
        .unzip();
    w.add_text_samples(1, &stamps, &labels).unwrap();
    w.finish()
}

/// Write `session` to `dir/name` and return the path.
pub fn write_session(dir: &Path, name: &str, session: &Session) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, session_bytes(session)).unwrap();
    path
}
