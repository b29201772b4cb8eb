//! Per-trial signal conditioning.
//!
//! A trial window is cut into consecutive chunks of `chunk_samples` native
//! samples starting at the window start; a trailing partial chunk is
//! discarded.  Each chunk runs through
//!
//! ```text
//! [C, 400] f64 ─ notch (zero-phase) ─ low-pass (zero-phase) ─ block average ─┐
//!                                                                              │
//! [C, 20] f32  ◄──────────── cast ◄──────────── standardize (stateful) ◄───────┘
//! ```
//!
//! and the chunk outputs are concatenated along time.  Filtering is done per
//! chunk, so each chunk carries its own edge handling.
use std::ops::Range;

use ndarray::{s, Array2, ArrayView2};

use crate::config::ExtractConfig;
use crate::epoch::TrialWindow;
use crate::error::Result;
use crate::filter::{butter_lowpass, iir_notch, sosfiltfilt_rows, Sos};
use crate::normalize::Standardizer;
use crate::resample::{block_average, output_len};

/// Filters and decimation settings for one native sampling rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditioner {
    notch: Sos,
    lowpass: Sos,
    factor: usize,
    chunk_samples: usize,
}

impl Conditioner {
    /// Design the filters for recordings sampled at `native_sfreq`.
    pub fn new(cfg: &ExtractConfig, native_sfreq: f64) -> Result<Self> {
        cfg.validate(native_sfreq)?;
        let cutoff = cfg.lowpass_cutoff();
        let factor = cfg.downsample_factor(native_sfreq);
        log::debug!(
            "conditioner @ {native_sfreq} Hz: notch {} Hz (Q {}), low-pass order {} @ {cutoff} Hz, \
             chunk {} samples, factor {factor}",
            cfg.notch_freq,
            cfg.notch_q,
            cfg.lowpass_order,
            cfg.chunk_samples
        );
        Ok(Self {
            notch: iir_notch(cfg.notch_freq, cfg.notch_q, native_sfreq),
            lowpass: butter_lowpass(cfg.lowpass_order, cutoff, native_sfreq),
            factor,
            chunk_samples: cfg.chunk_samples,
        })
    }

    /// Block-averaging factor.
    pub fn factor(&self) -> usize {
        self.factor
    }

    pub fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    /// Output samples per chunk: `floor(chunk_samples / factor)`.
    pub fn chunk_output_len(&self) -> usize {
        output_len(self.chunk_samples, self.factor)
    }

    /// Column ranges of the full chunks inside `[start, stop)`.
    pub fn chunk_bounds(&self, start: usize, stop: usize) -> Vec<Range<usize>> {
        let n_full = stop.saturating_sub(start) / self.chunk_samples;
        (0..n_full)
            .map(|k| {
                let a = start + k * self.chunk_samples;
                a..a + self.chunk_samples
            })
            .collect()
    }

    /// Conditioned length of a window of `window_len` native samples.
    pub fn reduced_len(&self, window_len: usize) -> usize {
        (window_len / self.chunk_samples) * self.chunk_output_len()
    }

    /// Notch, low-pass and block-average one chunk (`[C, T]`).
    pub fn filter_chunk(&self, chunk: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut data = chunk.to_owned();
        sosfiltfilt_rows(&mut data, &self.notch);
        sosfiltfilt_rows(&mut data, &self.lowpass);
        block_average(data.view(), self.factor)
    }

    /// Full per-chunk chain including standardization and the f32 cast.
    pub fn condition_chunk(
        &self,
        chunk: ArrayView2<'_, f64>,
        standardizer: &mut dyn Standardizer,
    ) -> Array2<f32> {
        let reduced = self.filter_chunk(chunk);
        standardizer.process(reduced.view()).mapv(|v| v as f32)
    }

    /// Condition the samples of `window` taken from `data` (`[C, T]`).
    ///
    /// Returns `[C, reduced_len(window.len())]`; a window shorter than one
    /// chunk yields zero columns.
    pub fn condition_trial(
        &self,
        data: ArrayView2<'_, f64>,
        window: &TrialWindow,
        standardizer: &mut dyn Standardizer,
    ) -> Array2<f32> {
        let stop = window.stop.min(data.ncols());
        let bounds = self.chunk_bounds(window.start, stop);
        let step = self.chunk_output_len();

        let mut out = Array2::<f32>::zeros((data.nrows(), bounds.len() * step));
        for (k, r) in bounds.iter().enumerate() {
            let y = self.condition_chunk(data.slice(s![.., r.clone()]), standardizer);
            out.slice_mut(s![.., k * step..(k + 1) * step]).assign(&y);
        }
        out
    }
}
