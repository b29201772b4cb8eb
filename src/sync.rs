//! Line fits and video-frame ↔ LSL-time calibration.
//!
//! A recording setup flashes an on-screen indicator whenever a `Video Sync`
//! marker is pushed.  Given the indicator brightness of every video frame
//! and the LSL timestamps of the sync markers, [`frame_times`] predicts the
//! LSL time of every frame:
//!
//! ```text
//!   frames  0 ……… f₀ ……… f₁ ……… fₙ ……… N-1
//!           └─ extrapolate ─┘└ interpolate ┘└─ extrapolate ─┘
//!              (line f₀,f₁)                   (line fₙ₋₁,fₙ)
//! ```
//!
//! [`video_frame_times`] does the whole calibration against a loaded
//! [`Recording`].  [`LinearFit`] is also used by the XDF reader for
//! clock-offset correction and timestamp dejittering.
use crate::error::{Error, Result};
use crate::recording::Recording;

/// Marker stream pushed at every indicator flash.
pub const VIDEO_SYNC_STREAM: &str = "Video Sync";

/// `y = slope · x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Horizontal line `y = c`.
    pub fn constant(c: f64) -> Self {
        Self { slope: 0.0, intercept: c }
    }

    /// Line through two points.  `None` when both share the same `x`.
    pub fn through(p0: (f64, f64), p1: (f64, f64)) -> Option<Self> {
        let dx = p1.0 - p0.0;
        if dx == 0.0 {
            return None;
        }
        let slope = (p1.1 - p0.1) / dx;
        Some(Self { slope, intercept: p0.1 - slope * p0.0 })
    }

    /// Ordinary least-squares fit.
    ///
    /// `x` is centred before accumulating so large absolute timestamps do
    /// not cost precision.  `None` for fewer than two points or zero
    /// variance in `x`.
    pub fn least_squares(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return None;
        }
        let mx = xs[..n].iter().sum::<f64>() / n as f64;
        let my = ys[..n].iter().sum::<f64>() / n as f64;
        let (mut sxx, mut sxy) = (0.0, 0.0);
        for (&x, &y) in xs[..n].iter().zip(&ys[..n]) {
            let dx = x - mx;
            sxx += dx * dx;
            sxy += dx * (y - my);
        }
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(Self { slope, intercept: my - slope * mx })
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Frames at which the sync indicator switches on.
///
/// The indicator is digitised as `value > threshold`; every 0 → 1
/// transition between frame `i` and `i + 1` reports frame `i + 1`.
pub fn sync_frames(indicator: &[f64], threshold: f64) -> Vec<usize> {
    indicator
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] <= threshold && w[1] > threshold)
        .map(|(i, _)| i + 1)
        .collect()
}

/// Predict the LSL time of each of `n_frames` video frames.
///
/// `record_frames` (strictly increasing) are the frames at which sync
/// pulses were seen; `sync_times` the matching marker timestamps.
pub fn frame_times(record_frames: &[usize], sync_times: &[f64], n_frames: usize) -> Result<Vec<f64>> {
    if record_frames.len() != sync_times.len() {
        return Err(Error::Sync(format!(
            "{} sync pulses in video but {} sync markers",
            record_frames.len(),
            sync_times.len()
        )));
    }
    let n = record_frames.len();
    if n < 2 {
        return Err(Error::Sync(format!("need at least 2 sync pulses, found {n}")));
    }
    if record_frames.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::Sync("sync frames are not strictly increasing".into()));
    }

    let pt = |i: usize| (record_frames[i] as f64, sync_times[i]);
    // Strictly increasing frames guarantee distinct x, so both fits exist.
    let head = LinearFit::through(pt(0), pt(1))
        .ok_or_else(|| Error::Sync("degenerate leading sync pair".into()))?;
    let tail = LinearFit::through(pt(n - 2), pt(n - 1))
        .ok_or_else(|| Error::Sync("degenerate trailing sync pair".into()))?;

    let first = record_frames[0];
    let last = record_frames[n - 1];
    let times = (0..n_frames)
        .map(|f| {
            if f < first {
                head.eval(f as f64)
            } else if f > last {
                tail.eval(f as f64)
            } else {
                // Segment [k-1, k] with record_frames[k-1] <= f <= record_frames[k].
                let k = record_frames.partition_point(|&r| r < f).max(1);
                let (x0, y0) = pt(k - 1);
                let (x1, y1) = pt(k);
                y0 + (f as f64 - x0) * (y1 - y0) / (x1 - x0)
            }
        })
        .collect();
    Ok(times)
}

/// Timestamps of the [`VIDEO_SYNC_STREAM`] of `rec`.
pub fn sync_times(rec: &Recording) -> Result<&[f64]> {
    Ok(rec.require(VIDEO_SYNC_STREAM)?.timestamps.as_slice())
}

/// LSL time of every video frame, given the indicator value of each frame.
pub fn video_frame_times(rec: &Recording, indicator: &[f64], threshold: f64) -> Result<Vec<f64>> {
    let frames = sync_frames(indicator, threshold);
    frame_times(&frames, sync_times(rec)?, indicator.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn least_squares_recovers_line() {
        let xs: Vec<f64> = (0..50).map(|i| 1.0e5 + i as f64 * 0.2).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 * x - 3.0).collect();
        let fit = LinearFit::least_squares(&xs, &ys).unwrap();
        assert_abs_diff_eq!(fit.slope, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.eval(1.0e5), 0.5e5 - 3.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_fits() {
        assert!(LinearFit::least_squares(&[1.0], &[2.0]).is_none());
        assert!(LinearFit::least_squares(&[1.0, 1.0], &[2.0, 3.0]).is_none());
        assert!(LinearFit::through((1.0, 0.0), (1.0, 5.0)).is_none());
    }

    #[test]
    fn rising_edges_only() {
        let ind = [0.0, 0.0, 300.0, 300.0, 0.0, 250.0, 0.0];
        assert_eq!(sync_frames(&ind, 100.0), vec![2, 5]);
    }

    #[test]
    fn interpolates_and_extrapolates() {
        // 10 fps video, pulses every 10 frames at t = 100, 101, 102.
        let frames = [5, 15, 25];
        let times = [100.0, 101.0, 102.0];
        let out = frame_times(&frames, &times, 30).unwrap();
        assert_eq!(out.len(), 30);
        assert_abs_diff_eq!(out[0], 99.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[5], 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[10], 100.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[25], 102.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[29], 102.4, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_counts_rejected() {
        assert!(frame_times(&[1, 2, 3], &[0.0, 1.0], 10).is_err());
        assert!(frame_times(&[1], &[0.0], 10).is_err());
        assert!(frame_times(&[3, 3], &[0.0, 1.0], 10).is_err());
    }
}
