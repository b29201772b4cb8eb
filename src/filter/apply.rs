//! Second-order-section filtering, forward and zero-phase.
//!
//! Matches `scipy.signal.sosfilt` / `sosfilt_zi` / `sosfiltfilt`:
//!
//! - each section runs in transposed direct form II;
//! - the zero-phase pass runs forward then backward over an odd extension of
//!   `3 · ntaps` samples per side, both passes starting from the step-response
//!   steady state scaled by the first sample they see.
use ndarray::Array2;

/// Run the cascade over `x` with per-section state `zi` (updated in place).
pub fn sosfilt(sos: &[[f64; 6]], x: &[f64], zi: &mut [[f64; 2]]) -> Vec<f64> {
    debug_assert_eq!(sos.len(), zi.len());
    let mut y = x.to_vec();
    for (s, z) in sos.iter().zip(zi.iter_mut()) {
        let [b0, b1, b2, _, a1, a2] = *s;
        for v in y.iter_mut() {
            let xn = *v;
            let yn = b0 * xn + z[0];
            z[0] = b1 * xn - a1 * yn + z[1];
            z[1] = b2 * xn - a2 * yn;
            *v = yn;
        }
    }
    y
}

/// Initial state for a unit step, so a constant input passes without a
/// start-up transient.
pub fn sosfilt_zi(sos: &[[f64; 6]]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sos.iter()
        .map(|s| {
            let [b0, b1, b2, a0, a1, a2] = *s;
            let (bb0, bb1) = (b1 - a1 * b0, b2 - a2 * b0);
            let z0 = (bb0 + bb1) / (1.0 + a1 + a2);
            let z1 = bb1 - a2 * z0;
            let zi = [scale * z0, scale * z1];
            scale *= (b0 + b1 + b2) / (a0 + a1 + a2);
            zi
        })
        .collect()
}

/// Edge length of the odd extension: `3 · ntaps`, where trailing zero
/// coefficients of first-order sections do not count as taps.
pub fn default_padlen(sos: &[[f64; 6]]) -> usize {
    let b_zero = sos.iter().filter(|s| s[2] == 0.0).count();
    let a_zero = sos.iter().filter(|s| s[5] == 0.0).count();
    let ntaps = 2 * sos.len() + 1 - b_zero.min(a_zero);
    3 * ntaps
}

/// Zero-phase forward-backward filter of one signal.
///
/// The extension is clamped to `len − 1` samples per side for signals
/// shorter than the default pad.
pub fn sosfiltfilt(sos: &[[f64; 6]], x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let edge = default_padlen(sos).min(n - 1);
    let ext = odd_extension(x, edge);
    let zi = sosfilt_zi(sos);

    let x0 = ext[0];
    let mut state: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect();
    let mut y = sosfilt(sos, &ext, &mut state);

    y.reverse();
    let y0 = y[0];
    let mut state: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * y0, z[1] * y0]).collect();
    let mut y = sosfilt(sos, &y, &mut state);
    y.reverse();

    y[edge..edge + n].to_vec()
}

/// Zero-phase filter every channel of `data` (`[C, T]`) in place.
pub fn sosfiltfilt_rows(data: &mut Array2<f64>, sos: &[[f64; 6]]) {
    for mut row in data.rows_mut() {
        let filtered = sosfiltfilt(sos, &row.to_vec());
        row.assign(&ndarray::ArrayView1::from(&filtered));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Odd extension by `n_edge` samples per side (`scipy.signal._arraytools.odd_ext`).
///
/// Left:  `2·x[0]  − x[i]`      for i = n_edge..=1
/// Right: `2·x[-1] − x[-1 − i]` for i = 1..=n_edge
///
/// `n_edge` must be smaller than `x.len()`.
fn odd_extension(x: &[f64], n_edge: usize) -> Vec<f64> {
    let n = x.len();
    debug_assert!(n_edge < n);
    let mut out = Vec::with_capacity(n + 2 * n_edge);

    let first = x[0];
    out.extend((1..=n_edge).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    let last = x[n - 1];
    out.extend((1..=n_edge).map(|i| 2.0 * last - x[n - 1 - i]));

    out
}
