//! IIR filter design in second-order-section form, matching
//! `scipy.signal.butter(..., output='sos')` and `scipy.signal.iirnotch`.
//!
//! Every section is a row `[b0, b1, b2, a0, a1, a2]` with `a0 = 1`.
//!
//! Butterworth low-pass of order N at cutoff `fc`:
//!   • analog poles   p_k = ωc · exp(iπ(2k + N + 1) / 2N),  k = 0..N
//!   • prewarping     ωc  = 2·fs · tan(π·fc / fs)
//!   • bilinear map   z   = (2fs + p) / (2fs − p), all zeros at z = −1
//!   • each section normalised to unit DC gain
use std::f64::consts::PI;

use num_complex::Complex64;

/// Cascade of second-order sections.
pub type Sos = Vec<[f64; 6]>;

/// Digital Butterworth low-pass.
///
/// Sections are ordered with the poles closest to the unit circle last.
pub fn butter_lowpass(order: usize, cutoff_hz: f64, sfreq: f64) -> Sos {
    assert!(order >= 1, "filter order must be at least 1");
    assert!(
        cutoff_hz > 0.0 && cutoff_hz < sfreq / 2.0,
        "cutoff {cutoff_hz} Hz outside (0, {}) Hz",
        sfreq / 2.0
    );

    let fs2 = 2.0 * sfreq;
    let wc = fs2 * (PI * cutoff_hz / sfreq).tan();
    let n = order as f64;

    // Analog poles in the upper half plane (plus the real one for odd N);
    // their conjugates are implied by the section layout.
    let mut sections: Vec<(f64, [f64; 6])> = (0..order.div_ceil(2))
        .map(|k| {
            let theta = PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
            let p_analog = Complex64::from_polar(wc, theta);
            let p = (fs2 + p_analog) / (fs2 - p_analog);
            if 2 * k + 1 == order {
                // Real pole: first-order section.
                let pr = p.re;
                let g = (1.0 - pr) / 2.0;
                (pr.abs(), [g, g, 0.0, 1.0, -pr, 0.0])
            } else {
                let a1 = -2.0 * p.re;
                let a2 = p.norm_sqr();
                let g = (1.0 + a1 + a2) / 4.0;
                (p.norm(), [g, 2.0 * g, g, 1.0, a1, a2])
            }
        })
        .collect();

    sections.sort_by(|a, b| a.0.total_cmp(&b.0));
    sections.into_iter().map(|(_, s)| s).collect()
}

/// Second-order IIR notch (band-stop) at `freq_hz` with quality factor `q`.
///
/// `−3 dB` bandwidth is `freq_hz / q`.
pub fn iir_notch(freq_hz: f64, q: f64, sfreq: f64) -> Sos {
    assert!(
        freq_hz > 0.0 && freq_hz < sfreq / 2.0,
        "notch frequency {freq_hz} Hz outside (0, {}) Hz",
        sfreq / 2.0
    );
    assert!(q > 0.0, "quality factor must be positive");

    let w0 = 2.0 * PI * freq_hz / sfreq;
    let bw = w0 / q;
    let gain = 1.0 / (1.0 + (bw / 2.0).tan());
    let c = w0.cos();
    vec![[gain, -2.0 * gain * c, gain, 1.0, -2.0 * gain * c, 2.0 * gain - 1.0]]
}

/// Magnitude response `|H(e^{iω})|` of a section cascade at `freq_hz`.
pub fn magnitude(sos: &[[f64; 6]], freq_hz: f64, sfreq: f64) -> f64 {
    let w = 2.0 * PI * freq_hz / sfreq;
    let z1 = Complex64::from_polar(1.0, -w);
    let z2 = z1 * z1;
    sos.iter()
        .map(|s| {
            let num = s[0] + s[1] * z1 + s[2] * z2;
            let den = s[3] + s[4] * z1 + s[5] * z2;
            (num / den).norm()
        })
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn section_count() {
        assert_eq!(butter_lowpass(6, 40.0, 5000.0).len(), 3);
        assert_eq!(butter_lowpass(5, 40.0, 5000.0).len(), 3);
        assert_eq!(butter_lowpass(1, 40.0, 5000.0).len(), 1);
    }

    #[test]
    fn lowpass_unit_dc_gain() {
        for order in 1..=8 {
            let sos = butter_lowpass(order, 40.0, 5000.0);
            assert_abs_diff_eq!(magnitude(&sos, 0.0, 5000.0), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn lowpass_half_power_at_cutoff() {
        for (order, fc) in [(6, 40.0), (6, 120.0), (3, 500.0)] {
            let sos = butter_lowpass(order, fc, 5000.0);
            assert_abs_diff_eq!(magnitude(&sos, fc, 5000.0), 0.5_f64.sqrt(), epsilon = 1e-6);
        }
    }

    #[test]
    fn lowpass_poles_inside_unit_circle() {
        let sos = butter_lowpass(6, 40.0, 5000.0);
        let radii: Vec<f64> = sos.iter().map(|s| s[5].sqrt()).collect();
        assert!(radii.iter().all(|&r| r < 1.0));
        assert!(radii.windows(2).all(|w| w[0] <= w[1]), "sections not ordered: {radii:?}");
    }

    #[test]
    fn lowpass_stopband() {
        // 6th order: 36 dB/octave, so 160 Hz (two octaves above 40) is below −70 dB.
        let sos = butter_lowpass(6, 40.0, 5000.0);
        assert!(magnitude(&sos, 160.0, 5000.0) < 10f64.powf(-70.0 / 20.0));
    }

    #[test]
    fn notch_matches_reference_coefficients() {
        // scipy.signal.iirnotch(50, 30, 5000)
        let s = iir_notch(50.0, 30.0, 5000.0)[0];
        assert_abs_diff_eq!(s[0], 0.998_953_897_5, epsilon = 1e-9);
        assert_abs_diff_eq!(s[5], 0.997_907_795_1, epsilon = 1e-9);
        assert_abs_diff_eq!(s[1], s[4], epsilon = 1e-15);
    }

    #[test]
    fn notch_response() {
        let sos = iir_notch(50.0, 30.0, 5000.0);
        assert!(magnitude(&sos, 50.0, 5000.0) < 1e-9);
        assert_abs_diff_eq!(magnitude(&sos, 0.0, 5000.0), 1.0, epsilon = 1e-12);
        assert!(magnitude(&sos, 10.0, 5000.0) > 0.99);
        // −3 dB edges at 50 ± bw/2.
        let edge = magnitude(&sos, 50.0 + 50.0 / 60.0, 5000.0);
        assert_abs_diff_eq!(edge, 0.5_f64.sqrt(), epsilon = 0.02);
    }
}
