//! Running (exponentially weighted) per-channel standardization.
//!
//! For every sample `x` of channel `c`, with `f = factor_new`:
//!
//! ```text
//! m_c ← f·x + (1 − f)·m_c
//! d   = x − m_c
//! v_c ← f·d² + (1 − f)·v_c
//! out = d / max(√v_c, eps)
//! ```
//!
//! The first block after construction (or [`Standardizer::reset`]) is
//! z-scored with its own per-channel mean and (population) variance,
//! `out = (x − mean) / max(√var, eps)`, and those statistics become the
//! initial `m_c`, `v_c`.  From the second block on the recursion runs and
//! the state carries over between blocks, trials and files: the output for a
//! block depends on everything that was standardized before it.
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::config::ExtractConfig;

/// Stateful per-channel normalizer over `[C, T]` blocks.
pub trait Standardizer {
    /// Standardize one block, advancing the internal state.
    fn process(&mut self, block: ArrayView2<'_, f64>) -> Array2<f64>;

    /// Forget all state; the next block re-seeds it.
    fn reset(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialStandardizer {
    factor_new: f64,
    eps: f64,
    /// `(mean, var)` per channel once seeded.
    state: Option<(Array1<f64>, Array1<f64>)>,
}

impl ExponentialStandardizer {
    pub fn new(factor_new: f64, eps: f64) -> Self {
        Self { factor_new, eps, state: None }
    }

    pub fn from_config(cfg: &ExtractConfig) -> Self {
        Self::new(cfg.standardize_factor_new, cfg.standardize_eps)
    }

    pub fn is_seeded(&self) -> bool {
        self.state.is_some()
    }

    /// Current running mean per channel, if seeded.
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.state.as_ref().map(|(m, _)| m)
    }

    /// Current running variance per channel, if seeded.
    pub fn variance(&self) -> Option<&Array1<f64>> {
        self.state.as_ref().map(|(_, v)| v)
    }
}

impl Default for ExponentialStandardizer {
    fn default() -> Self {
        Self::new(1e-3, 1e-4)
    }
}

impl Standardizer for ExponentialStandardizer {
    fn process(&mut self, block: ArrayView2<'_, f64>) -> Array2<f64> {
        let n_ch = block.nrows();
        let mut out = Array2::<f64>::zeros(block.raw_dim());
        if block.ncols() == 0 {
            return out;
        }

        let reseed = match &self.state {
            Some((m, _)) => m.len() != n_ch,
            None => true,
        };
        if reseed {
            let mean = block.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(n_ch));
            let var = block.var_axis(Axis(1), 0.0);
            for c in 0..n_ch {
                let scale = var[c].sqrt().max(self.eps);
                for (t, &x) in block.row(c).iter().enumerate() {
                    out[[c, t]] = (x - mean[c]) / scale;
                }
            }
            self.state = Some((mean, var));
            return out;
        }
        let Some((mean, var)) = self.state.as_mut() else {
            return out;
        };

        let f = self.factor_new;
        for c in 0..n_ch {
            let (mut m, mut v) = (mean[c], var[c]);
            for (t, &x) in block.row(c).iter().enumerate() {
                m = f * x + (1.0 - f) * m;
                let d = x - m;
                v = f * d * d + (1.0 - f) * v;
                out[[c, t]] = d / v.sqrt().max(self.eps);
            }
            mean[c] = m;
            var[c] = v;
        }
        out
    }

    fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn first_block_is_plain_zscore() {
        let mut st = ExponentialStandardizer::default();
        let out = st.process(array![[1.0, 3.0, 1.0, 3.0], [5.0, 5.0, 5.0, 5.0]].view());
        let expected = array![[-1.0, 1.0, -1.0, 1.0], [0.0, 0.0, 0.0, 0.0]];
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(st.mean().unwrap()[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.variance().unwrap()[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn second_block_follows_recursion() {
        let mut st = ExponentialStandardizer::new(0.5, 1e-4);
        let _ = st.process(array![[2.0, 0.0]].view());
        let out = st.process(array![[2.0]].view());
        // state m = 1, v = 1; x = 2: m = 1.5, d = 0.5, v = 0.5·0.25 + 0.5·1 = 0.625
        assert_abs_diff_eq!(out[[0, 0]], 0.5 / 0.625_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(st.mean().unwrap()[0], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn constant_signal_uses_eps_floor() {
        let mut st = ExponentialStandardizer::default();
        let out = st.process(Array2::from_elem((2, 50), 4.0).view());
        assert!(out.iter().all(|v| v.is_finite() && v.abs() < 1e-9));
    }

    #[test]
    fn state_carries_over_and_reset_clears_it() {
        let a = Array2::from_shape_fn((3, 400), |(c, t)| (c as f64 + 1.0) * (t as f64 * 0.1).sin());
        let b = Array2::from_shape_fn((3, 400), |(c, t)| 5.0 + (c as f64) * (t as f64 * 0.3).cos());

        let mut fresh = ExponentialStandardizer::default();
        let b_alone = fresh.process(b.view());

        let mut warm = ExponentialStandardizer::default();
        let _ = warm.process(a.view());
        let b_after_a = warm.process(b.view());
        assert!((&b_alone - &b_after_a).iter().any(|d| d.abs() > 1e-3));

        warm.reset();
        assert!(!warm.is_seeded());
        assert_eq!(warm.process(b.view()), b_alone);
    }

    #[test]
    fn channels_are_independent() {
        let block = Array2::from_shape_fn((2, 200), |(c, t)| if c == 0 { t as f64 } else { 1e6 });
        let mut both = ExponentialStandardizer::default();
        let out = both.process(block.view());

        let mut single = ExponentialStandardizer::default();
        let row0 = single.process(block.slice(ndarray::s![0..1, ..]));
        assert_eq!(out.row(0), row0.row(0));
    }
}
