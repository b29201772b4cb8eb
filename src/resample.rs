//! Decimation by block averaging.
//!
//! With factor `k`, output sample `j` is the mean of input samples
//! `[j·k, (j + 1)·k)`; a trailing partial block is discarded:
//!
//! ```text
//! in   x0 x1 … x19 | x20 … x39 | … | x380 … x399
//! out      y0      |    y1     | … |     y19            (k = 20, 400 → 20)
//! ```
//!
//! The low-pass in front of it is what keeps this alias-free; the average
//! itself is only a crude boxcar.
use ndarray::{s, Array2, ArrayView2, Axis};

/// Number of output samples for `n` input samples: `floor(n / factor)`.
pub fn output_len(n: usize, factor: usize) -> usize {
    if factor == 0 {
        0
    } else {
        n / factor
    }
}

/// Block-average every channel of `data` (`[C, T]`) by `factor`.
///
/// `factor == 1` returns a copy.  Panics if `factor == 0`.
pub fn block_average(data: ArrayView2<'_, f64>, factor: usize) -> Array2<f64> {
    assert!(factor > 0, "decimation factor must be positive");
    let n_ch = data.nrows();
    let n_out = output_len(data.ncols(), factor);

    let mut out = Array2::<f64>::zeros((n_ch, n_out));
    for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
        let block = data.slice(s![.., j * factor..(j + 1) * factor]);
        // `mean_axis` is None only for an empty axis, which `factor > 0` rules out.
        if let Some(m) = block.mean_axis(Axis(1)) {
            col.assign(&m);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn chunk_of_400_gives_20() {
        let data = Array2::<f64>::zeros((64, 400));
        assert_eq!(block_average(data.view(), 20).dim(), (64, 20));
    }

    #[test]
    fn partial_block_dropped() {
        let data = array![[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]];
        let out = block_average(data.view(), 3);
        assert_eq!(out, array![[2.0, 5.0]]);
        assert_eq!(output_len(7, 3), 2);
        assert_eq!(output_len(2, 3), 0);
    }

    #[test]
    fn factor_one_is_identity() {
        let data = array![[1.0, -1.0], [0.5, 0.25]];
        assert_eq!(block_average(data.view(), 1), data);
    }

    #[test]
    fn preserves_dc() {
        let data = Array2::from_elem((3, 400), 3.14);
        for &v in block_average(data.view(), 20).iter() {
            assert_abs_diff_eq!(v, 3.14, epsilon = 1e-12);
        }
    }

    #[test]
    fn ramp_averages_to_block_centres() {
        let data = Array2::from_shape_fn((1, 100), |(_, t)| t as f64);
        let out = block_average(data.view(), 10);
        for (j, &v) in out.row(0).iter().enumerate() {
            assert_abs_diff_eq!(v, j as f64 * 10.0 + 4.5, epsilon = 1e-12);
        }
    }
}
