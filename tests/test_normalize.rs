use approx::assert_abs_diff_eq;
use ndarray::{s, Array2};
use std::f64::consts::PI;
use xdfepoch::{ExponentialStandardizer, Standardizer};

/// Standardize `data` in consecutive blocks of `block` columns.
fn run_blocks(st: &mut dyn Standardizer, data: &Array2<f64>, block: usize) -> Array2<f64> {
    let mut out = Array2::zeros(data.raw_dim());
    let mut t = 0;
    while t < data.ncols() {
        let end = (t + block).min(data.ncols());
        let y = st.process(data.slice(s![.., t..end]));
        out.slice_mut(s![.., t..end]).assign(&y);
        t = end;
    }
    out
}

fn rhythm(n: usize, offset: f64, amp: f64) -> Array2<f64> {
    Array2::from_shape_fn((2, n), |(c, t)| offset + amp * (2.0 * PI * t as f64 / (50.0 + 10.0 * c as f64)).sin())
}

#[test]
fn converges_to_zero_mean_unit_variance() {
    let data = rhythm(20_000, 3.0, 2.0);
    let out = run_blocks(&mut ExponentialStandardizer::default(), &data, 20);
    for c in 0..2 {
        let tail = out.slice(s![c, 15_000..]);
        let mean = tail.mean().unwrap();
        let std = tail.std(0.0);
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.05);
        assert_abs_diff_eq!(std, 1.0, epsilon = 0.05);
    }
}

#[test]
fn invariant_to_offset_and_scale() {
    let base = rhythm(4_000, 0.0, 1.0);
    let moved = rhythm(4_000, 100.0, 10.0);
    let a = run_blocks(&mut ExponentialStandardizer::default(), &base, 20);
    let b = run_blocks(&mut ExponentialStandardizer::default(), &moved, 20);
    for (x, y) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-8);
    }
}

#[test]
fn block_size_does_not_matter_after_seeding() {
    let data = rhythm(2_000, 1.0, 1.0);
    // Same seed block, different splits afterwards.
    let mut a = ExponentialStandardizer::default();
    let mut b = ExponentialStandardizer::default();
    let seed_a = a.process(data.slice(s![.., ..20]));
    let seed_b = b.process(data.slice(s![.., ..20]));
    assert_eq!(seed_a, seed_b);

    let rest = data.slice(s![.., 20..]).to_owned();
    let ya = run_blocks(&mut a, &rest, 20);
    let yb = run_blocks(&mut b, &rest, 333);
    assert_eq!(ya, yb);
}

#[test]
fn channel_count_change_reseeds() {
    let mut st = ExponentialStandardizer::default();
    let _ = st.process(rhythm(100, 0.0, 1.0).view());
    let wide = Array2::from_shape_fn((4, 100), |(c, t)| c as f64 + t as f64 * 0.01);
    let out = st.process(wide.view());
    assert_eq!(out.dim(), (4, 100));
    assert_eq!(st.mean().unwrap().len(), 4);
}

#[test]
fn first_block_has_zero_mean_unit_std() {
    let data = rhythm(400, 7.0, 3.0);
    let out = ExponentialStandardizer::default().process(data.view());
    for row in out.rows() {
        assert_abs_diff_eq!(row.mean().unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(row.std(0.0), 1.0, epsilon = 1e-12);
    }
}
