use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};
use xdfepoch::{block_average, Conditioner, ExtractConfig};

#[test]
fn block_average_drops_partial_tail() {
    let x = array![[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], [0.0, 0.0, 3.0, 3.0, 3.0, 9.0, 100.0]];
    let y = block_average(x.view(), 3);
    assert_eq!(y, array![[2.0, 5.0], [1.0, 5.0]]);
}

#[test]
fn conditioner_lengths_follow_factor() {
    let cfg = ExtractConfig::default();
    let c = Conditioner::new(&cfg, 5000.0).unwrap();
    assert_eq!(c.factor(), 20);
    assert_eq!(c.chunk_output_len(), 20);
    assert_eq!(c.reduced_len(11_000), 540);
    assert_eq!(c.reduced_len(399), 0);
    assert_eq!(c.chunk_bounds(5_000, 6_000), vec![5_000..5_400, 5_400..5_800]);

    let c = Conditioner::new(&ExtractConfig { target_sfreq: 500.0, ..cfg }, 5000.0).unwrap();
    assert_eq!(c.factor(), 10);
    assert_eq!(c.chunk_output_len(), 40);
}

#[test]
fn constant_chunk_passes_unchanged() {
    let c = Conditioner::new(&ExtractConfig::default(), 5000.0).unwrap();
    let chunk = Array2::from_shape_fn((3, 400), |(ch, _)| 10.0 * ch as f64 - 4.0);
    let y = c.filter_chunk(chunk.view());
    assert_eq!(y.dim(), (3, 20));
    for ((ch, _), v) in y.indexed_iter() {
        assert_abs_diff_eq!(*v, 10.0 * ch as f64 - 4.0, epsilon = 1e-8);
    }
}
