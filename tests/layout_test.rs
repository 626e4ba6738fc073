use convbench::tensor::layout::{pad_nchw, to_nchw, to_nhwc, to_nhwc_padded};
use convbench::tensor::Tensor;
use convbench::ConvError;
use proptest::prelude::*;

fn iota(dims: &[usize]) -> Tensor {
    let len: usize = dims.iter().product();
    Tensor::from_vec(dims, (0..len).map(|v| v as f32 * 0.5 - 3.0).collect()).unwrap()
}

#[test]
fn test_nhwc_moves_channel_last() {
    let t = iota(&[2, 3, 4, 5]);
    let nhwc = to_nhwc(&t).unwrap();
    assert_eq!(nhwc.dims(), &[2, 4, 5, 3]);
    for n in 0..2 {
        for c in 0..3 {
            for h in 0..4 {
                for w in 0..5 {
                    assert_eq!(t.get(&[n, c, h, w]), nhwc.get(&[n, h, w, c]));
                }
            }
        }
    }
}

#[test]
fn test_weights_convert_to_fkkc() {
    let w = iota(&[4, 2, 3, 3]);
    let khwc = to_nhwc(&w).unwrap();
    assert_eq!(khwc.dims(), &[4, 3, 3, 2]);
    assert_eq!(w.get(&[3, 1, 2, 0]), khwc.get(&[3, 2, 0, 1]));
}

#[test]
fn test_padded_nhwc_has_zero_border() {
    let t = Tensor::filled(&[1, 2, 3, 3], 1.0).unwrap();
    let p = to_nhwc_padded(&t, 1).unwrap();
    assert_eq!(p.dims(), &[1, 5, 5, 2]);
    assert_eq!(p.get(&[0, 0, 0, 0]), 0.0);
    assert_eq!(p.get(&[0, 4, 2, 1]), 0.0);
    assert_eq!(p.get(&[0, 1, 1, 0]), 1.0);
    assert_eq!(p.get(&[0, 3, 3, 1]), 1.0);
    assert_eq!(p.sum_of_squares(), t.sum_of_squares());
}

#[test]
fn test_pad_nchw_border_and_interior() {
    let t = iota(&[1, 2, 2, 3]);
    let p = pad_nchw(&t, 1).unwrap();
    assert_eq!(p.dims(), &[1, 2, 4, 5]);
    assert_eq!(p.get(&[0, 1, 0, 0]), 0.0);
    assert_eq!(p.get(&[0, 1, 2, 3]), t.get(&[0, 1, 1, 2]));
    assert_eq!(pad_nchw(&t, 0).unwrap(), t);
}

#[test]
fn test_conversion_rejects_non_4d() {
    let t = iota(&[2, 3, 4]);
    assert!(matches!(to_nhwc(&t), Err(ConvError::RankMismatch { expected: 3, got: 4 })));
    assert!(to_nchw(&t).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_round_trip_is_identity(
        n in 1usize..3, c in 1usize..5, h in 1usize..6, w in 1usize..6, seed in 0u32..1000,
    ) {
        let len = n * c * h * w;
        let data: Vec<f32> = (0..len).map(|i| ((i as u32 * 31 + seed) % 97) as f32 - 48.0).collect();
        let t = Tensor::from_vec(&[n, c, h, w], data).unwrap();
        let nhwc = to_nhwc(&t).unwrap();
        prop_assert_eq!(nhwc.sum_of_squares(), t.sum_of_squares());
        let back = to_nchw(&nhwc).unwrap();
        prop_assert_eq!(back, t);
    }
}
