use convbench::tensor::{Dim, Tensor};
use convbench::ConvError;

#[test]
fn tensor_get_set() {
    let mut t = Tensor::zeros(&[1, 2, 3, 4]).unwrap();
    t.set(&[0, 1, 2, 3], 42.0);
    assert_eq!(t.get(&[0, 1, 2, 3]), 42.0);
    assert_eq!(t.data()[t.len() - 1], 42.0);
}

#[test]
fn tensor_fill() {
    let mut t = Tensor::zeros(&[1, 1, 2, 2]).unwrap();
    t.fill(7.0);
    assert_eq!(t.get(&[0, 0, 0, 0]), 7.0);
    assert_eq!(t.get(&[0, 0, 1, 1]), 7.0);
}

#[test]
fn tensor_clone_owns_its_buffer() {
    let mut t = Tensor::filled(&[2, 2], 1.0).unwrap();
    let copy = t.clone();
    t.set(&[0, 0], 99.0);
    assert_eq!(copy.get(&[0, 0]), 1.0);
}

#[test]
fn tensor_from_vec_checks_length() {
    let t = Tensor::from_vec(&[2, 3], vec![0.0; 6]).unwrap();
    assert_eq!(t.dims(), &[2, 3]);
    let err = Tensor::from_vec(&[2, 3], vec![0.0; 5]).unwrap_err();
    assert!(matches!(err, ConvError::ShapeMismatch(_)));
}

#[test]
fn tensor_from_prefix_copies_leading_elements() {
    let pool: Vec<f32> = (0..10).map(|v| v as f32).collect();
    let t = Tensor::from_prefix(&[1, 1, 2, 3], &pool).unwrap();
    assert_eq!(t.data(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(Tensor::from_prefix(&[1, 1, 4, 4], &pool).is_err());
}

#[test]
fn tensor_reshape_keeps_data() {
    let t = Tensor::from_vec(&[2, 3], (0..6).map(|v| v as f32).collect()).unwrap();
    let r = t.reshape(&[3, 2]).unwrap();
    assert_eq!(r.get(&[2, 1]), 5.0);
    assert!(r.clone().reshape(&[4, 2]).is_err());
}

#[test]
fn tensor_validate_and_checksum() {
    let t = Tensor::from_vec(&[1, 2, 1, 2], vec![1.0, -2.0, 3.0, 0.5]).unwrap();
    assert!(t.validate(&[Dim::Is(1), Dim::Any, Dim::Is(1), Dim::Is(2)]));
    assert_eq!(t.sum_of_squares(), 1.0 + 4.0 + 9.0 + 0.25);
    assert_eq!(t.to_string(), "1x2x1x2");
}

#[test]
fn tensor_rejects_zero_extent() {
    assert!(matches!(Tensor::zeros(&[1, 0, 2, 2]), Err(ConvError::InvalidShape(_))));
}
