use std::collections::HashSet;

use convbench::tensor::{Dim, ShapeIndex, Slot};
use convbench::ConvError;
use proptest::prelude::*;

#[test]
fn test_strides_are_row_major() {
    let idx = ShapeIndex::new(&[2, 3, 4, 5]).unwrap();
    assert_eq!(idx.strides(), &[60, 20, 5, 1]);
    assert_eq!(idx.total_size(), 120);
    assert_eq!(idx.rank(), 4);
    assert_eq!(idx.flat_index(&[1, 2, 3, 4]), 60 + 40 + 15 + 4);
}

#[test]
fn test_six_dim_scratch_index() {
    let idx = ShapeIndex::new(&[2, 4, 4, 3, 3, 3]).unwrap();
    assert_eq!(idx.stride(5), 1);
    assert_eq!(idx.stride(3), 9);
    assert_eq!(idx.stride(0), 4 * 4 * 27);
    assert_eq!(idx.total_size(), 2 * 4 * 4 * 27);
}

#[test]
fn test_distinct_coords_give_distinct_offsets() {
    let idx = ShapeIndex::new(&[2, 3, 4]).unwrap();
    let mut seen = HashSet::new();
    for a in 0..2 {
        for b in 0..3 {
            for c in 0..4 {
                assert!(seen.insert(idx.flat_index(&[a, b, c])));
            }
        }
    }
    assert_eq!(seen.len(), idx.total_size());
    assert_eq!(seen.iter().max(), Some(&(idx.total_size() - 1)));
}

#[test]
fn test_unpack_skips_wildcard_slots() {
    let idx = ShapeIndex::new(&[64, 3, 3, 3]).unwrap();
    let (mut f, mut k) = (0, 0);
    idx.unpack(&mut [Slot::Into(&mut f), Slot::Skip, Slot::Into(&mut k), Slot::Skip])
        .unwrap();
    assert_eq!((f, k), (64, 3));
}

#[test]
fn test_unpack_rejects_wrong_slot_count() {
    let idx = ShapeIndex::new(&[2, 2]).unwrap();
    let mut a = 0;
    let err = idx.unpack(&mut [Slot::Into(&mut a)]).unwrap_err();
    assert!(matches!(err, ConvError::RankMismatch { expected: 2, got: 1 }));
}

#[test]
fn test_validate_with_wildcards() {
    let idx = ShapeIndex::new(&[64, 3, 3, 3]).unwrap();
    assert!(idx.validate(&[Dim::Any, Dim::Is(3), Dim::Is(3), Dim::Is(3)]));
    assert!(idx.validate(&[Dim::Any, Dim::Any, Dim::Any, Dim::Any]));
    assert!(!idx.validate(&[Dim::Any, Dim::Is(4), Dim::Is(3), Dim::Is(3)]));
    assert!(!idx.validate(&[Dim::Any, Dim::Is(3), Dim::Is(3)]));
    assert!(idx.validate(&[64.into(), Dim::Any, 3.into(), Dim::Any]));
}

#[test]
fn test_rejects_empty_and_zero_shapes() {
    assert!(matches!(ShapeIndex::new(&[]), Err(ConvError::InvalidShape(_))));
    assert!(matches!(ShapeIndex::new(&[2, 0, 3]), Err(ConvError::InvalidShape(_))));
}

#[test]
fn test_display_joins_extents() {
    let idx = ShapeIndex::new(&[1, 64, 56, 56]).unwrap();
    assert_eq!(idx.to_string(), "1x64x56x56");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_coords_round_trip(dims in prop::collection::vec(1usize..6, 1..6)) {
        let idx = ShapeIndex::new(&dims).unwrap();
        for offset in 0..idx.total_size() {
            let coords = idx.coords_of(offset);
            prop_assert_eq!(idx.flat_index(&coords), offset);
        }
    }

    #[test]
    fn test_unpacked_extents_reach_last_offset(dims in prop::collection::vec(1usize..8, 1..6)) {
        let idx = ShapeIndex::new(&dims).unwrap();
        let mut extents = vec![0usize; dims.len()];
        {
            let mut slots: Vec<Slot> = extents.iter_mut().map(Slot::Into).collect();
            idx.unpack(&mut slots).unwrap();
        }
        prop_assert_eq!(&extents, &dims);
        let last: Vec<usize> = extents.iter().map(|e| e - 1).collect();
        prop_assert_eq!(idx.flat_index(&last), idx.total_size() - 1);
        for i in 0..dims.len() - 1 {
            prop_assert_eq!(idx.stride(i), idx.stride(i + 1) * idx.extent(i + 1));
        }
    }
}

#[test]
fn test_rejects_overflowing_shapes() {
    let huge = 1usize << (usize::BITS / 2 + 1);
    assert!(matches!(ShapeIndex::new(&[huge, huge, huge]), Err(ConvError::InvalidShape(_))));
    assert!(matches!(ShapeIndex::new(&[2, usize::MAX]), Err(ConvError::InvalidShape(_))));
    assert!(ShapeIndex::new(&[1, usize::MAX]).is_ok());
}
