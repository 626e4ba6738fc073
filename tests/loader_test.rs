use std::fs::File;
use std::io::{Cursor, Write};

use convbench::loader::{parse_descriptor, synth_input, synth_weights, FilterShape, WeightReader};
use convbench::ConvError;
use flate2::write::GzEncoder;
use flate2::Compression;

fn le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn shape(f: usize, c: usize, k: usize) -> FilterShape {
    FilterShape {
        out_channels: f,
        in_channels: c,
        kernel_h: k,
        kernel_w: k,
    }
}

#[test]
fn test_parse_descriptor() {
    let text = "2\n64 64 3 3\n128 64 3 3\n";
    let shapes = parse_descriptor(Cursor::new(text)).unwrap();
    assert_eq!(shapes, vec![shape(64, 64, 3), shape(128, 64, 3)]);
    assert_eq!(shapes[1].len(), 128 * 64 * 9);
    assert_eq!(shapes[1].to_string(), "128x64x3x3");
}

#[test]
fn test_parse_descriptor_ignores_line_breaks() {
    let shapes = parse_descriptor(Cursor::new("1 16\n3\n5 5   \n\n")).unwrap();
    assert_eq!(shapes, vec![shape(16, 3, 5)]);
    assert!(parse_descriptor(Cursor::new("0\n")).unwrap().is_empty());
}

#[test]
fn test_parse_descriptor_errors() {
    for text in ["", "2\n64 64 3 3\n", "1\n64 x 3 3\n", "1\n64 64 0 3\n", "-1\n"] {
        let err = parse_descriptor(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, ConvError::Descriptor(_)), "{:?}: {}", text, err);
    }
}

#[test]
fn test_read_cases_in_sequence() {
    let a: Vec<f32> = (0..2 * 1 * 3 * 3).map(|v| v as f32).collect();
    let b: Vec<f32> = (0..1 * 2 * 1 * 1).map(|v| -(v as f32)).collect();
    let mut blob = le_bytes(&a);
    blob.extend(le_bytes(&b));

    let mut reader = WeightReader::new(Cursor::new(blob));
    let first = reader.read_case(&shape(2, 1, 3)).unwrap();
    assert_eq!(first.dims(), &[2, 1, 3, 3]);
    assert_eq!(first.data(), &a[..]);
    let second = reader.read_case(&shape(1, 2, 1)).unwrap();
    assert_eq!(second.get(&[0, 1, 0, 0]), -1.0);
    assert_eq!(reader.consumed(), a.len() + b.len());
}

#[test]
fn test_truncated_blob() {
    let blob = le_bytes(&[1.0, 2.0, 3.0]);
    let mut reader = WeightReader::new(Cursor::new(blob));
    let err = reader.read_case(&shape(1, 1, 3)).unwrap_err();
    assert!(matches!(err, ConvError::Truncated { expected: 9, got: 3 }));
}

#[test]
fn test_open_plain_and_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let weights = synth_weights(4 * 2 * 3 * 3, 9);
    let bytes = le_bytes(&weights);

    let plain = dir.path().join("dat.bin");
    File::create(&plain).unwrap().write_all(&bytes).unwrap();

    let gz = dir.path().join("dat.bin.gz");
    let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
    enc.write_all(&bytes).unwrap();
    enc.finish().unwrap();

    for path in [&plain, &gz] {
        let mut reader = WeightReader::open(path).unwrap();
        let t = reader.read_case(&shape(4, 2, 3)).unwrap();
        assert_eq!(t.data(), &weights[..], "{}", path.display());
    }
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = WeightReader::open(dir.path().join("missing.bin")).err().unwrap();
    assert!(matches!(err, ConvError::Io(_)));
}

#[test]
fn test_synth_is_deterministic() {
    let a = synth_input(1000, 0);
    assert_eq!(a, synth_input(1000, 0));
    assert_ne!(a, synth_input(1000, 1));
    assert!(a.iter().all(|&v| (0.0..=214.0).contains(&v) && v.fract() == 0.0));
    assert!(a.iter().any(|&v| v > 100.0));

    let w = synth_weights(1000, 0);
    assert!(w.iter().all(|&v| (-1.0..1.0).contains(&v)));
    assert_eq!(&synth_input(10, 4)[..], &synth_input(20, 4)[..10]);
}

#[test]
fn test_parse_descriptor_rejects_overflowing_case() {
    let err = parse_descriptor(Cursor::new("1\n100000 100000 100000 100000\n")).unwrap_err();
    assert!(matches!(err, ConvError::Descriptor(_)), "{}", err);
    let huge = shape(usize::MAX, 2, 1);
    assert_eq!(huge.checked_len(), None);
    assert!(!huge.is_empty());
}

#[test]
fn test_short_stream_reports_what_arrived() {
    // declares 10^8 floats, supplies one
    let mut reader = WeightReader::new(Cursor::new(le_bytes(&[0.5])));
    let err = reader.read_case(&shape(100_000, 1000, 1)).unwrap_err();
    assert!(matches!(err, ConvError::Truncated { expected: 100_000_000, got: 1 }));

    let mut reader = WeightReader::new(Cursor::new(Vec::new()));
    let err = reader.read_case(&shape(usize::MAX, 2, 1)).unwrap_err();
    assert!(matches!(err, ConvError::Descriptor(_)));
    assert_eq!(reader.consumed(), 0);
}
