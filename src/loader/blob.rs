use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use super::FilterShape;
use crate::error::{ConvError, Result};
use crate::tensor::Tensor;

/// Sequential reader of little-endian f32 weights, one case after another.
///
/// Each case contributes `Cout*Cin*Kh*Kw` floats in row-major
/// `(Cout, Cin, Kh, Kw)` order. There is no seeking.
pub struct WeightReader<R: Read> {
    reader: R,
    consumed: usize,
}

impl WeightReader<Box<dyn Read>> {
    /// Opens a weight blob, gunzipping it when the path ends in `.gz`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let gz = path.extension().map(|e| e == "gz").unwrap_or(false);
        debug!(path = %path.display(), gz, "opening weight blob");
        let reader: Box<dyn Read> = if gz {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(WeightReader::new(reader))
    }
}

impl<R: Read> WeightReader<R> {
    pub fn new(reader: R) -> Self {
        WeightReader { reader, consumed: 0 }
    }

    /// Floats read so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Reads the next case's weights as an `(Cout, Cin, Kh, Kw)` tensor.
    ///
    /// The buffer grows with the data actually read, so a short stream
    /// fails without allocating the whole declared case.
    pub fn read_case(&mut self, shape: &FilterShape) -> Result<Tensor> {
        let too_large = || ConvError::Descriptor(format!("case {} is too large", shape));
        let expected = shape.checked_len().ok_or_else(too_large)?;
        let byte_len = expected.checked_mul(4).ok_or_else(too_large)?;
        let mut bytes = Vec::new();
        (&mut self.reader).take(byte_len as u64).read_to_end(&mut bytes)?;
        if bytes.len() < byte_len {
            return Err(ConvError::Truncated {
                expected,
                got: bytes.len() / 4,
            });
        }
        let data: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        self.consumed += expected;
        Tensor::from_vec(&shape.dims(), data)
    }
}
