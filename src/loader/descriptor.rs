use std::fmt;
use std::io::BufRead;

use crate::error::{ConvError, Result};

/// Filter shape of one benchmark case: `Cout Cin Kh Kw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterShape {
    pub out_channels: usize,
    pub in_channels: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
}

impl FilterShape {
    pub fn dims(&self) -> [usize; 4] {
        [self.out_channels, self.in_channels, self.kernel_h, self.kernel_w]
    }

    /// Number of weights, `Cout * Cin * Kh * Kw`.
    ///
    /// Unchecked; use [`checked_len`](Self::checked_len) for shapes not
    /// produced by [`parse_descriptor`].
    pub fn len(&self) -> usize {
        self.dims().iter().product()
    }

    /// Number of weights, or `None` if it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.dims().iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    pub fn is_empty(&self) -> bool {
        self.dims().contains(&0)
    }
}

impl fmt::Display for FilterShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}x{}",
            self.out_channels, self.in_channels, self.kernel_h, self.kernel_w
        )
    }
}

fn next_int<I: Iterator<Item = String>>(tokens: &mut I, what: &str) -> Result<usize> {
    let tok = tokens
        .next()
        .ok_or_else(|| ConvError::Descriptor(format!("unexpected end of input reading {}", what)))?;
    tok.parse::<usize>()
        .map_err(|_| ConvError::Descriptor(format!("{} is not a non-negative integer: {:?}", what, tok)))
}

/// Parses a case count followed by `count` lines of `Cout Cin Kh Kw`.
///
/// Tokens are whitespace separated; line breaks carry no meaning.
pub fn parse_descriptor<R: BufRead>(reader: R) -> Result<Vec<FilterShape>> {
    let mut words = Vec::new();
    for line in reader.lines() {
        let line = line?;
        words.extend(line.split_whitespace().map(str::to_owned));
    }
    let mut tokens = words.into_iter();

    let count = next_int(&mut tokens, "case count")?;
    let mut shapes = Vec::with_capacity(count);
    for i in 0..count {
        let shape = FilterShape {
            out_channels: next_int(&mut tokens, &format!("case {} Cout", i))?,
            in_channels: next_int(&mut tokens, &format!("case {} Cin", i))?,
            kernel_h: next_int(&mut tokens, &format!("case {} Kh", i))?,
            kernel_w: next_int(&mut tokens, &format!("case {} Kw", i))?,
        };
        if shape.is_empty() {
            return Err(ConvError::Descriptor(format!("case {} has a zero extent: {}", i, shape)));
        }
        // the blob reader needs the byte count too
        if shape.checked_len().and_then(|n| n.checked_mul(4)).is_none() {
            return Err(ConvError::Descriptor(format!("case {} is too large: {}", i, shape)));
        }
        shapes.push(shape);
    }
    Ok(shapes)
}
