//! Filter descriptor and weight blob readers, plus seeded input synthesis.
mod descriptor;
mod blob;
mod synth;

pub use descriptor::{parse_descriptor, FilterShape};
pub use blob::WeightReader;
pub use synth::{synth_input, synth_weights, DEFAULT_SEED};
