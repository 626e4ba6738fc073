use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used by the benchmark driver unless overridden.
pub const DEFAULT_SEED: u64 = 0;

/// Largest synthesized activation value.
const MAX_ACTIVATION: u32 = 214;

/// Deterministic input activations: integer-valued floats in `[0, 214]`.
///
/// Integer values keep partial sums exact for longer, which makes the dense
/// cross-checks tighter. The same `(len, seed)` always yields the same buffer.
pub fn synth_input(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.gen_range(0..=MAX_ACTIVATION) as f32)
        .collect()
}

/// Deterministic weights uniform in `[-1, 1)`, for tests and benches.
pub fn synth_weights(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}
