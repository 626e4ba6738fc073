mod benchmark;
mod clock;

pub use benchmark::{
    max_relative_error, run_case, square_diff, BenchConfig, CaseReport, ConvRecord, DiffRecord,
    DENSE_TOLERANCE,
};
pub use clock::{millis, Clock, MonotonicClock, StepClock};
