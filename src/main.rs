//! convbench CLI: times every convolution variant on each filter case of a
//! descriptor/weight blob pair and prints one CSV record per call.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::info;

use convbench::conv::{DirectTile, Padding};
use convbench::loader::{parse_descriptor, synth_input, WeightReader, DEFAULT_SEED};
use convbench::metrics::{run_case, BenchConfig, MonotonicClock};
use convbench::trace_init::init_tracing;
use convbench::Result;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PaddingArg {
    /// Zero border materialized once before im2col
    Prepad,
    /// Bounds check per tap, no materialized border
    Inline,
    /// No padding, output cropped by K-1
    Valid,
}

impl From<PaddingArg> for Padding {
    fn from(p: PaddingArg) -> Self {
        match p {
            PaddingArg::Prepad => Padding::PrePadded,
            PaddingArg::Inline => Padding::Inline,
            PaddingArg::Valid => Padding::Valid,
        }
    }
}

#[derive(Parser)]
#[command(name = "convbench")]
#[command(about = "Compare direct, im2col+GEMM and CSR sparse GEMM convolution on the CPU")]
#[command(version)]
struct Cli {
    /// Filter descriptor: case count, then `Cout Cin Kh Kw` per case
    #[arg(long, default_value = "fmt.txt")]
    descriptor: PathBuf,

    /// Little-endian f32 weight blob (gzip if it ends in .gz)
    #[arg(long, default_value = "dat.bin")]
    weights: PathBuf,

    /// Batch size
    #[arg(short = 'n', long, default_value_t = 10)]
    batch: usize,

    /// Spatial size is budget / Cout unless --spatial is given
    #[arg(long, default_value_t = 64 * 256)]
    spatial_budget: usize,

    /// Fixed square spatial size for every case
    #[arg(long)]
    spatial: Option<usize>,

    /// Timed calls per variant
    #[arg(short, long, default_value_t = 1)]
    repeat: usize,

    /// Pruning percentiles for the sparse variant, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = vec![35.0f32, 50.0, 65.0, 80.0, 95.0])]
    percentiles: Vec<f32>,

    /// Border handling for every variant
    #[arg(long, value_enum, default_value = "prepad")]
    padding: PaddingArg,

    /// Direct loop tile height (output rows)
    #[arg(long, default_value_t = 2)]
    tile_rows: usize,

    /// Direct loop tile width (output cols)
    #[arg(long, default_value_t = 10)]
    tile_cols: usize,

    /// Seed of the synthesized input
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

impl Cli {
    fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            batch: self.batch,
            spatial_budget: self.spatial_budget,
            spatial: self.spatial,
            repeat: self.repeat,
            percentiles: self.percentiles.clone(),
            padding: self.padding.into(),
            tile: DirectTile {
                rows: self.tile_rows,
                cols: self.tile_cols,
            },
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.bench_config();
    let shapes = parse_descriptor(BufReader::new(File::open(&cli.descriptor)?))?;
    info!(cases = shapes.len(), descriptor = %cli.descriptor.display(), "loaded descriptor");

    let pool = synth_input(config.input_len(&shapes), cli.seed);
    let mut weights = WeightReader::open(&cli.weights)?;
    let clock = MonotonicClock::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for shape in &shapes {
        let weight = weights.read_case(shape)?;
        run_case(shape, &weight, &pool, &config, &clock, &mut out)?;
        out.flush()?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing("info");
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
