//! # CSI Simulator
//!
//! Emits synthetic CSI lines, in the format written by the receiving chip, from a JSON description.
//! The output can be piped into the `csi-to-pulse` component to exercise it without hardware.
mod simulation;
mod simulation_elements;

use chrono::Utc;
use clap::Parser;
use csi_pulse_common::init_tracing;
use miette::IntoDiagnostic;
use rand::{SeedableRng, rngs::StdRng};
use simulation::Simulation;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    thread,
    time::Duration,
};
use tracing::info;

/// [clap] derived struct to handle command line parameters.
#[derive(Debug, Parser)]
#[clap(author, version = csi_pulse_common::version!(), about)]
struct Cli {
    /// Path to the JSON file describing the simulation.
    #[clap(long)]
    file: PathBuf,

    /// File to write the lines to. If not set, lines are written to standard output.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Seed of the random number generator. If not set, the clock is used.
    #[clap(long)]
    seed: Option<u64>,

    /// Delay between consecutive lines, in milliseconds.
    #[clap(long, default_value = "0")]
    pace_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[clap(long, default_value = "warn")]
    log_level: String,
}

fn main() -> miette::Result<()> {
    let args = Cli::parse();

    init_tracing(&args.log_level).into_diagnostic()?;

    let simulation: Simulation =
        serde_json::from_reader(File::open(&args.file).into_diagnostic()?).into_diagnostic()?;
    simulation.validate().into_diagnostic()?;

    let seed = args
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_subsec_nanos() as u64);
    info!("Random seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).into_diagnostic()?)),
        None => Box::new(std::io::stdout().lock()),
    };

    let frames = simulation.frames.value().into_diagnostic()?;
    for frame_index in 0..frames {
        let line = simulation
            .generate_line(&mut rng, frame_index)
            .into_diagnostic()?;
        writeln!(output, "{line}").into_diagnostic()?;
        if args.pace_ms > 0 {
            output.flush().into_diagnostic()?;
            thread::sleep(Duration::from_millis(args.pace_ms));
        }
    }
    output.flush().into_diagnostic()?;
    info!("Emitted {frames} lines");
    Ok(())
}
