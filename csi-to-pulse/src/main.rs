//! # CSI to Pulse
//!
//! The CSI to Pulse component performs the following functions:
//! * Reads lines of Channel State Information from a serial device, a file, or standard input.
//! * Validates and decodes each line, logging malformed lines to a diagnostic file.
//! * Stores every accepted record, unmodified, in a CSV file.
//! * Converts each record's samples to subcarrier amplitudes and conditions them with
//!   two zero-phase band-pass filters and a Savitzky-Golay smoother.
//! * In `predict` mode, feeds a sliding window of conditioned vectors to an estimator and logs each prediction.
//! * In `collect` mode, appends each conditioned vector to a training data file.
//!
mod amplitude;
mod buffer;
mod conditioning;
mod estimator;
mod frame;
mod parameters;
mod pipeline;
mod sinks;
mod source;

use buffer::{GainHistory, WindowBuffer};
use clap::Parser;
use conditioning::Conditioner;
use csi_pulse_common::{
    init_tracing,
    metrics::{
        component_info_metric,
        names::{
            FAILURES, FRAMES_ACCEPTED, LAST_AGC_GAIN, LAST_FFT_GAIN, LAST_PREDICTION,
            LINES_RECEIVED, WINDOWS_EMITTED,
        },
    },
};
use estimator::LinearEstimator;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use parameters::{ConditioningParameters, Mode};
use pipeline::{Consumer, Pipeline};
use sinks::{DiagnosticSink, RecordSink, TrainingSink};
use source::{LineSource, ReaderSource, open_serial};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

type BoxedWriter = Box<dyn Write>;

/// [clap] derived struct to handle command line parameters.
#[derive(Debug, Parser)]
#[clap(author, version = csi_pulse_common::version!(), about)]
struct Cli {
    /// Serial port the CSI device is attached to.
    #[clap(long, short = 'p', env, conflicts_with = "input_file")]
    serial_port: Option<String>,

    /// Baud rate of the serial port.
    #[clap(long, default_value = "921600")]
    baud_rate: u32,

    /// Interval after which a quiet serial port is polled again, in milliseconds.
    #[clap(long, default_value = "60000")]
    serial_timeout_ms: u64,

    /// File to read CSI lines from. If neither this nor a serial port is given, standard input is read.
    #[clap(long, short = 'i')]
    input_file: Option<PathBuf>,

    /// CSV file every accepted record is written to.
    #[clap(long, short = 's', default_value = "./csi_data.csv")]
    store_file: PathBuf,

    /// Text file rejected lines are written to.
    #[clap(long, short = 'l', default_value = "./csi_data_log.txt")]
    log_file: PathBuf,

    /// Number of recent frames whose receiver gains are retained.
    #[clap(long, default_value = "200")]
    gain_history_length: usize,

    #[clap(flatten)]
    conditioning: ConditioningParameters,

    /// Log filter used when `RUST_LOG` is not set.
    #[clap(long, default_value = "info")]
    log_level: String,

    /// If set, OpenMetrics flavour metrics are served on this endpoint.
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,

    #[command(subcommand)]
    mode: Mode,
}

fn create_writer(path: &Path) -> miette::Result<BoxedWriter> {
    let file = File::create(path).into_diagnostic()?;
    Ok(Box::new(BufWriter::new(file)))
}

fn main() -> miette::Result<()> {
    let args = Cli::parse();

    init_tracing(&args.log_level).into_diagnostic()?;

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()
            .into_diagnostic()?;
    }
    describe_metrics();
    component_info_metric("csi-to-pulse");

    let conditioner = Conditioner::new(&args.conditioning).into_diagnostic()?;

    let consumer = match &args.mode {
        Mode::Predict(predict) => {
            let window = WindowBuffer::new(
                predict.window.window_length,
                predict.window.subcarriers,
            )
            .into_diagnostic()?;
            let estimator = LinearEstimator::from_file(
                &predict.weights,
                predict.window.window_length,
                predict.window.subcarriers,
            )
            .into_diagnostic()?;
            Consumer::Predict { window, estimator }
        }
        Mode::Collect(collect) => {
            Consumer::Collect(TrainingSink::new(create_writer(&collect.output)?))
        }
    };

    let mut pipeline = Pipeline::new(
        conditioner,
        consumer,
        RecordSink::new(create_writer(&args.store_file)?),
        DiagnosticSink::new(create_writer(&args.log_file)?),
        GainHistory::new(args.gain_history_length),
    );

    let mut source: Box<dyn LineSource> = match (&args.serial_port, &args.input_file) {
        (Some(port), _) => Box::new(
            open_serial(
                port,
                args.baud_rate,
                Duration::from_millis(args.serial_timeout_ms),
            )
            .into_diagnostic()?,
        ),
        (None, Some(path)) => Box::new(ReaderSource::new(BufReader::new(
            File::open(path).into_diagnostic()?,
        ))),
        (None, None) => {
            info!("Reading CSI lines from standard input");
            Box::new(ReaderSource::new(std::io::stdin().lock()))
        }
    };

    pipeline.run(source.as_mut()).into_diagnostic()
}

fn describe_metrics() {
    describe_counter!(
        LINES_RECEIVED,
        metrics::Unit::Count,
        "Number of lines read from the source"
    );
    describe_counter!(
        FRAMES_ACCEPTED,
        metrics::Unit::Count,
        "Number of lines decoded into CSI frames"
    );
    describe_counter!(
        FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
    describe_counter!(
        WINDOWS_EMITTED,
        metrics::Unit::Count,
        "Number of full windows handed to the estimator"
    );
    describe_gauge!(LAST_PREDICTION, "Most recent estimator output");
    describe_gauge!(LAST_AGC_GAIN, "AGC gain of the most recent frame");
    describe_gauge!(LAST_FFT_GAIN, "FFT gain of the most recent frame");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_must_be_named() {
        assert!(Cli::try_parse_from(["csi-to-pulse"]).is_err());
        assert!(Cli::try_parse_from(["csi-to-pulse", "predict"]).is_err());

        let cli = Cli::try_parse_from(["csi-to-pulse", "predict", "--weights", "model.json"]).unwrap();
        match cli.mode {
            Mode::Predict(predict) => {
                assert_eq!(predict.weights, PathBuf::from("model.json"));
                assert_eq!(predict.window.window_length, 100);
                assert_eq!(predict.window.subcarriers, 192);
            }
            Mode::Collect(_) => unreachable!("predict was requested"),
        }

        let cli = Cli::try_parse_from(["csi-to-pulse", "-i", "capture.txt", "collect"]).unwrap();
        assert_eq!(cli.input_file, Some(PathBuf::from("capture.txt")));
        assert!(matches!(cli.mode, Mode::Collect(_)));
    }
}
