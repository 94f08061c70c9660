//! Drives each line through decoding, amplitude extraction, conditioning and windowing.
use crate::{
    amplitude,
    buffer::{GainHistory, WindowBuffer, WindowError, WindowPush, WindowTensor},
    conditioning::Conditioner,
    estimator::{Estimator, EstimatorError},
    frame::{self, Rejection},
    sinks::{DiagnosticSink, RecordSink, SinkError, TrainingSink},
    source::{LineSource, SourceError},
};
use csi_pulse_common::metrics::{
    failures::{self, FailureKind},
    names::{
        FAILURES, FRAMES_ACCEPTED, LAST_AGC_GAIN, LAST_FFT_GAIN, LAST_PREDICTION, LINES_RECEIVED,
        WINDOWS_EMITTED,
    },
};
use metrics::{counter, gauge};
use std::io::Write;
use thiserror::Error;
use tracing::{Span, debug, error, info, instrument, trace};

/// Failures which end the session.
#[derive(Debug, Error)]
pub(crate) enum PipelineError {
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("{0}")]
    Sink(#[from] SinkError),
    #[error("{0}")]
    Window(#[from] WindowError),
    #[error("Estimator failed: {0}")]
    Estimator(#[from] EstimatorError),
}

/// What becomes of the conditioned vectors.
pub(crate) enum Consumer<W: Write, E: Estimator> {
    /// Windowed and handed to the estimator whenever the window is full.
    Predict {
        window: WindowBuffer,
        estimator: E,
    },
    /// Appended to a training file.
    Collect(TrainingSink<W>),
}

/// The result of processing a single line.
#[derive(Debug)]
pub(crate) enum LineOutcome {
    Rejected(Rejection),
    /// The window is still filling; holds `(current_length, capacity)`.
    Progress(usize, usize),
    Prediction(f32),
    Collected,
}

/// Counts accumulated over a session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) lines: usize,
    pub(crate) accepted: usize,
    pub(crate) rejected: usize,
    pub(crate) windows: usize,
}

pub(crate) struct Pipeline<W: Write, E: Estimator> {
    conditioner: Conditioner,
    consumer: Consumer<W, E>,
    records: RecordSink<W>,
    diagnostics: DiagnosticSink<W>,
    gains: GainHistory,
    summary: Summary,
}

impl<W: Write, E: Estimator> Pipeline<W, E> {
    pub(crate) fn new(
        conditioner: Conditioner,
        consumer: Consumer<W, E>,
        records: RecordSink<W>,
        diagnostics: DiagnosticSink<W>,
        gains: GainHistory,
    ) -> Self {
        Self {
            conditioner,
            consumer,
            records,
            diagnostics,
            gains,
            summary: Summary::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn summary(&self) -> &Summary {
        &self.summary
    }

    #[cfg(test)]
    pub(crate) fn gains(&self) -> &GainHistory {
        &self.gains
    }

    /// Processes a single line.
    ///
    /// Malformed lines are logged to the diagnostic sink and reported as [LineOutcome::Rejected].
    /// An error is returned only for failures which should end the session. An estimator
    /// failure leaves the window as it was before the call to the estimator.
    #[instrument(skip_all, level = "debug", fields(schema, rssi), err(level = "error"))]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LineOutcome, PipelineError> {
        counter!(LINES_RECEIVED).increment(1);
        self.summary.lines += 1;

        let frame = match frame::decode(line) {
            Ok(frame) => frame,
            Err(rejection) => {
                counter!(
                    FAILURES,
                    &[failures::get_label(rejection.failure_kind())]
                )
                .increment(1);
                self.summary.rejected += 1;
                self.diagnostics
                    .write(&rejection, line)
                    .inspect_err(|_| sink_failure())?;
                return Ok(LineOutcome::Rejected(rejection));
            }
        };
        counter!(FRAMES_ACCEPTED).increment(1);
        self.summary.accepted += 1;
        Span::current()
            .record("schema", tracing::field::debug(frame.schema()))
            .record("rssi", frame.rssi());
        trace!("Accepted frame of {} samples", frame.declared_length);

        self.records.write(&frame).inspect_err(|_| sink_failure())?;

        if let Some((agc_gain, fft_gain)) = frame.gains() {
            self.gains.push(agc_gain, fft_gain);
            gauge!(LAST_AGC_GAIN).set(f64::from(agc_gain));
            gauge!(LAST_FFT_GAIN).set(f64::from(fft_gain));
        }

        let amplitudes = amplitude::extract(&frame.raw_samples);
        let conditioned = self.conditioner.condition(&amplitudes);

        match &mut self.consumer {
            Consumer::Collect(training) => {
                training
                    .write(&conditioned)
                    .inspect_err(|_| sink_failure())?;
                Ok(LineOutcome::Collected)
            }
            Consumer::Predict { window, estimator } => {
                let push = window.push(conditioned).inspect_err(|e| {
                    error!("{e}");
                    counter!(
                        FAILURES,
                        &[failures::get_label(FailureKind::DimensionMismatch)]
                    )
                    .increment(1);
                })?;
                match push {
                    WindowPush::Progress(length, capacity) => {
                        Ok(LineOutcome::Progress(length, capacity))
                    }
                    WindowPush::Full(tensor) => {
                        self.summary.windows += 1;
                        counter!(WINDOWS_EMITTED).increment(1);
                        Ok(estimate(estimator, &tensor, &self.gains)?)
                    }
                }
            }
        }
    }

    /// Processes lines until the source is exhausted.
    ///
    /// The sinks are flushed whether the session ends normally or with an error.
    pub(crate) fn run<S: LineSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<(), PipelineError> {
        let result = self.read_all(source);
        let flushed = self.flush();
        info!("Session ended: {:?}", self.summary);
        result.and(flushed)
    }

    fn read_all<S: LineSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<(), PipelineError> {
        while let Some(line) = source.next_line()? {
            let outcome = self.process_line(&line)?;
            report(&line, &outcome);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PipelineError> {
        let records = self.records.flush();
        let diagnostics = self.diagnostics.flush();
        let training = match &mut self.consumer {
            Consumer::Collect(training) => training.flush(),
            Consumer::Predict { .. } => Ok(()),
        };
        records.and(diagnostics).and(training)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn into_parts(self) -> (Consumer<W, E>, RecordSink<W>, DiagnosticSink<W>) {
        (self.consumer, self.records, self.diagnostics)
    }
}

fn sink_failure() {
    counter!(
        FAILURES,
        &[failures::get_label(FailureKind::SinkWriteFailed)]
    )
    .increment(1);
}

/// Surfaces the outcome of a line on the console.
fn report(line: &str, outcome: &LineOutcome) {
    match outcome {
        LineOutcome::Rejected(Rejection::NotACsiRecord) => trace!("Not a CSI record: {line}"),
        LineOutcome::Rejected(rejection) => debug!("Rejected line: {rejection}"),
        LineOutcome::Progress(length, capacity) => debug!("Window filling: {length}/{capacity}"),
        LineOutcome::Prediction(prediction) => info!("Prediction: {prediction}"),
        LineOutcome::Collected => trace!("Conditioned vector collected"),
    }
}

/// Calls the estimator on a full window.
///
/// A failure is counted and returned to the caller.
#[instrument(skip_all, level = "debug")]
fn estimate<E: Estimator>(
    estimator: &mut E,
    tensor: &WindowTensor,
    gains: &GainHistory,
) -> Result<LineOutcome, EstimatorError> {
    match estimator.estimate(tensor) {
        Ok(prediction) => {
            gauge!(LAST_PREDICTION).set(f64::from(prediction));
            if let Some((agc_gain, fft_gain)) = gains.mean() {
                debug!("Mean gains over history: agc {agc_gain:.2}, fft {fft_gain:.2}");
            }
            Ok(LineOutcome::Prediction(prediction))
        }
        Err(e) => {
            counter!(
                FAILURES,
                &[failures::get_label(FailureKind::EstimatorFailed)]
            )
            .increment(1);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frame::{schema_a_line, schema_b_line},
        parameters::ConditioningParameters,
        source::ReaderSource,
    };
    use csi_pulse_common::RawSample;

    const SUBCARRIERS: usize = 192;

    /// Records the shape of every window and returns the window's sum.
    #[derive(Default)]
    struct Recorder {
        shapes: Vec<(usize, usize)>,
        tensors: Vec<WindowTensor>,
        fail: bool,
    }

    impl Estimator for Recorder {
        fn estimate(&mut self, window: &WindowTensor) -> Result<f32, EstimatorError> {
            self.shapes.push(window.dim());
            self.tensors.push(window.clone());
            if self.fail {
                Err(EstimatorError::NonFinite)
            } else {
                Ok(window.sum())
            }
        }
    }

    fn pipeline(window_length: usize, estimator: Recorder) -> Pipeline<Vec<u8>, Recorder> {
        Pipeline::new(
            Conditioner::new(&ConditioningParameters::default()).unwrap(),
            Consumer::Predict {
                window: WindowBuffer::new(window_length, SUBCARRIERS).unwrap(),
                estimator,
            },
            RecordSink::new(Vec::new()),
            DiagnosticSink::new(Vec::new()),
            GainHistory::new(200),
        )
    }

    fn constant_samples() -> Vec<RawSample> {
        (0..SUBCARRIERS).flat_map(|_| [3, 4]).collect()
    }

    fn varying_samples(seed: usize) -> Vec<RawSample> {
        (0..SUBCARRIERS)
            .flat_map(|i| {
                let v = ((i * 7 + seed * 13) % 31) as RawSample;
                [v - 15, 20 - v / 2]
            })
            .collect()
    }

    fn recorder(consumer: Consumer<Vec<u8>, Recorder>) -> Recorder {
        match consumer {
            Consumer::Predict { estimator, .. } => estimator,
            Consumer::Collect(_) => unreachable!("pipeline built for prediction"),
        }
    }

    #[test]
    fn one_window_from_one_hundred_frames() {
        let mut pipeline = pipeline(100, Recorder::default());
        let line = schema_a_line(&constant_samples(), 2 * SUBCARRIERS);
        for n in 1..=100 {
            match pipeline.process_line(&line).unwrap() {
                LineOutcome::Progress(length, capacity) => {
                    assert!(n < 100);
                    assert_eq!((length, capacity), (n, 100));
                }
                LineOutcome::Prediction(_) => assert_eq!(n, 100),
                other => unreachable!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(
            pipeline.summary(),
            &Summary {
                lines: 100,
                accepted: 100,
                rejected: 0,
                windows: 1
            }
        );
        assert_eq!(pipeline.gains().len(), 100);

        let (consumer, records, _) = pipeline.into_parts();
        let estimator = recorder(consumer);
        assert_eq!(estimator.shapes, vec![(100, SUBCARRIERS)]);
        let rows = String::from_utf8(records.into_inner()).unwrap();
        assert_eq!(rows.lines().count(), 100);
    }

    #[test]
    fn window_slides_on_every_frame_after_filling() {
        let mut pipeline = pipeline(5, Recorder::default());
        for seed in 0..8 {
            pipeline
                .process_line(&schema_b_line(&varying_samples(seed), 2 * SUBCARRIERS))
                .unwrap();
        }
        assert_eq!(pipeline.summary().windows, 4);
        // Schema B reports no gains.
        assert_eq!(pipeline.gains().len(), 0);

        let estimator = recorder(pipeline.into_parts().0);
        let (first, second) = (&estimator.tensors[0], &estimator.tensors[1]);
        assert_eq!(first.row(1), second.row(0));
        assert_eq!(first.row(4), second.row(3));
    }

    #[test]
    fn identical_input_gives_identical_windows() {
        let lines = (0..6)
            .map(|seed| schema_a_line(&varying_samples(seed), 2 * SUBCARRIERS))
            .collect::<Vec<_>>();
        let run = || {
            let mut pipeline = pipeline(4, Recorder::default());
            for line in &lines {
                pipeline.process_line(line).unwrap();
            }
            recorder(pipeline.into_parts().0).tensors
        };
        let (first, second) = (run(), run());
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn rejected_lines_go_to_diagnostics() {
        let mut pipeline = pipeline(100, Recorder::default());
        let mismatched = schema_a_line(&[1, 2, 3, 4, 5, 6], 4);
        assert!(matches!(
            pipeline.process_line("ets Jun  8 2016 00:22:57").unwrap(),
            LineOutcome::Rejected(Rejection::NotACsiRecord)
        ));
        assert!(matches!(
            pipeline.process_line(&mismatched).unwrap(),
            LineOutcome::Rejected(Rejection::DeclaredLengthMismatch { .. })
        ));
        assert_eq!(pipeline.summary().rejected, 2);

        let (_, records, diagnostics) = pipeline.into_parts();
        assert!(records.into_inner().is_empty());
        let log = String::from_utf8(diagnostics.into_inner()).unwrap();
        assert_eq!(
            log,
            format!("ets Jun  8 2016 00:22:57\ncsi_data_len is not equal\n{mismatched}\n")
        );
    }

    #[test]
    fn dimension_change_ends_the_session() {
        let mut pipeline = pipeline(100, Recorder::default());
        pipeline
            .process_line(&schema_a_line(&constant_samples(), 2 * SUBCARRIERS))
            .unwrap();
        let result = pipeline.process_line(&schema_a_line(&[3, 4, 3, 4], 4));
        assert!(matches!(
            result,
            Err(PipelineError::Window(WindowError::DimensionMismatch {
                expected: SUBCARRIERS,
                actual: 2
            }))
        ));
    }

    #[test]
    fn estimator_failure_keeps_the_window() {
        let mut pipeline = pipeline(
            2,
            Recorder {
                fail: true,
                ..Default::default()
            },
        );
        let line = schema_a_line(&constant_samples(), 2 * SUBCARRIERS);
        pipeline.process_line(&line).unwrap();
        for _ in 0..2 {
            assert!(matches!(
                pipeline.process_line(&line),
                Err(PipelineError::Estimator(EstimatorError::NonFinite))
            ));
        }
        assert_eq!(pipeline.summary().windows, 2);
        assert_eq!(recorder(pipeline.into_parts().0).shapes, vec![(2, SUBCARRIERS); 2]);
    }

    #[test]
    fn estimator_failure_ends_the_run() {
        let mut pipeline = pipeline(
            1,
            Recorder {
                fail: true,
                ..Default::default()
            },
        );
        let line = schema_a_line(&constant_samples(), 2 * SUBCARRIERS);
        let input = format!("{line}\n{line}\n");
        let mut source = ReaderSource::new(input.as_bytes());
        assert!(matches!(
            pipeline.run(&mut source),
            Err(PipelineError::Estimator(EstimatorError::NonFinite))
        ));
        assert_eq!(pipeline.summary().lines, 1);

        let (consumer, records, _) = pipeline.into_parts();
        assert_eq!(recorder(consumer).shapes, vec![(1, SUBCARRIERS)]);
        let rows = String::from_utf8(records.into_inner()).unwrap();
        assert_eq!(rows.lines().count(), 1);
    }

    #[test]
    fn collect_mode_writes_conditioned_vectors() {
        let mut pipeline: Pipeline<Vec<u8>, Recorder> = Pipeline::new(
            Conditioner::new(&ConditioningParameters::default()).unwrap(),
            Consumer::Collect(TrainingSink::new(Vec::new())),
            RecordSink::new(Vec::new()),
            DiagnosticSink::new(Vec::new()),
            GainHistory::new(200),
        );
        let input = [
            schema_a_line(&varying_samples(1), 2 * SUBCARRIERS),
            "garbage".to_owned(),
            schema_a_line(&varying_samples(2), 8),
        ]
        .join("\r\n");
        let mut source = ReaderSource::new(input.as_bytes());
        pipeline.run(&mut source).unwrap();
        assert_eq!(pipeline.summary().accepted, 1);
        assert_eq!(pipeline.summary().rejected, 2);

        let Consumer::Collect(training) = pipeline.into_parts().0 else {
            unreachable!("pipeline built for collection");
        };
        let written = String::from_utf8(training.into_inner()).unwrap();
        let lines = written.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].split(',').count(), SUBCARRIERS);
    }
}
