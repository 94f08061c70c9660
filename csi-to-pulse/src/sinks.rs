//! Append-only outputs of the pipeline. Every write is flushed immediately.
use crate::frame::{CsiFrame, Rejection};
use csi_pulse_common::Real;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SinkError {
    #[error("Cannot write to sink: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot write record: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes each accepted frame as one CSV row, fields in their original order.
pub(crate) struct RecordSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RecordSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_writer(writer),
        }
    }

    pub(crate) fn write(&mut self, frame: &CsiFrame) -> Result<(), SinkError> {
        self.writer.write_record(&frame.record)?;
        self.writer.flush()?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.writer.flush()?)
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|_| unreachable!("flushed on every write"))
    }
}

/// Text log of rejected lines, each preceded by the rejection's literal message.
pub(crate) struct DiagnosticSink<W: Write> {
    writer: W,
}

impl<W: Write> DiagnosticSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(crate) fn write(&mut self, rejection: &Rejection, line: &str) -> Result<(), SinkError> {
        if let Some(message) = rejection.diagnostic_message() {
            writeln!(self.writer, "{message}")?;
        }
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.writer.flush()?)
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.writer
    }
}

/// Training data file: one conditioned vector per line, values comma separated.
pub(crate) struct TrainingSink<W: Write> {
    writer: W,
}

impl<W: Write> TrainingSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(crate) fn write(&mut self, vector: &[Real]) -> Result<(), SinkError> {
        let line = vector
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.writer.flush()?)
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.writer
    }
}
