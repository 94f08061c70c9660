//! Line sources the pipeline reads from.
use std::{
    io::{BufRead, BufReader, ErrorKind},
    time::Duration,
};
use thiserror::Error;
use tracing::{info, trace};

#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("Cannot read from source: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open serial port: {0}")]
    Serial(#[from] serialport::Error),
}

/// Yields one line at a time, or [None] at the end of the stream.
pub(crate) trait LineSource {
    fn next_line(&mut self) -> Result<Option<String>, SourceError>;
}

/// Reads newline terminated lines from any buffered reader.
///
/// Line terminators are stripped and invalid UTF-8 is replaced rather than treated as an error.
/// A read which times out is retried, keeping any part of the line already received.
pub(crate) struct ReaderSource<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> ReaderSource<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        self.buffer.clear();
        loop {
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    trace!("Source quiet, {} bytes pending", self.buffer.len());
                }
                Err(e) => return Err(e.into()),
            }
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buffer);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }
}

/// Opens `path` as an 8N1 serial port and wraps it in a [ReaderSource].
///
/// The timeout only bounds each read; a quiet port is waited on indefinitely.
pub(crate) fn open_serial(
    path: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<ReaderSource<BufReader<Box<dyn serialport::SerialPort>>>, SourceError> {
    let port = serialport::new(path, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .timeout(timeout)
        .open()?;
    info!("Opened serial port {path} at {baud_rate} baud");
    Ok(ReaderSource::new(BufReader::new(port)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::VecDeque, io::Read};

    /// Yields its chunks in turn, timing out wherever a chunk is [None].
    struct Intermittent {
        chunks: VecDeque<Option<&'static str>>,
    }

    impl Read for Intermittent {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Some(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(chunk.as_bytes());
                    Ok(chunk.len())
                }
                Some(None) => Err(ErrorKind::TimedOut.into()),
                None => Ok(0),
            }
        }
    }

    fn intermittent(chunks: Vec<Option<&'static str>>) -> ReaderSource<BufReader<Intermittent>> {
        ReaderSource::new(BufReader::new(Intermittent {
            chunks: chunks.into(),
        }))
    }

    #[test]
    fn waits_through_a_quiet_source() {
        let mut source = intermittent(vec![None, None, Some("CSI_DATA,line\n")]);
        assert_eq!(source.next_line().unwrap().as_deref(), Some("CSI_DATA,line"));
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn partial_line_survives_a_timeout() {
        let mut source = intermittent(vec![
            Some("CSI_"),
            None,
            Some("DATA,line\nnext"),
            None,
        ]);
        assert_eq!(source.next_line().unwrap().as_deref(), Some("CSI_DATA,line"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("next"));
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn other_errors_end_the_stream() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(ErrorKind::BrokenPipe.into())
            }
        }
        let mut source = ReaderSource::new(BufReader::new(Broken));
        assert!(matches!(source.next_line(), Err(SourceError::Io(_))));
    }

    #[test]
    fn strips_terminators() {
        let mut source = ReaderSource::new("first\r\nsecond\n\nthird".as_bytes());
        assert_eq!(source.next_line().unwrap().as_deref(), Some("first"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("second"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some(""));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("third"));
        assert_eq!(source.next_line().unwrap(), None);
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let bytes: &[u8] = b"CSI_DATA,\xff\xfe,1\n";
        let mut source = ReaderSource::new(bytes);
        let line = source.next_line().unwrap().unwrap();
        assert!(line.starts_with("CSI_DATA,"));
        assert!(line.ends_with(",1"));
        assert!(line.contains(char::REPLACEMENT_CHARACTER));
    }
}
