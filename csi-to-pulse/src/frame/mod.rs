//! Decodes serial lines into [CsiFrame]s.
//!
//! A line is either turned into a frame whose payload is guaranteed to be consistent
//! with its declared length, or classified with a [Rejection] describing why it was dropped.
mod decoder;
mod schema;

use csi_pulse_common::{
    Gain, RawSample,
    metrics::failures::FailureKind,
};
use thiserror::Error;

pub(crate) use decoder::decode;
pub(crate) use schema::Schema;

#[cfg(test)]
pub(crate) use decoder::tests::{schema_a_line, schema_b_line};

/// Metadata reported by chips using the fifteen column layout.
#[allow(unused)] // Not every field is consumed downstream.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SchemaAMetadata {
    pub(crate) id: i64,
    pub(crate) mac: String,
    pub(crate) rssi: i32,
    pub(crate) rate: i32,
    pub(crate) noise_floor: i32,
    pub(crate) fft_gain: Gain,
    pub(crate) agc_gain: Gain,
    pub(crate) channel: i32,
    pub(crate) local_timestamp: i64,
    pub(crate) sig_len: i32,
    pub(crate) rx_state: i32,
    pub(crate) first_word: i32,
}

/// Metadata reported by chips using the twenty-five column layout.
#[allow(unused)] // Not every field is consumed downstream.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SchemaBMetadata {
    pub(crate) id: i64,
    pub(crate) mac: String,
    pub(crate) rssi: i32,
    pub(crate) rate: i32,
    pub(crate) sig_mode: i32,
    pub(crate) mcs: i32,
    pub(crate) bandwidth: i32,
    pub(crate) smoothing: i32,
    pub(crate) not_sounding: i32,
    pub(crate) aggregation: i32,
    pub(crate) stbc: i32,
    pub(crate) fec_coding: i32,
    pub(crate) sgi: i32,
    pub(crate) noise_floor: i32,
    pub(crate) ampdu_cnt: i32,
    pub(crate) channel: i32,
    pub(crate) secondary_channel: i32,
    pub(crate) local_timestamp: i64,
    pub(crate) ant: i32,
    pub(crate) sig_len: i32,
    pub(crate) rx_state: i32,
    pub(crate) first_word: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Metadata {
    SchemaA(SchemaAMetadata),
    SchemaB(SchemaBMetadata),
}

/// A decoded CSI record.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CsiFrame {
    pub(crate) metadata: Metadata,
    /// Number of raw samples the record claims to carry, always equal to `raw_samples.len()`.
    pub(crate) declared_length: usize,
    /// Interleaved (imaginary, real) pairs.
    pub(crate) raw_samples: Vec<RawSample>,
    /// The record's fields in their original order, payload still serialised.
    pub(crate) record: Vec<String>,
}

impl CsiFrame {
    pub(crate) fn schema(&self) -> Schema {
        match self.metadata {
            Metadata::SchemaA(_) => Schema::A,
            Metadata::SchemaB(_) => Schema::B,
        }
    }

    /// Returns `(agc_gain, fft_gain)` if the record reports gain compensation.
    pub(crate) fn gains(&self) -> Option<(Gain, Gain)> {
        match &self.metadata {
            Metadata::SchemaA(metadata) => Some((metadata.agc_gain, metadata.fft_gain)),
            Metadata::SchemaB(_) => None,
        }
    }

    pub(crate) fn rssi(&self) -> i32 {
        match &self.metadata {
            Metadata::SchemaA(metadata) => metadata.rssi,
            Metadata::SchemaB(metadata) => metadata.rssi,
        }
    }
}

/// Reasons a line is dropped by the decoder.
#[derive(Clone, Debug, Error, PartialEq)]
pub(crate) enum Rejection {
    #[error("line is not a CSI record")]
    NotACsiRecord,
    #[error("record has {0} fields")]
    FieldCountMismatch(usize),
    #[error("payload is not an integer array: {0}")]
    PayloadNotParseable(String),
    #[error("declared length {declared} does not match payload length {actual}")]
    DeclaredLengthMismatch { declared: usize, actual: usize },
    #[error("field \"{field}\" is not an integer: \"{value}\"")]
    MetadataNotParseable { field: &'static str, value: String },
    #[error("payload carries an odd number of samples: {0}")]
    OddSampleCount(usize),
}

impl Rejection {
    /// Literal written to the diagnostic sink ahead of the offending line.
    ///
    /// Lines which are not CSI records at all are logged verbatim without a message.
    pub(crate) fn diagnostic_message(&self) -> Option<&'static str> {
        match self {
            Self::NotACsiRecord => None,
            Self::FieldCountMismatch(_) => Some("element number is not equal"),
            Self::PayloadNotParseable(_) => Some("data is incomplete"),
            Self::DeclaredLengthMismatch { .. } => Some("csi_data_len is not equal"),
            Self::MetadataNotParseable { .. } => Some("metadata is not parseable"),
            Self::OddSampleCount(_) => Some("csi_data_len is odd"),
        }
    }

    pub(crate) fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NotACsiRecord => FailureKind::NotACsiRecord,
            Self::FieldCountMismatch(_) => FailureKind::FieldCountMismatch,
            Self::PayloadNotParseable(_) => FailureKind::PayloadNotParseable,
            Self::DeclaredLengthMismatch { .. } => FailureKind::DeclaredLengthMismatch,
            Self::MetadataNotParseable { .. } => FailureKind::MetadataNotParseable,
            Self::OddSampleCount(_) => FailureKind::OddSampleCount,
        }
    }
}
