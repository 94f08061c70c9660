use super::{CsiFrame, Metadata, Rejection, Schema, SchemaAMetadata, SchemaBMetadata};
use csi_pulse_common::{CSI_MARKER, RawSample};
use std::str::FromStr;
use tracing::instrument;

/// Read access to the fields of a record by column name.
struct Fields<'a> {
    record: &'a [String],
    schema: Schema,
}

impl<'a> Fields<'a> {
    fn text(&self, column: &'static str) -> Result<&'a str, Rejection> {
        self.schema
            .index_of(column)
            .and_then(|index| self.record.get(index))
            .map(|value| value.trim())
            .ok_or(Rejection::FieldCountMismatch(self.record.len()))
    }

    fn int<T: FromStr>(&self, column: &'static str) -> Result<T, Rejection> {
        let value = self.text(column)?;
        value
            .parse()
            .map_err(|_| Rejection::MetadataNotParseable {
                field: column,
                value: value.to_owned(),
            })
    }

    fn schema_a(&self) -> Result<SchemaAMetadata, Rejection> {
        Ok(SchemaAMetadata {
            id: self.int("id")?,
            mac: self.text("mac")?.to_owned(),
            rssi: self.int("rssi")?,
            rate: self.int("rate")?,
            noise_floor: self.int("noise_floor")?,
            fft_gain: self.int("fft_gain")?,
            agc_gain: self.int("agc_gain")?,
            channel: self.int("channel")?,
            local_timestamp: self.int("local_timestamp")?,
            sig_len: self.int("sig_len")?,
            rx_state: self.int("rx_state")?,
            first_word: self.int("first_word")?,
        })
    }

    fn schema_b(&self) -> Result<SchemaBMetadata, Rejection> {
        Ok(SchemaBMetadata {
            id: self.int("id")?,
            mac: self.text("mac")?.to_owned(),
            rssi: self.int("rssi")?,
            rate: self.int("rate")?,
            sig_mode: self.int("sig_mode")?,
            mcs: self.int("mcs")?,
            bandwidth: self.int("bandwidth")?,
            smoothing: self.int("smoothing")?,
            not_sounding: self.int("not_sounding")?,
            aggregation: self.int("aggregation")?,
            stbc: self.int("stbc")?,
            fec_coding: self.int("fec_coding")?,
            sgi: self.int("sgi")?,
            noise_floor: self.int("noise_floor")?,
            ampdu_cnt: self.int("ampdu_cnt")?,
            channel: self.int("channel")?,
            secondary_channel: self.int("secondary_channel")?,
            local_timestamp: self.int("local_timestamp")?,
            ant: self.int("ant")?,
            sig_len: self.int("sig_len")?,
            rx_state: self.int("rx_state")?,
            first_word: self.int("first_word")?,
        })
    }
}

/// Splits a comma separated line into fields, honouring quotes.
fn split_csv(text: &str) -> Vec<String> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map(|record| record.iter().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Splits a line into its fields, keeping the bracketed payload as a single field
/// whether or not the hardware quoted it.
///
/// An unquoted payload is split on its commas by the CSV reader, so its pieces are
/// rejoined from the field opening the bracket to the last field closing it. A payload
/// that never closes runs to the end of the line.
fn split_record(line: &str) -> Vec<String> {
    let mut record = split_csv(line);
    let Some(start) = record
        .iter()
        .position(|field| field.trim_start().starts_with('['))
    else {
        return record;
    };
    if record[start].trim_end().ends_with(']') {
        return record;
    }
    let end = record
        .iter()
        .rposition(|field| field.trim_end().ends_with(']'))
        .filter(|&end| end > start)
        .unwrap_or(record.len() - 1);
    let payload = record.drain(start..=end).collect::<Vec<_>>().join(",");
    record.insert(start, payload);
    record
}

/// Decodes one serial line into a [CsiFrame].
///
/// The checks are applied in order: marker, field count, payload syntax,
/// declared length, sample parity, and finally the remaining metadata.
/// # Parameters
/// - line: a single line from the transport, without its line terminator.
#[instrument(skip_all, level = "trace", err(level = "trace"))]
pub(crate) fn decode(line: &str) -> Result<CsiFrame, Rejection> {
    if !line.contains(CSI_MARKER) {
        return Err(Rejection::NotACsiRecord);
    }

    let record = split_record(line);
    if record.first().map(|frame_type| frame_type.trim()) != Some(CSI_MARKER) {
        return Err(Rejection::NotACsiRecord);
    }

    let schema = Schema::from_field_count(record.len())
        .ok_or(Rejection::FieldCountMismatch(record.len()))?;
    let fields = Fields {
        record: &record,
        schema,
    };

    let raw_samples: Vec<RawSample> = serde_json::from_str(fields.text("data")?)
        .map_err(|e| Rejection::PayloadNotParseable(e.to_string()))?;

    let declared_length: usize = fields.int("len")?;
    if declared_length != raw_samples.len() {
        return Err(Rejection::DeclaredLengthMismatch {
            declared: declared_length,
            actual: raw_samples.len(),
        });
    }
    if declared_length % 2 != 0 {
        return Err(Rejection::OddSampleCount(declared_length));
    }

    let metadata = match schema {
        Schema::A => Metadata::SchemaA(fields.schema_a()?),
        Schema::B => Metadata::SchemaB(fields.schema_b()?),
    };

    Ok(CsiFrame {
        metadata,
        declared_length,
        raw_samples,
        record,
    })
}
