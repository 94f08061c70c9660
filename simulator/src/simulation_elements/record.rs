use csi_pulse_common::{CSI_MARKER, Gain, RawSample};
use rand::Rng;
use serde::Deserialize;

/// Column layout emitted by the simulated chip.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Layout {
    /// Fifteen columns, including the receiver gains.
    #[default]
    SchemaA,
    /// Twenty-five columns, including the radio configuration.
    SchemaB,
}

/// Per frame values written into the metadata columns.
#[derive(Clone, Debug)]
pub(crate) struct RecordFields {
    pub(crate) id: usize,
    pub(crate) mac: String,
    pub(crate) rssi: i32,
    pub(crate) noise_floor: i32,
    pub(crate) agc_gain: Gain,
    pub(crate) fft_gain: Gain,
    pub(crate) channel: i32,
    pub(crate) local_timestamp: i64,
}

/// Ways in which a line can be damaged, mimicking a noisy serial link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Corruption {
    /// The payload is cut short.
    Truncated,
    /// The declared length disagrees with the payload.
    WrongLength,
    /// A metadata column is lost.
    MissingField,
    /// The chip's boot or driver chatter.
    Chatter,
}

impl Corruption {
    const ALL: [Corruption; 4] = [
        Self::Truncated,
        Self::WrongLength,
        Self::MissingField,
        Self::Chatter,
    ];

    pub(crate) fn choose<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

fn payload(samples: &[RawSample]) -> String {
    let values = samples
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("\"[{values}]\"")
}

/// Formats one CSI record. `declared_length` is normally `samples.len()`.
pub(crate) fn format_record(
    layout: Layout,
    fields: &RecordFields,
    samples: &[RawSample],
    declared_length: usize,
) -> String {
    let RecordFields {
        id,
        mac,
        rssi,
        noise_floor,
        agc_gain,
        fft_gain,
        channel,
        local_timestamp,
    } = fields;
    let sig_len = 2 * samples.len() / 3;
    let metadata = match layout {
        Layout::SchemaA => format!(
            "{CSI_MARKER},{id},{mac},{rssi},11,{noise_floor},{fft_gain},{agc_gain},{channel},{local_timestamp},{sig_len},0"
        ),
        Layout::SchemaB => format!(
            "{CSI_MARKER},{id},{mac},{rssi},11,1,7,1,1,1,0,0,0,0,{noise_floor},0,{channel},0,{local_timestamp},0,{sig_len},0"
        ),
    };
    format!("{metadata},{declared_length},0,{}", payload(samples))
}

/// Damages a well formed line.
pub(crate) fn corrupt(
    corruption: Corruption,
    layout: Layout,
    fields: &RecordFields,
    samples: &[RawSample],
) -> String {
    match corruption {
        Corruption::Truncated => {
            let line = format_record(layout, fields, samples, samples.len());
            let cut = samples.len().max(4) / 2 + 2;
            line.chars().take(line.len().saturating_sub(cut)).collect()
        }
        Corruption::WrongLength => format_record(layout, fields, samples, samples.len() + 2),
        Corruption::MissingField => {
            let line = format_record(layout, fields, samples, samples.len());
            line.replacen(&format!(",{}", fields.mac), "", 1)
        }
        Corruption::Chatter => format!(
            "I ({}) wifi:new:<{},0>, old:<1,0>, ap:<255,255>, sta:<{},0>",
            fields.local_timestamp / 1000,
            fields.channel,
            fields.channel
        ),
    }
}
