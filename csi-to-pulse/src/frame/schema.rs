//! Column layouts of the two CSI record variants emitted by the hardware.

/// Layout reported by chips which expose receiver gain compensation.
pub(crate) const SCHEMA_A_COLUMNS: [&str; 15] = [
    "type",
    "id",
    "mac",
    "rssi",
    "rate",
    "noise_floor",
    "fft_gain",
    "agc_gain",
    "channel",
    "local_timestamp",
    "sig_len",
    "rx_state",
    "len",
    "first_word",
    "data",
];

/// Layout reported by chips which expose the full radio control header.
pub(crate) const SCHEMA_B_COLUMNS: [&str; 25] = [
    "type",
    "id",
    "mac",
    "rssi",
    "rate",
    "sig_mode",
    "mcs",
    "bandwidth",
    "smoothing",
    "not_sounding",
    "aggregation",
    "stbc",
    "fec_coding",
    "sgi",
    "noise_floor",
    "ampdu_cnt",
    "channel",
    "secondary_channel",
    "local_timestamp",
    "ant",
    "sig_len",
    "rx_state",
    "len",
    "first_word",
    "data",
];

/// Identifies which column layout a record follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Schema {
    A,
    B,
}

impl Schema {
    /// Determines the schema from the number of fields in a record.
    pub(crate) fn from_field_count(count: usize) -> Option<Self> {
        match count {
            n if n == SCHEMA_A_COLUMNS.len() => Some(Self::A),
            n if n == SCHEMA_B_COLUMNS.len() => Some(Self::B),
            _ => None,
        }
    }

    pub(crate) fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::A => &SCHEMA_A_COLUMNS,
            Self::B => &SCHEMA_B_COLUMNS,
        }
    }

    /// Position of the column with the given name.
    pub(crate) fn index_of(&self, column: &str) -> Option<usize> {
        self.columns().iter().position(|&c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_two_widths_are_recognised() {
        for count in 0..40 {
            let expected = match count {
                15 => Some(Schema::A),
                25 => Some(Schema::B),
                _ => None,
            };
            assert_eq!(Schema::from_field_count(count), expected, "count = {count}");
        }
    }

    #[test]
    fn declared_length_is_third_from_last() {
        for schema in [Schema::A, Schema::B] {
            let n = schema.columns().len();
            assert_eq!(schema.index_of("len"), Some(n - 3));
            assert_eq!(schema.index_of("data"), Some(n - 1));
        }
    }
}
