mod noise;
mod pattern;
mod record;
pub(crate) mod utils;

pub(crate) use noise::{Noise, NoiseSource};
pub(crate) use pattern::AmplitudePattern;
pub(crate) use record::{Corruption, Layout, RecordFields, corrupt, format_record};
