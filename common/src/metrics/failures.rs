use strum::{AsRefStr, EnumIter};

/// Categories of failure counted under [FAILURES](super::names::FAILURES).
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    NotACsiRecord,
    FieldCountMismatch,
    PayloadNotParseable,
    DeclaredLengthMismatch,
    MetadataNotParseable,
    OddSampleCount,
    DimensionMismatch,
    EstimatorFailed,
    SinkWriteFailed,
}

pub fn get_label(kind: FailureKind) -> (&'static str, String) {
    ("kind", kind.as_ref().to_owned())
}
