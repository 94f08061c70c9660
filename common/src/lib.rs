//! Types, macros and set-up helpers shared by the CSI pulse pipeline components.
pub mod metrics;
mod tracing_init;

pub use git_version::git_version;
pub use tracing_init::{TracingError, init_tracing};

/// Scalar type used by the signal conditioning stages.
pub type Real = f64;

/// Raw interleaved sample reported by the CSI hardware.
pub type RawSample = i32;

/// Amplitude of a single subcarrier.
pub type Amplitude = Real;

/// Value of a gain compensation field reported by the receiver.
pub type Gain = i32;

/// Marker substring which every CSI record carries in its first field.
pub const CSI_MARKER: &str = "CSI_DATA";

/// Version string combining the crate version with the git description of the source tree.
#[macro_export]
macro_rules! version {
    () => {
        $crate::const_format_concat!(
            env!("CARGO_PKG_VERSION"),
            " (",
            $crate::git_version!(
                args = ["--tags", "--always", "--dirty=-modified"],
                fallback = "unknown"
            ),
            ")"
        )
    };
}

#[doc(hidden)]
pub use const_format::concatcp as const_format_concat;
