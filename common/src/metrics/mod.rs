//! Metric names and label helpers used by every component.
pub mod failures;
pub mod names;

use metrics::gauge;

/// Registers a constant gauge carrying the component name and its version.
pub fn component_info_metric(component: &'static str) {
    gauge!(
        names::COMPONENT_INFO,
        &[
            ("component", component.to_owned()),
            ("version", env!("CARGO_PKG_VERSION").to_owned()),
        ]
    )
    .set(1.0);
}
