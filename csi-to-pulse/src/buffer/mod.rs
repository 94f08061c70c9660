//! Session-long buffers fed by the pipeline: the estimator's sliding window and the gain history.
mod gain_history;
mod window;

pub(crate) use gain_history::GainHistory;
pub(crate) use window::{WindowBuffer, WindowError, WindowPush, WindowTensor};
