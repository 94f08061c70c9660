use const_format::concatcp;

pub const METRIC_NAME_PREFIX: &str = "csi_pulse_";

pub const COMPONENT_INFO: &str = concatcp!(METRIC_NAME_PREFIX, "component_info");
pub const LINES_RECEIVED: &str = concatcp!(METRIC_NAME_PREFIX, "lines_received");
pub const FRAMES_ACCEPTED: &str = concatcp!(METRIC_NAME_PREFIX, "frames_accepted");
pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
pub const WINDOWS_EMITTED: &str = concatcp!(METRIC_NAME_PREFIX, "windows_emitted");
pub const LAST_PREDICTION: &str = concatcp!(METRIC_NAME_PREFIX, "last_prediction");
pub const LAST_AGC_GAIN: &str = concatcp!(METRIC_NAME_PREFIX, "last_agc_gain");
pub const LAST_FFT_GAIN: &str = concatcp!(METRIC_NAME_PREFIX, "last_fft_gain");
