use csi_pulse_common::Gain;
use std::collections::VecDeque;

/// The receiver gains of the most recent frames, oldest first.
#[derive(Debug)]
pub(crate) struct GainHistory {
    capacity: usize,
    agc: VecDeque<Gain>,
    fft: VecDeque<Gain>,
}

impl GainHistory {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            agc: VecDeque::with_capacity(capacity + 1),
            fft: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub(crate) fn push(&mut self, agc_gain: Gain, fft_gain: Gain) {
        if self.capacity == 0 {
            return;
        }
        self.agc.push_back(agc_gain);
        self.fft.push_back(fft_gain);
        if self.agc.len() > self.capacity {
            self.agc.pop_front();
            self.fft.pop_front();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.agc.len()
    }

    pub(crate) fn agc(&self) -> impl Iterator<Item = Gain> + '_ {
        self.agc.iter().copied()
    }

    pub(crate) fn fft(&self) -> impl Iterator<Item = Gain> + '_ {
        self.fft.iter().copied()
    }

    /// Mean `(agc_gain, fft_gain)` over the history, if any frame has been recorded.
    pub(crate) fn mean(&self) -> Option<(f64, f64)> {
        let n = self.len();
        (n > 0).then(|| {
            (
                self.agc().map(f64::from).sum::<f64>() / n as f64,
                self.fft().map(f64::from).sum::<f64>() / n as f64,
            )
        })
    }
}
