// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel detector collaborator.
//!
//! A channel detector is fed every raw input sample and maintains a
//! windowed, de-spiked version of the signal (`last_window_sample`) plus a
//! running baud-rate estimate. The inspector pipeline mixes and AGCs
//! `last_window_sample`, not the raw input — see
//! [`crate::inspector::Inspector::feed_bulk`].

use crate::dsp::types::{Cf32, DetectorMode};
use crate::error::Result;

/// Construction parameters for a channel detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectorParams {
    pub mode: DetectorMode,
    pub samp_rate: f64,
    pub window_size: usize,
    pub alpha: f64,
    pub bw: f64,
    pub fc: f64,
}

/// A baud-rate detector fed every channel sample.
pub trait ChannelDetector: Send {
    /// Feed one raw sample. Returns an error if the detector's internal
    /// buffers could not accept it (e.g. an allocation failure).
    fn feed(&mut self, x: Cf32) -> Result<()>;

    /// The windowed/de-spiked sample produced by the last `feed` call. This
    /// is what downstream carrier mixing and AGC actually consume.
    fn last_window_sample(&self) -> Cf32;

    /// Current baud-rate estimate in Hz. Zero until enough history has
    /// accumulated.
    fn baud(&self) -> f64;
}

/// A reference channel detector.
///
/// This is a self-contained stand-in for the host analyzer's real
/// autocorrelation/nonlinear-difference detector libraries (out of scope
/// for this crate): it low-pass filters the input with `alpha` to produce
/// `last_window_sample`, and estimates baud by counting sign changes of the
/// real component over a sliding window of `window_size` samples, scaled by
/// `samp_rate`.
pub struct ReferenceChannelDetector {
    mode: DetectorMode,
    samp_rate: f64,
    window_size: usize,
    alpha: f64,
    smoothed: Cf32,
    window: Vec<Cf32>,
    window_pos: usize,
    window_filled: usize,
    baud: f64,
}

impl ReferenceChannelDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self {
            mode: params.mode,
            samp_rate: params.samp_rate,
            window_size: params.window_size.max(2),
            alpha: params.alpha,
            smoothed: Cf32::new(0.0, 0.0),
            window: vec![Cf32::new(0.0, 0.0); params.window_size.max(2)],
            window_pos: 0,
            window_filled: 0,
            baud: 0.0,
        }
    }

    fn recompute_baud(&mut self) {
        if self.window_filled < self.window.len() {
            return;
        }
        let mut crossings = 0usize;
        for i in 1..self.window.len() {
            let prev = self.window[i - 1].re;
            let cur = self.window[i].re;
            if (prev >= 0.0) != (cur >= 0.0) {
                crossings += 1;
            }
        }
        let span_samples = self.window.len() as f64 - 1.0;
        let span_secs = span_samples / self.samp_rate;
        // Two crossings per symbol period for the nonlinear-diff detector,
        // one for autocorrelation (the reference library's own split).
        let per_symbol = match self.mode {
            DetectorMode::NonlinearDiff => 2.0,
            DetectorMode::Autocorrelation => 1.0,
        };
        self.baud = if span_secs > 0.0 {
            (crossings as f64 / per_symbol) / span_secs
        } else {
            0.0
        };
    }
}

impl ChannelDetector for ReferenceChannelDetector {
    fn feed(&mut self, x: Cf32) -> Result<()> {
        self.smoothed = self.smoothed * (1.0 - self.alpha as f32) + x * (self.alpha as f32);
        self.window[self.window_pos] = self.smoothed;
        self.window_pos = (self.window_pos + 1) % self.window.len();
        if self.window_filled < self.window.len() {
            self.window_filled += 1;
        }
        self.recompute_baud();
        Ok(())
    }

    fn last_window_sample(&self) -> Cf32 {
        self.smoothed
    }

    fn baud(&self) -> f64 {
        self.baud
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: DetectorMode) -> DetectorParams {
        DetectorParams {
            mode,
            samp_rate: 250_000.0,
            window_size: 64,
            alpha: 1.0, // no smoothing, so last_window_sample tracks input exactly
            bw: 5000.0,
            fc: 0.0,
        }
    }

    #[test]
    fn feed_updates_last_window_sample() {
        let mut det = ReferenceChannelDetector::new(params(DetectorMode::Autocorrelation));
        det.feed(Cf32::new(1.0, 0.5)).unwrap();
        assert_eq!(det.last_window_sample(), Cf32::new(1.0, 0.5));
    }

    #[test]
    fn baud_zero_until_window_fills() {
        let mut det = ReferenceChannelDetector::new(params(DetectorMode::NonlinearDiff));
        for _ in 0..10 {
            det.feed(Cf32::new(1.0, 0.0)).unwrap();
        }
        assert_eq!(det.baud(), 0.0);
    }
}
