// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The per-channel demodulation pipeline: channel shift to baseband, AGC
//! normalization, optional Costas carrier recovery, and symbol-time
//! sampling.
//!
//! # Example
//!
//! ```rust,no_run
//! use suscan_inspector::dsp::Cf32;
//! use suscan_inspector::inspector::{FcControl, Inspector, InspectorParams};
//! use suscan_inspector::msg::RfChannel;
//!
//! let channel = RfChannel { f_lo: -2500.0, f_hi: 2500.0, bw: 5000.0, fc: 0.0, noise_floor: -90.0 };
//! let mut insp = Inspector::new(250_000.0, channel).unwrap();
//! insp.apply_params(InspectorParams { baud: 1000.0, fc_ctrl: FcControl::Manual, ..Default::default() }).unwrap();
//!
//! let samples = vec![Cf32::new(1.0, 0.0); 256];
//! let consumed = insp.feed_bulk(&samples).unwrap();
//! assert!(consumed <= samples.len());
//! ```

pub mod params;
pub mod state;

pub use params::{FcControl, InspectorParams};
pub use state::{AtomicInspectorState, LifecycleState};

use crate::config;
use crate::dsp::{
    Agc, AgcParams, ChannelDetector, Cf32, CostasKind, CostasLoop, DetectorMode, DetectorParams,
    Nco, ReferenceAgc, ReferenceChannelDetector, ReferenceCostasLoop, ReferenceNco,
};
use crate::error::{Error, Result};
use crate::msg::RfChannel;
use parking_lot::Mutex;

/// A dense, non-negative, append-only index into the analyzer's handle
/// table. Valid only while the indexed slot holds an inspector in
/// [`LifecycleState::Running`] (enforced by `crate::registry`, not by this
/// type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InspectorHandle(pub u32);

/// Per-channel demodulation pipeline.
///
/// Constructed once per `OPEN`; `apply_params` is called by the analyzer
/// thread on `PARAMS`; `feed_bulk` is called only by the worker callback
/// bound to this inspector (see `crate::worker`). `state` is the only field
/// touched from both sides; see [`state::AtomicInspectorState`].
pub struct Inspector {
    fac_baud_det: Box<dyn ChannelDetector>,
    nln_baud_det: Box<dyn ChannelDetector>,
    lo: Box<dyn Nco>,
    phase: Cf32,
    agc: Box<dyn Agc>,
    costas_2: Box<dyn CostasLoop>,
    costas_4: Box<dyn CostasLoop>,

    samp_rate: f64,
    params: Mutex<InspectorParams>,

    sym_period: f64,
    sym_phase: f64,
    sym_last_sample: Cf32,
    sym_sampler_output: Cf32,
    sym_new_sample: bool,
}

impl Inspector {
    /// Build an inspector from the reference collaborator implementations,
    /// deriving every AGC/Costas time constant from `fs` and the channel's
    /// bandwidth exactly as `apply_params`'s companion derivation does.
    pub fn new(fs: f64, channel: RfChannel) -> Result<Self> {
        let samp_per_sym = fs / channel.bw;

        let fac_params = DetectorParams {
            mode: DetectorMode::Autocorrelation,
            samp_rate: fs,
            window_size: 8192,
            alpha: 1e-4,
            bw: channel.bw,
            fc: channel.fc,
        };
        let nln_params = DetectorParams {
            mode: DetectorMode::NonlinearDiff,
            ..fac_params
        };

        let fast_rise = samp_per_sym * config::AGC_FAST_RISE_FRAC;
        let fast_fall = config::AGC_FAST_FALL_MULT * fast_rise;
        let agc_params = AgcParams {
            fast_rise_t: fast_rise,
            fast_fall_t: fast_fall,
            slow_rise_t: config::AGC_SLOW_MULT * fast_rise,
            slow_fall_t: config::AGC_SLOW_MULT * fast_fall,
            hang_max: samp_per_sym * config::AGC_HANG_MAX_FRAC,
            delay_line_size: (samp_per_sym * config::AGC_DELAY_LINE_FRAC).round().max(1.0) as usize,
            mag_history_size: (samp_per_sym * config::AGC_DELAY_LINE_FRAC).round().max(1.0) as usize,
        };

        let cutoff = channel.bw / fs;
        let loop_bw = config::COSTAS_LOOP_BW_FRAC * cutoff;

        Ok(Self {
            fac_baud_det: Box::new(ReferenceChannelDetector::new(fac_params)),
            nln_baud_det: Box::new(ReferenceChannelDetector::new(nln_params)),
            lo: Box::new(ReferenceNco::new(0.0)),
            phase: Cf32::new(1.0, 0.0),
            agc: Box::new(ReferenceAgc::new(agc_params)),
            costas_2: Box::new(ReferenceCostasLoop::init(
                CostasKind::Bpsk,
                0.0,
                cutoff,
                config::COSTAS_ORDER,
                loop_bw,
            )),
            costas_4: Box::new(ReferenceCostasLoop::init(
                CostasKind::Qpsk,
                0.0,
                cutoff,
                config::COSTAS_ORDER,
                loop_bw,
            )),
            samp_rate: fs,
            params: Mutex::new(InspectorParams::default()),
            sym_period: 0.0,
            sym_phase: 0.0,
            sym_last_sample: Cf32::new(0.0, 0.0),
            sym_sampler_output: Cf32::new(0.0, 0.0),
            sym_new_sample: false,
        })
    }

    /// Build an inspector from caller-supplied collaborators (used by tests
    /// that want deterministic detectors/AGC/Costas behavior).
    pub fn with_collaborators(
        fs: f64,
        fac_baud_det: Box<dyn ChannelDetector>,
        nln_baud_det: Box<dyn ChannelDetector>,
        lo: Box<dyn Nco>,
        agc: Box<dyn Agc>,
        costas_2: Box<dyn CostasLoop>,
        costas_4: Box<dyn CostasLoop>,
    ) -> Self {
        Self {
            fac_baud_det,
            nln_baud_det,
            lo,
            phase: Cf32::new(1.0, 0.0),
            agc,
            costas_2,
            costas_4,
            samp_rate: fs,
            params: Mutex::new(InspectorParams::default()),
            sym_period: 0.0,
            sym_phase: 0.0,
            sym_last_sample: Cf32::new(0.0, 0.0),
            sym_sampler_output: Cf32::new(0.0, 0.0),
            sym_new_sample: false,
        }
    }

    /// Current parameters (a cheap copy; `InspectorParams` is POD).
    pub fn params(&self) -> InspectorParams {
        *self.params.lock()
    }

    /// Apply parameters received via a `PARAMS` message: re-derives
    /// `sym_period`, the NCO's normalized frequency, and the carrier phase
    /// rotor. AGC and Costas loop state are left running — carrier control
    /// is a continuous servo, not reset on every parameter change.
    pub fn apply_params(&mut self, new_params: InspectorParams) -> Result<()> {
        self.sym_period = if new_params.baud > 0.0 {
            self.samp_rate / new_params.baud
        } else {
            0.0
        };

        self.lo.set_freq(new_params.fc_off / self.samp_rate);
        self.phase = Cf32::new(
            new_params.fc_phi.cos() as f32,
            new_params.fc_phi.sin() as f32,
        );

        *self.params.lock() = new_params;
        Ok(())
    }

    /// Whether the last `feed_bulk` call fired the symbol sampler.
    pub fn sym_new_sample(&self) -> bool {
        self.sym_new_sample
    }

    /// The symbol sample produced by the firing recorded in
    /// [`Inspector::sym_new_sample`].
    pub fn sym_sampler_output(&self) -> Cf32 {
        self.sym_sampler_output
    }

    /// Feed up to `samples.len()` raw input samples, stopping at the first
    /// symbol-sampler firing. Returns the number of samples actually
    /// consumed (0..=samples.len()).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DspFailure`] if either channel detector rejects a
    /// sample.
    pub fn feed_bulk(&mut self, samples: &[Cf32]) -> Result<usize> {
        let fc_ctrl = self.params().fc_ctrl;
        let samp_phase_samples = self.params().sym_phase * self.sym_period;

        self.sym_new_sample = false;

        let mut consumed = 0;
        for &x in samples {
            if self.sym_new_sample {
                break;
            }

            self.fac_baud_det
                .feed(x)
                .map_err(|_| Error::DspFailure("autocorrelation detector rejected sample"))?;
            self.nln_baud_det
                .feed(x)
                .map_err(|_| Error::DspFailure("nonlinear-diff detector rejected sample"))?;

            let mut d = self.fac_baud_det.last_window_sample();

            d *= self.lo.read().conj() * self.phase;
            d = self.agc.feed(d) * (config::AGC_OUTPUT_SCALE as f32);

            let sample = match fc_ctrl {
                FcControl::Manual => d,
                FcControl::Costas2 => {
                    self.costas_2.feed(d);
                    self.costas_2.y()
                }
                FcControl::Costas4 => {
                    self.costas_4.feed(d);
                    self.costas_4.y()
                }
            };

            if self.sym_period >= 1.0 {
                self.sym_phase += 1.0;
                if self.sym_phase >= self.sym_period {
                    self.sym_phase -= self.sym_period;
                }

                self.sym_new_sample =
                    (self.sym_phase - samp_phase_samples).floor() as i64 == 0;

                if self.sym_new_sample {
                    let alpha = self.sym_phase - self.sym_phase.floor();
                    self.sym_sampler_output = (self.sym_last_sample * (1.0 - alpha) as f32
                        + sample * alpha as f32)
                        * 0.5;
                }
            }

            self.sym_last_sample = sample;
            consumed += 1;

            if self.sym_new_sample {
                break;
            }
        }

        Ok(consumed)
    }

    /// Baud estimate from both detectors, as returned on `GET_INFO`.
    pub fn baud_estimate(&self) -> (f64, f64) {
        (self.fac_baud_det.baud(), self.nln_baud_det.baud())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> RfChannel {
        RfChannel {
            f_lo: -2500.0,
            f_hi: 2500.0,
            bw: 5000.0,
            fc: 0.0,
            noise_floor: -90.0,
        }
    }

    #[test]
    fn no_sampling_when_baud_is_zero() {
        let mut insp = Inspector::new(250_000.0, channel()).unwrap();
        insp.apply_params(InspectorParams::default()).unwrap();

        let samples = vec![Cf32::new(0.0, 0.0); 10_000];
        let consumed = insp.feed_bulk(&samples).unwrap();

        assert_eq!(consumed, 10_000);
        assert!(!insp.sym_new_sample());
    }

    #[test]
    fn sampler_fires_at_sym_period_boundary() {
        let mut insp = Inspector::new(250_000.0, channel()).unwrap();
        insp.apply_params(InspectorParams {
            baud: 1000.0,
            fc_ctrl: FcControl::Manual,
            ..Default::default()
        })
        .unwrap();

        let samples = vec![Cf32::new(1.0, 0.0); 25_000];
        let mut total_consumed = 0;
        let mut fired = 0;
        let mut remaining: &[Cf32] = &samples;

        while !remaining.is_empty() {
            let consumed = insp.feed_bulk(remaining).unwrap();
            assert!(consumed <= 250);
            total_consumed += consumed;
            if insp.sym_new_sample() {
                fired += 1;
            }
            remaining = &remaining[consumed..];
        }

        // sym_period = fs / baud = 250_000 / 1_000 = 250 samples/symbol,
        // so 25_000 input samples produce exactly 100 symbol firings.
        assert_eq!(total_consumed, 25_000);
        assert_eq!(fired, 100);
    }

    #[test]
    fn feed_bulk_never_exceeds_input_len() {
        let mut insp = Inspector::new(250_000.0, channel()).unwrap();
        insp.apply_params(InspectorParams {
            baud: 1000.0,
            ..Default::default()
        })
        .unwrap();
        let samples = vec![Cf32::new(0.3, -0.1); 5];
        let consumed = insp.feed_bulk(&samples).unwrap();
        assert!(consumed <= samples.len());
    }
}
