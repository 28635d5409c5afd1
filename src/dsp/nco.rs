// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Numerically controlled oscillator collaborator.

use crate::dsp::types::Cf32;
use std::f64::consts::TAU;

/// Generates `exp(i * 2π * f_norm * n)` at a settable normalized frequency.
pub trait Nco: Send {
    fn new(initial_phase: f64) -> Self
    where
        Self: Sized;

    /// Set the oscillator frequency, normalized to `[-0.5, 0.5)` of the
    /// sample rate.
    fn set_freq(&mut self, norm_freq: f64);

    /// Advance one sample and return the current complex exponential.
    fn read(&mut self) -> Cf32;
}

/// A direct-form reference NCO: `phase += 2π * freq` each `read`, wrapped to
/// `[-π, π)` to keep the running phase bounded.
pub struct ReferenceNco {
    phase: f64,
    freq: f64,
}

impl Nco for ReferenceNco {
    fn new(initial_phase: f64) -> Self {
        Self {
            phase: initial_phase,
            freq: 0.0,
        }
    }

    fn set_freq(&mut self, norm_freq: f64) {
        self.freq = norm_freq;
    }

    fn read(&mut self) -> Cf32 {
        let out = Cf32::new(self.phase.cos() as f32, self.phase.sin() as f32);
        self.phase += TAU * self.freq;
        if self.phase >= std::f64::consts::PI {
            self.phase -= TAU;
        } else if self.phase < -std::f64::consts::PI {
            self.phase += TAU;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_freq_is_constant() {
        let mut nco = ReferenceNco::new(0.0);
        nco.set_freq(0.0);
        let a = nco.read();
        let b = nco.read();
        assert!((a - b).norm() < 1e-6);
    }

    #[test]
    fn nonzero_freq_rotates() {
        let mut nco = ReferenceNco::new(0.0);
        nco.set_freq(0.25);
        let a = nco.read();
        let b = nco.read();
        assert!((a - b).norm() > 0.5);
    }
}
