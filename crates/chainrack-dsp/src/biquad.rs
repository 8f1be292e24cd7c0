//! Second-order Butterworth sections shared by the filters and the horn crossover.

use std::f64::consts::{PI, SQRT_2};

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Bilinear-transform prewarp shared by both responses.
    fn prewarp(freq: f64, sample_rate: f64) -> (f64, f64) {
        let omega = (PI * freq / sample_rate).tan();
        let omega2 = omega * omega;
        let n = 1.0 / (omega2 + SQRT_2 * omega + 1.0);
        (omega, n)
    }

    pub fn highpass(freq: f64, sample_rate: f64) -> Self {
        if freq <= 0.0 || sample_rate <= 0.0 {
            return Self::IDENTITY;
        }
        let (omega, n) = Self::prewarp(Self::below_nyquist(freq, sample_rate), sample_rate);
        let omega2 = omega * omega;
        Self {
            b0: n as f32,
            b1: (-2.0 * n) as f32,
            b2: n as f32,
            a1: (2.0 * (omega2 - 1.0) * n) as f32,
            a2: ((omega2 - SQRT_2 * omega + 1.0) * n) as f32,
        }
    }

    pub fn lowpass(freq: f64, sample_rate: f64) -> Self {
        if freq <= 0.0 || sample_rate <= 0.0 {
            return Self::IDENTITY;
        }
        let (omega, n) = Self::prewarp(Self::below_nyquist(freq, sample_rate), sample_rate);
        let omega2 = omega * omega;
        let b0 = omega2 * n;
        Self {
            b0: b0 as f32,
            b1: (2.0 * b0) as f32,
            b2: b0 as f32,
            a1: (2.0 * (omega2 - 1.0) * n) as f32,
            a2: ((omega2 - SQRT_2 * omega + 1.0) * n) as f32,
        }
    }

    // tan() blows up at Nyquist.
    fn below_nyquist(freq: f64, sample_rate: f64) -> f64 {
        freq.min(sample_rate * 0.5 - 1.0).max(1.0)
    }
}

/// Direct form I state for one channel of one stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    /// Tiny alternating offset keeps the recursion out of denormals.
    pub fn seeded() -> Self {
        const DC: f32 = 1e-25;
        Self {
            x1: DC,
            x2: -DC,
            y1: DC,
            y2: -DC,
        }
    }

    #[inline]
    pub fn tick(&mut self, c: &BiquadCoeffs, x: f32) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
