//! Band-edge filters applied before peak detection.
//!
//! Each edge is a 2nd-order Butterworth biquad (RBJ cookbook coefficients).
//! The high-pass runs first, then the low-pass, matching a
//! source → high-pass → low-pass → destination render graph.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Direct Form I biquad, coefficients pre-normalized by a0.
#[derive(Debug, Clone)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn lowpass(freq: f64, sample_rate: u32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq, sample_rate);
        let a0 = 1.0 + alpha;
        Self::from_coefficients(
            (1.0 - cos_w0) / 2.0 / a0,
            (1.0 - cos_w0) / a0,
            (1.0 - cos_w0) / 2.0 / a0,
            -2.0 * cos_w0 / a0,
            (1.0 - alpha) / a0,
        )
    }

    fn highpass(freq: f64, sample_rate: u32) -> Self {
        let (cos_w0, alpha) = Self::prewarp(freq, sample_rate);
        let a0 = 1.0 + alpha;
        Self::from_coefficients(
            (1.0 + cos_w0) / 2.0 / a0,
            -(1.0 + cos_w0) / a0,
            (1.0 + cos_w0) / 2.0 / a0,
            -2.0 * cos_w0 / a0,
            (1.0 - alpha) / a0,
        )
    }

    fn prewarp(freq: f64, sample_rate: u32) -> (f64, f64) {
        // Keep the cutoff strictly inside (0, nyquist).
        let nyquist = sample_rate as f64 / 2.0;
        let freq = freq.clamp(1.0, nyquist * 0.999);
        let w0 = 2.0 * PI * freq / sample_rate as f64;
        (w0.cos(), w0.sin() / (2.0 * FRAC_1_SQRT_2))
    }

    fn from_coefficients(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// Series high-pass/low-pass chain for one analysis band.
#[derive(Debug, Clone)]
pub struct BandFilter {
    high_pass: Option<Biquad>,
    low_pass: Option<Biquad>,
}

impl BandFilter {
    /// Either edge may be `None` for an open band edge.
    pub fn new(min_frequency: Option<f32>, max_frequency: Option<f32>, sample_rate: u32) -> Self {
        Self {
            high_pass: min_frequency.map(|f| Biquad::highpass(f as f64, sample_rate)),
            low_pass: max_frequency.map(|f| Biquad::lowpass(f as f64, sample_rate)),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.high_pass.is_none() && self.low_pass.is_none()
    }

    /// Filter `samples` in place.
    pub fn process(&mut self, samples: &mut [f32]) {
        if self.is_passthrough() {
            return;
        }
        for sample in samples.iter_mut() {
            let mut x = *sample as f64;
            if let Some(hp) = self.high_pass.as_mut() {
                x = hp.process_sample(x);
            }
            if let Some(lp) = self.low_pass.as_mut() {
                x = lp.process_sample(x);
            }
            *sample = x as f32;
        }
    }
}
