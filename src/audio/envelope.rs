use crate::config::EnvelopeConfig;

/// Decayed-RMS loudness, one value per mono frame.
///
/// A value of exactly zero marks a frame with no usable audio; detectors
/// skip such frames.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeEnvelope {
    values: Vec<f32>,
}

impl VolumeEnvelope {
    /// Build the envelope from mono samples.
    ///
    /// Each ~20ms window takes `max(window_rms, previous * decay)`, so the
    /// envelope rises immediately and falls off gradually.
    pub fn build(samples: &[f32], sample_rate: u32, config: &EnvelopeConfig) -> Self {
        let window = (sample_rate / config.windows_per_second.max(1)).max(1) as usize;
        let mut values = Vec::with_capacity(samples.len());
        let mut volume = 0.0f32;

        for chunk in samples.chunks(window) {
            let sum_sq = chunk.iter().map(|s| (*s as f64).powi(2)).sum::<f64>();
            let rms = (sum_sq / chunk.len() as f64).sqrt() as f32;
            volume = rms.max(volume * config.decay);
            values.extend(std::iter::repeat(volume).take(chunk.len()));
        }

        log::debug!(
            "Volume envelope: {} frames, {} frame windows, peak {:.4}",
            values.len(),
            window,
            values.iter().copied().fold(0.0f32, f32::max)
        );

        Self { values }
    }

    pub fn from_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Envelope value at `frame`, or zero past the end.
    #[inline]
    pub fn at(&self, frame: usize) -> f32 {
        self.values.get(frame).copied().unwrap_or(0.0)
    }
}
