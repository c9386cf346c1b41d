use std::collections::BTreeMap;

use super::decode::MonoSignal;
use super::envelope::VolumeEnvelope;
use super::features::Peak;
use super::filter::BandFilter;
use crate::config::BandParams;

/// Detect, then prune, the transients of one band.
///
/// The detector works on its own filtered copy of `signal`; `signal` and
/// `envelope` are only read.
pub fn detect_peaks(
    signal: &MonoSignal,
    envelope: &VolumeEnvelope,
    params: &BandParams,
    cooldown_seconds: f64,
) -> Vec<Peak> {
    let sample_rate = signal.sample_rate;

    let mut samples = signal.samples.clone();
    BandFilter::new(params.min_frequency, params.max_frequency, sample_rate).process(&mut samples);

    let cooldown = (sample_rate as f64 * cooldown_seconds).max(0.0) as usize;
    let peaks = scan(&samples, envelope, params, sample_rate, cooldown);
    let raw_count = peaks.len();

    let expected = expected_maximum_peaks(params.expected_max_peaks_per_minute, signal.duration());
    let pruned = if peaks.len() > expected {
        let histogram = IntensityHistogram::from_peaks(&peaks);
        match histogram.cutoff(expected) {
            Some(cutoff) => {
                log::debug!(
                    "Band {:?}-{:?}Hz: cutoff {:.2} (expected max {})",
                    params.min_frequency,
                    params.max_frequency,
                    cutoff as f32 / 100.0,
                    expected
                );
                retain_at_or_above(peaks, cutoff)
            }
            None => peaks,
        }
    } else {
        peaks
    };

    log::debug!(
        "Band {:?}-{:?}Hz: {} raw peaks, {} kept",
        params.min_frequency,
        params.max_frequency,
        raw_count,
        pruned.len()
    );

    pruned
}

/// `ceil(peaks_per_minute * duration / 60)`.
pub fn expected_maximum_peaks(peaks_per_minute: f64, duration_seconds: f64) -> usize {
    (peaks_per_minute * duration_seconds / 60.0).ceil().max(0.0) as usize
}

/// Sequential threshold scan over pre-filtered samples.
///
/// A peak starts when both initial thresholds are met, and continues while
/// both sustain thresholds hold. After a peak the scan skips `cooldown`
/// frames past its end.
pub fn scan(
    samples: &[f32],
    envelope: &VolumeEnvelope,
    params: &BandParams,
    sample_rate: u32,
    cooldown: usize,
) -> Vec<Peak> {
    let rate = sample_rate as f64;
    let mut peaks = Vec::new();
    let mut frame = 0usize;

    while frame < samples.len() {
        let volume = envelope.at(frame);
        if volume == 0.0 {
            frame += 1;
            continue;
        }

        let absolute = samples[frame].abs();
        let relative = absolute / volume;
        if absolute < params.initial_absolute_threshold || relative < params.initial_relative_threshold {
            frame += 1;
            continue;
        }

        let start = frame;
        let mut max_absolute = absolute;
        let mut max_relative = relative;
        frame += 1;

        while frame < samples.len() {
            let volume = envelope.at(frame);
            if volume == 0.0 {
                break;
            }
            let absolute = samples[frame].abs();
            let relative = absolute / volume;
            if absolute < params.sustain_absolute_threshold || relative < params.sustain_relative_threshold {
                break;
            }
            max_absolute = max_absolute.max(absolute);
            max_relative = max_relative.max(relative);
            frame += 1;
        }

        peaks.push(Peak {
            time: start as f64 / rate,
            end: frame as f64 / rate,
            intensity: max_absolute,
            intensity_normalized: max_relative,
        });

        frame += cooldown;
    }

    peaks
}

/// Normalized intensity as a fixed-point key with two decimals.
#[inline]
pub fn intensity_key(intensity_normalized: f32) -> i64 {
    (intensity_normalized as f64 * 100.0).round() as i64
}

/// Peak counts keyed by [`intensity_key`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntensityHistogram {
    buckets: BTreeMap<i64, usize>,
}

impl IntensityHistogram {
    pub fn from_peaks(peaks: &[Peak]) -> Self {
        let mut buckets = BTreeMap::new();
        for peak in peaks {
            *buckets.entry(intensity_key(peak.intensity_normalized)).or_insert(0) += 1;
        }
        Self { buckets }
    }

    pub fn total(&self) -> usize {
        self.buckets.values().sum()
    }

    /// Walk buckets from the most intense down, returning the key at which
    /// the running count first reaches `expected`.
    pub fn cutoff(&self, expected: usize) -> Option<i64> {
        let mut running = 0usize;
        for (&key, &count) in self.buckets.iter().rev() {
            running += count;
            if running >= expected {
                return Some(key);
            }
        }
        None
    }
}

/// Keep peaks whose normalized intensity is at least the cutoff bucket's
/// value. Peaks that only rounded up into the cutoff bucket are dropped.
pub fn retain_at_or_above(mut peaks: Vec<Peak>, cutoff: i64) -> Vec<Peak> {
    let threshold = cutoff as f32 / 100.0;
    peaks.retain(|p| p.intensity_normalized >= threshold);
    peaks
}
