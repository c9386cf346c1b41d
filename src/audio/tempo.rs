use std::collections::BTreeMap;

use super::features::Peak;
use crate::config::{TempoConfig, TempoEstimator};

/// The three statistics of the folded tempo histogram.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoEstimates {
    pub mode: f64,
    pub mean: f64,
    pub median: f64,
}

impl TempoEstimates {
    pub fn select(&self, estimator: TempoEstimator) -> f64 {
        match estimator {
            TempoEstimator::Mean => self.mean,
            TempoEstimator::Median => self.median,
            TempoEstimator::Mode => self.mode,
        }
    }
}

/// Infer BPM from beat-band peaks, or `None` when the peaks are too sparse.
pub fn infer_tempo(peaks: &[Peak], duration_seconds: f64, config: &TempoConfig) -> Option<f64> {
    let estimates = estimate_tempo(peaks, duration_seconds, config)?;
    log::info!(
        "Tempo estimates: mode={:.1} mean={:.2} median={:.1} (using {:?})",
        estimates.mode,
        estimates.mean,
        estimates.median,
        config.estimator
    );
    Some(estimates.select(config.estimator))
}

pub fn estimate_tempo(peaks: &[Peak], duration_seconds: f64, config: &TempoConfig) -> Option<TempoEstimates> {
    let floor = config.min_beats_per_minute * duration_seconds / 60.0;
    if peaks.len() < 2 || (peaks.len() as f64) < floor {
        log::debug!(
            "Too few beat peaks for tempo inference: {} < {:.1}",
            peaks.len(),
            floor
        );
        return None;
    }

    let intervals = interval_histogram(peaks, config);
    let tempos = tempo_histogram(&intervals, config);
    summarize(&tempos)
}

/// Counts of peak-to-peak intervals keyed in hundredths of a second.
///
/// Each peak is paired with up to `lookahead` following peaks; intervals
/// shorter than `min_interval_seconds` are noise.
fn interval_histogram(peaks: &[Peak], config: &TempoConfig) -> BTreeMap<i64, usize> {
    let mut histogram = BTreeMap::new();
    for (i, peak) in peaks.iter().enumerate() {
        for next in peaks.iter().skip(i + 1).take(config.lookahead) {
            let interval = next.time - peak.time;
            if interval < config.min_interval_seconds {
                continue;
            }
            let key = (interval * 100.0).round() as i64;
            if key > 0 {
                *histogram.entry(key).or_insert(0) += 1;
            }
        }
    }
    histogram
}

/// Interval buckets converted to whole-BPM buckets inside the folding range.
fn tempo_histogram(intervals: &BTreeMap<i64, usize>, config: &TempoConfig) -> BTreeMap<i64, usize> {
    let mut histogram = BTreeMap::new();
    for (&key, &count) in intervals {
        let bpm = fold_bpm(60.0 / (key as f64 / 100.0), config.min_bpm, config.max_bpm);
        *histogram.entry(bpm.round() as i64).or_insert(0) += count;
    }
    histogram
}

/// Double or halve until `bpm` lands in `[min_bpm, max_bpm]`.
///
/// The range must span at least an octave; otherwise `bpm` is returned
/// unchanged.
pub fn fold_bpm(mut bpm: f64, min_bpm: f64, max_bpm: f64) -> f64 {
    if !bpm.is_finite() || bpm <= 0.0 || !valid_fold_range(min_bpm, max_bpm) {
        return bpm;
    }
    while bpm < min_bpm {
        bpm *= 2.0;
    }
    while bpm > max_bpm {
        bpm /= 2.0;
    }
    bpm
}

pub fn valid_fold_range(min_bpm: f64, max_bpm: f64) -> bool {
    min_bpm.is_finite() && max_bpm.is_finite() && min_bpm > 0.0 && min_bpm * 2.0 <= max_bpm
}

fn summarize(histogram: &BTreeMap<i64, usize>) -> Option<TempoEstimates> {
    let total: usize = histogram.values().sum();
    if total == 0 {
        return None;
    }

    let mut mode = (0i64, 0usize);
    for (&bpm, &weight) in histogram {
        if weight > mode.1 {
            mode = (bpm, weight);
        }
    }

    let mean = histogram
        .iter()
        .map(|(&bpm, &weight)| bpm as f64 * weight as f64)
        .sum::<f64>()
        / total as f64;

    // Walk from the fastest bucket; an exact half splits two buckets.
    let half = total as f64 / 2.0;
    let descending: Vec<(i64, usize)> = histogram.iter().rev().map(|(&b, &w)| (b, w)).collect();
    let mut running = 0usize;
    let mut median = descending[0].0 as f64;
    for (i, &(bpm, weight)) in descending.iter().enumerate() {
        running += weight;
        let running = running as f64;
        if running > half {
            median = bpm as f64;
            break;
        }
        if running == half {
            median = match descending.get(i + 1) {
                Some(&(next, _)) => (bpm + next) as f64 / 2.0,
                None => bpm as f64,
            };
            break;
        }
    }

    Some(TempoEstimates {
        mode: mode.0 as f64,
        mean,
        median,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(bpm: f64, seconds: f64) -> Vec<Peak> {
        let interval = 60.0 / bpm;
        let count = (seconds / interval) as usize;
        (0..count)
            .map(|i| {
                let time = i as f64 * interval;
                Peak {
                    time,
                    end: time + 0.05,
                    intensity: 0.8,
                    intensity_normalized: 1.2,
                }
            })
            .collect()
    }

    fn config(estimator: TempoEstimator) -> TempoConfig {
        TempoConfig {
            estimator,
            ..TempoConfig::default()
        }
    }

    #[test]
    fn sparse_peaks_are_rejected() {
        // 20 peaks over a minute is below the 45/min floor.
        let peaks = pulse(20.0, 60.0);
        assert!(infer_tempo(&peaks, 60.0, &TempoConfig::default()).is_none());
        assert!(infer_tempo(&[], 0.0, &TempoConfig::default()).is_none());
    }

    #[test]
    fn steady_pulse_in_range() {
        let peaks = pulse(120.0, 60.0);
        let estimates = estimate_tempo(&peaks, 60.0, &TempoConfig::default()).unwrap();
        assert_eq!(estimates.mode, 120.0);
        assert_eq!(estimates.median, 120.0);
        // Odd multiples of the beat period fold to 160/137/107/96 and pull the mean up.
        assert!(estimates.mean > 120.0 && estimates.mean < 135.0);
    }

    #[test]
    fn slow_pulse_folds_up_an_octave() {
        let peaks = pulse(80.0, 60.0);
        let bpm = infer_tempo(&peaks, 60.0, &config(TempoEstimator::Mode)).unwrap();
        assert_eq!(bpm, 160.0);
    }

    #[test]
    fn mode_recovers_odd_tempo() {
        let peaks = pulse(95.0, 60.0);
        let bpm = infer_tempo(&peaks, 60.0, &config(TempoEstimator::Mode)).unwrap();
        assert_eq!(bpm, 95.0);
    }

    #[test]
    fn folding_stays_in_range() {
        assert_eq!(fold_bpm(60.0, 90.0, 180.0), 120.0);
        assert_eq!(fold_bpm(400.0, 90.0, 180.0), 100.0);
        assert_eq!(fold_bpm(180.0, 90.0, 180.0), 180.0);
        assert_eq!(fold_bpm(90.0, 90.0, 180.0), 90.0);
        for bpm in [31.0, 47.5, 89.9, 181.0, 359.0, 1000.0] {
            let folded = fold_bpm(bpm, 90.0, 180.0);
            assert!((90.0..=180.0).contains(&folded), "{} -> {}", bpm, folded);
        }
    }

    #[test]
    fn degenerate_fold_range_terminates() {
        assert_eq!(fold_bpm(120.0, 90.0, 0.0), 120.0);
        assert_eq!(fold_bpm(120.0, 90.0, -10.0), 120.0);
        assert_eq!(fold_bpm(60.0, 0.0, 180.0), 60.0);
        assert_eq!(fold_bpm(60.0, 100.0, 150.0), 60.0);
        assert!(!valid_fold_range(f64::NAN, 180.0));
        assert!(valid_fold_range(90.0, 180.0));
    }

    #[test]
    fn short_intervals_are_noise() {
        let cfg = TempoConfig::default();
        let peaks: Vec<Peak> = [0.0, 0.1, 0.2, 0.7]
            .iter()
            .map(|&time| Peak {
                time,
                end: time,
                intensity: 0.5,
                intensity_normalized: 0.5,
            })
            .collect();
        let hist = interval_histogram(&peaks, &cfg);
        let keys: Vec<i64> = hist.keys().copied().collect();
        assert_eq!(keys, vec![50, 60, 70]);
    }

    #[test]
    fn lookahead_limits_pairs() {
        let cfg = TempoConfig {
            lookahead: 2,
            ..TempoConfig::default()
        };
        let peaks = pulse(120.0, 3.0);
        let hist = interval_histogram(&peaks, &cfg);
        assert_eq!(hist.get(&50), Some(&5));
        assert_eq!(hist.get(&100), Some(&4));
        assert_eq!(hist.get(&150), None);
    }

    #[test]
    fn summary_statistics() {
        let hist: BTreeMap<i64, usize> = [(100, 1), (120, 3), (150, 1)].into_iter().collect();
        let est = summarize(&hist).unwrap();
        assert_eq!(est.mode, 120.0);
        assert!((est.mean - 122.0).abs() < 1e-9);
        assert_eq!(est.median, 120.0);
    }

    #[test]
    fn median_splits_exact_half() {
        let hist: BTreeMap<i64, usize> = [(100, 2), (140, 2)].into_iter().collect();
        let est = summarize(&hist).unwrap();
        assert_eq!(est.median, 120.0);
        assert_eq!(est.select(TempoEstimator::Median), 120.0);
        assert_eq!(est.select(TempoEstimator::Mean), 120.0);
    }
}
