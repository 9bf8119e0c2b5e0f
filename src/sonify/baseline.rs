//! Flat-region baseline detection.
//!
//! The intensity series is smoothed with a centred moving average, then a
//! window of `W` samples slides across it. The first window whose mean sits
//! inside the acceptance band and whose spread is below half the median
//! spread of all windows is the flat region; its statistics become the
//! emission/absorption threshold.

use serde::{Deserialize, Serialize};

use crate::data::model::Spectrum;
use crate::error::{Result, SonifyError};

/// Detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sliding window length in samples.
    pub window: usize,
    /// Moving-average width; `<= 1` disables smoothing.
    pub smoothing: usize,
    /// Inclusive acceptance band for the window mean.
    pub band_lo: f64,
    pub band_hi: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window: 100,
            smoothing: 10,
            band_lo: 0.95,
            band_hi: 1.05,
        }
    }
}

/// Statistics of the detected flat region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub mean: f64,
    pub std_dev: f64,
    /// Index of the first sample of the flat region.
    pub start: usize,
    /// Wavelength span of the flat region.
    pub wavelength_lo: f64,
    pub wavelength_hi: f64,
}

/// Locate the first flat region of `spectrum`.
pub fn estimate(spectrum: &Spectrum, config: &DetectorConfig) -> Result<Baseline> {
    let len = spectrum.len();
    let w = config.window;
    if w == 0 || w > len {
        return Err(SonifyError::InvalidWindow { size: w, len });
    }

    let smoothed = moving_average(&spectrum.intensities(), config.smoothing);

    // one window per start in 0..len-W, the final full window is not scanned
    let stats: Vec<(f64, f64)> = (0..len - w)
        .map(|i| mean_std(&smoothed[i..i + w]))
        .collect();

    let threshold = median(stats.iter().map(|&(_, s)| s).collect()) * 0.5;
    log::debug!(
        "baseline scan: {} windows of {w}, std threshold {threshold:.6}",
        stats.len()
    );

    let in_band = |m: f64| m >= config.band_lo && m <= config.band_hi;
    // a zero threshold (median spread of zero) still admits perfectly flat windows
    let calm = |s: f64| s < threshold || (threshold == 0.0 && s == 0.0);

    let start = stats
        .iter()
        .position(|&(m, s)| in_band(m) && calm(s))
        .ok_or(SonifyError::NoFlatRegion {
            window: w,
            band_lo: config.band_lo,
            band_hi: config.band_hi,
        })?;

    let (mean, std_dev) = stats[start];
    let samples = spectrum.samples();
    let baseline = Baseline {
        mean,
        std_dev,
        start,
        wavelength_lo: samples[start].wavelength,
        wavelength_hi: samples[start + w - 1].wavelength,
    };
    log::info!(
        "flat region at {:.1}..{:.1}: mean {mean:.4}, std {std_dev:.4}",
        baseline.wavelength_lo,
        baseline.wavelength_hi
    );
    Ok(baseline)
}

/// Centred moving average of width `size`, mirroring the series at the
/// edges (`d c b a | a b c d | d c b a`).
///
/// For even widths the window reaches one sample further back than forward.
pub fn moving_average(values: &[f64], size: usize) -> Vec<f64> {
    if size <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let n = values.len() as isize;
    let before = (size / 2) as isize;
    let after = size as isize - before - 1;
    (0..n)
        .map(|i| {
            let sum: f64 = (i - before..=i + after)
                .map(|j| values[reflect(j, n)])
                .sum();
            sum / size as f64
        })
        .collect()
}

fn reflect(j: isize, n: isize) -> usize {
    let period = 2 * n;
    let m = j.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Median; zero for an empty input.
fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(intensities: &[f64]) -> Spectrum {
        let w: Vec<f64> = (0..intensities.len()).map(|i| 4000.0 + i as f64).collect();
        Spectrum::from_columns(&w, intensities).unwrap()
    }

    fn config(window: usize, smoothing: usize) -> DetectorConfig {
        DetectorConfig {
            window,
            smoothing,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn moving_average_reflects_edges() {
        let out = moving_average(&[1.0, 2.0, 3.0], 3);
        // [1,1,2] [1,2,3] [2,3,3]
        assert_eq!(out, vec![4.0 / 3.0, 2.0, 8.0 / 3.0]);
        assert_eq!(moving_average(&[1.0, 5.0], 1), vec![1.0, 5.0]);
    }

    #[test]
    fn moving_average_even_width() {
        // width 2 covers [i-1, i]
        let out = moving_average(&[2.0, 4.0, 6.0], 2);
        assert_eq!(out, vec![2.0, 3.0, 5.0]);
    }

    #[test]
    fn median_handles_parity_and_empty() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(Vec::new()), 0.0);
    }

    #[test]
    fn finds_first_flat_region() {
        // noisy head, flat middle near 1.0, noisy tail
        let mut y = Vec::new();
        for i in 0..20 {
            y.push(if i % 2 == 0 { 0.2 } else { 1.8 });
        }
        y.extend(std::iter::repeat(1.01).take(20));
        for i in 0..20 {
            y.push(if i % 2 == 0 { 3.0 } else { 0.1 });
        }
        let sp = spectrum(&y);
        let b = estimate(&sp, &config(5, 1)).unwrap();
        assert_eq!(b.start, 20);
        assert!((b.mean - 1.01).abs() < 1e-12);
        assert!(b.std_dev >= 0.0 && b.std_dev < 1e-12);
        assert_eq!(b.wavelength_lo, 4020.0);
        assert_eq!(b.wavelength_hi, 4024.0);
    }

    #[test]
    fn window_larger_than_spectrum_is_rejected() {
        let sp = spectrum(&[1.0; 10]);
        assert!(matches!(
            estimate(&sp, &config(11, 1)),
            Err(SonifyError::InvalidWindow { size: 11, len: 10 })
        ));
        assert!(matches!(
            estimate(&sp, &config(0, 1)),
            Err(SonifyError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn constant_spectrum_is_flat() {
        let sp = spectrum(&[1.0; 30]);
        let b = estimate(&sp, &config(10, 3)).unwrap();
        assert_eq!(b.start, 0);
        assert_eq!(b.mean, 1.0);
        assert_eq!(b.std_dev, 0.0);
    }

    #[test]
    fn out_of_band_fails() {
        let sp = spectrum(&[3.0; 30]);
        assert!(matches!(
            estimate(&sp, &config(10, 1)),
            Err(SonifyError::NoFlatRegion { .. })
        ));
    }

    #[test]
    fn full_length_window_has_nothing_to_scan() {
        let sp = spectrum(&[1.0; 10]);
        assert!(matches!(
            estimate(&sp, &config(10, 1)),
            Err(SonifyError::NoFlatRegion { .. })
        ));
    }
}
