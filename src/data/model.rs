use serde::{Deserialize, Serialize};

use crate::error::{Result, SonifyError};

// ---------------------------------------------------------------------------
// Sample – one (wavelength, intensity) pair
// ---------------------------------------------------------------------------

/// A single spectral sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wavelength in ångström.
    pub wavelength: f64,
    /// Normalised flux.
    pub intensity: f64,
}

impl Sample {
    pub fn new(wavelength: f64, intensity: f64) -> Self {
        Self {
            wavelength,
            intensity,
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – the full loaded spectrum
// ---------------------------------------------------------------------------

/// An immutable spectrum, sorted by ascending wavelength, with intensity
/// extrema computed over *all* samples.
#[derive(Debug, Clone)]
pub struct Spectrum {
    samples: Vec<Sample>,
    min_intensity: f64,
    max_intensity: f64,
}

impl Spectrum {
    /// Build a spectrum from samples. Rejects empty input and non-finite
    /// values; samples are stably sorted by wavelength.
    pub fn new(mut samples: Vec<Sample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(SonifyError::InvalidSpectrum("no samples".into()));
        }
        if let Some((i, bad)) = samples
            .iter()
            .enumerate()
            .find(|(_, s)| !s.wavelength.is_finite() || !s.intensity.is_finite())
        {
            return Err(SonifyError::InvalidSpectrum(format!(
                "sample {i} is not finite: ({}, {})",
                bad.wavelength, bad.intensity
            )));
        }

        samples.sort_by(|a, b| a.wavelength.total_cmp(&b.wavelength));

        let (min_intensity, max_intensity) = samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), s| (lo.min(s.intensity), hi.max(s.intensity)),
        );

        Ok(Spectrum {
            samples,
            min_intensity,
            max_intensity,
        })
    }

    /// Build from two parallel columns (the loaders' native shape).
    pub fn from_columns(wavelengths: &[f64], intensities: &[f64]) -> Result<Self> {
        if wavelengths.len() != intensities.len() {
            return Err(SonifyError::InvalidSpectrum(format!(
                "wavelength has {} values but intensity has {}",
                wavelengths.len(),
                intensities.len()
            )));
        }
        Self::new(
            wavelengths
                .iter()
                .zip(intensities)
                .map(|(&w, &i)| Sample::new(w, i))
                .collect(),
        )
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn intensities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.intensity).collect()
    }

    pub fn min_intensity(&self) -> f64 {
        self.min_intensity
    }

    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }

    /// Spread of intensities over the whole spectrum.
    pub fn intensity_range(&self) -> f64 {
        self.max_intensity - self.min_intensity
    }

    /// Shortest and longest wavelength.
    pub fn wavelength_bounds(&self) -> (f64, f64) {
        // `new` guarantees at least one sample.
        let first = self.samples[0].wavelength;
        let last = self.samples[self.samples.len() - 1].wavelength;
        (first, last)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed spectrum; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SonificationWindow – the wavelength interval to play
// ---------------------------------------------------------------------------

/// Inclusive wavelength interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SonificationWindow {
    pub lo: f64,
    pub hi: f64,
}

impl SonificationWindow {
    /// The window spanning the whole spectrum.
    pub fn full(spectrum: &Spectrum) -> Self {
        let (lo, hi) = spectrum.wavelength_bounds();
        Self { lo, hi }
    }

    /// Check ordering and containment within the spectrum's range.
    pub fn validate(&self, spectrum: &Spectrum) -> Result<()> {
        let (min, max) = spectrum.wavelength_bounds();
        let ordered = self.lo.is_finite() && self.hi.is_finite() && self.lo <= self.hi;
        if !ordered || self.lo < min || self.hi > max {
            return Err(SonifyError::InvalidRange {
                lo: self.lo,
                hi: self.hi,
                min,
                max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_and_tracks_extrema() {
        let sp = Spectrum::from_columns(&[4002.0, 4000.0, 4001.0], &[0.9, 0.5, 1.5]).unwrap();
        let w: Vec<f64> = sp.samples().iter().map(|s| s.wavelength).collect();
        assert_eq!(w, vec![4000.0, 4001.0, 4002.0]);
        assert_eq!(sp.min_intensity(), 0.5);
        assert_eq!(sp.max_intensity(), 1.5);
        assert_eq!(sp.wavelength_bounds(), (4000.0, 4002.0));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Spectrum::new(Vec::new()).is_err());
        assert!(Spectrum::from_columns(&[1.0, 2.0], &[1.0]).is_err());
        assert!(Spectrum::from_columns(&[1.0, 2.0], &[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn window_validation() {
        let sp = Spectrum::from_columns(&[4000.0, 4001.0, 4002.0], &[1.0; 3]).unwrap();
        assert!(SonificationWindow::full(&sp).validate(&sp).is_ok());
        assert!(SonificationWindow { lo: 4001.5, hi: 4001.0 }.validate(&sp).is_err());
        assert!(SonificationWindow { lo: 3999.0, hi: 4001.0 }.validate(&sp).is_err());
        assert!(matches!(
            SonificationWindow { lo: 4000.0, hi: 4003.0 }.validate(&sp),
            Err(SonifyError::InvalidRange { .. })
        ));
    }
}
