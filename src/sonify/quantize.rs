//! Intensity → pitch mapping.
//!
//! Intensities are binned linearly over `[min_intensity, min_intensity + C]`
//! into the chromatic range, then the chosen pitch is pulled onto the
//! nearest member of the active scale.

use super::scale::{ChromaticRange, ScaleDefinition, MAX_PITCH};

/// Maps intensities to scale pitches for one fixed configuration.
#[derive(Debug, Clone)]
pub struct Quantizer {
    range: ChromaticRange,
    scale: ScaleDefinition,
    min_intensity: f64,
    bin_width: f64,
}

impl Quantizer {
    /// `ceiling` is the galaxy profile's normalisation ceiling `C`; the
    /// bin width is `C / N` for a range of `N` pitches.
    pub fn new(
        range: ChromaticRange,
        scale: ScaleDefinition,
        min_intensity: f64,
        ceiling: f64,
    ) -> Self {
        let bin_width = if range.is_empty() {
            0.0
        } else {
            ceiling / range.len() as f64
        };
        log::debug!(
            "quantizer: {} pitches, ceiling {ceiling}, bin width {bin_width:.6}",
            range.len()
        );
        if scale.is_empty() {
            log::warn!("scale has no pitch classes, pitches will not be snapped");
        }
        Self {
            range,
            scale,
            min_intensity,
            bin_width,
        }
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Index into the chromatic range, clamped to `0..N`.
    pub fn chromatic_index(&self, intensity: f64) -> usize {
        let n = self.range.len();
        if n == 0 {
            return 0;
        }
        let raw = (intensity - self.min_intensity) / self.bin_width;
        // zero-width bins: the minimum itself gives NaN, anything above it +inf
        if !raw.is_finite() {
            return if raw == f64::INFINITY { n - 1 } else { 0 };
        }
        (raw.floor().max(0.0) as usize).min(n - 1)
    }

    /// Unsnapped chromatic pitch for an intensity.
    pub fn candidate_pitch(&self, intensity: f64) -> u8 {
        self.range
            .pitches()
            .get(self.chromatic_index(intensity))
            .copied()
            .unwrap_or(0)
    }

    /// Final pitch: the candidate snapped onto the scale.
    pub fn quantize(&self, intensity: f64) -> u8 {
        self.snap(self.candidate_pitch(intensity))
    }

    /// Nearest pitch whose class is in the scale.
    ///
    /// Searches `+1, -1, +2, -2, …` up to `max(N, 12)` steps, so ties at equal
    /// distance resolve upwards. Falls back to the input when nothing
    /// matches (empty scale).
    pub fn snap(&self, pitch: u8) -> u8 {
        let pitch = pitch as i32;
        if self.scale.contains_pitch(pitch) {
            return pitch as u8;
        }
        let limit = self.range.len().max(12) as i32;
        for j in 1..=limit {
            for candidate in [pitch + j, pitch - j] {
                if (0..=MAX_PITCH as i32).contains(&candidate)
                    && self.scale.contains_pitch(candidate)
                {
                    return candidate as u8;
                }
            }
        }
        pitch as u8
    }

    /// Lower intensity edge of each pitch bin, for plotting guide lines.
    pub fn bin_thresholds(&self) -> Vec<f64> {
        (0..self.range.len())
            .map(|i| self.min_intensity + i as f64 * self.bin_width)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonify::scale::ScaleKind;

    fn quantizer(scale: ScaleKind, ceiling: f64) -> Quantizer {
        Quantizer::new(ChromaticRange::new(36, 5), scale.definition(), 0.0, ceiling)
    }

    #[test]
    fn linear_binning_and_clamp() {
        let q = quantizer(ScaleKind::Chromatic, 6.0);
        assert_eq!(q.bin_width(), 0.1);
        assert_eq!(q.chromatic_index(0.0), 0);
        assert_eq!(q.chromatic_index(0.25), 2);
        assert_eq!(q.chromatic_index(100.0), 59);
        assert_eq!(q.chromatic_index(-1.0), 0);
        assert_eq!(q.quantize(0.25), 38);
    }

    #[test]
    fn index_is_monotonic() {
        let q = quantizer(ScaleKind::Major, 8.0);
        let mut last = 0;
        for step in 0..1000 {
            let idx = q.chromatic_index(step as f64 * 0.01);
            assert!(idx >= last);
            last = idx;
        }
    }

    #[test]
    fn snapped_pitches_stay_in_scale() {
        for kind in ScaleKind::ALL {
            let q = quantizer(kind, 8.0);
            let def = kind.definition();
            for step in 0..200 {
                let p = q.quantize(step as f64 * 0.05);
                assert!(def.contains_pitch(p as i32), "{kind}: {p}");
            }
        }
    }

    #[test]
    fn ties_prefer_upward() {
        // C# (37) sits between C (36) and D (38) in C major.
        let q = quantizer(ScaleKind::Major, 8.0);
        assert_eq!(q.snap(37), 38);
        // F# (42) between F (41) and G (43).
        assert_eq!(q.snap(42), 43);
        // Harmonic minor has G# and B but neither A nor A#.
        let hm = quantizer(ScaleKind::HarmonicMinor, 8.0);
        assert_eq!(hm.snap(58), 59);
        assert_eq!(hm.snap(57), 56);
    }

    #[test]
    fn empty_scale_falls_back_to_candidate() {
        let q = Quantizer::new(ChromaticRange::new(36, 2), ScaleDefinition::new(&[]), 0.0, 2.4);
        assert_eq!(q.quantize(0.55), 41);
    }

    #[test]
    fn zero_ceiling_does_not_panic() {
        let q = quantizer(ScaleKind::Chromatic, 0.0);
        assert_eq!(q.quantize(0.0), 36);
    }

    #[test]
    fn thresholds_start_at_min() {
        let q = Quantizer::new(ChromaticRange::new(48, 1), ScaleKind::Major.definition(), 0.5, 1.2);
        let t = q.bin_thresholds();
        assert_eq!(t.len(), 12);
        assert_eq!(t[0], 0.5);
        assert!((t[11] - 1.6).abs() < 1e-12);
    }
}
