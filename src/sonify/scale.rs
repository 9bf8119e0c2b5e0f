use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::model::{SonificationWindow, Spectrum};
use crate::data::window::window_samples;

/// Highest pitch a note event can carry.
pub const MAX_PITCH: u8 = 127;

// ---------------------------------------------------------------------------
// ScaleKind – the five fixed pitch-class sets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleKind {
    #[default]
    HarmonicMinor,
    MinorPentatonic,
    Major,
    NaturalMinor,
    Chromatic,
}

impl ScaleKind {
    pub const ALL: [ScaleKind; 5] = [
        ScaleKind::HarmonicMinor,
        ScaleKind::MinorPentatonic,
        ScaleKind::Major,
        ScaleKind::NaturalMinor,
        ScaleKind::Chromatic,
    ];

    /// Semitone offsets within one octave.
    pub fn pitch_classes(self) -> &'static [u8] {
        match self {
            ScaleKind::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleKind::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn definition(self) -> ScaleDefinition {
        ScaleDefinition::new(self.pitch_classes())
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleKind::HarmonicMinor => "harmonic-minor",
            ScaleKind::MinorPentatonic => "minor-pentatonic",
            ScaleKind::Major => "major",
            ScaleKind::NaturalMinor => "natural-minor",
            ScaleKind::Chromatic => "chromatic",
        }
    }
}

impl fmt::Display for ScaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScaleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScaleKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scale '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// ScaleDefinition – membership bitmask over the 12 pitch classes
// ---------------------------------------------------------------------------

/// A set of allowed pitch classes. Values outside 0..12 are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaleDefinition {
    mask: u16,
}

impl ScaleDefinition {
    pub fn new(pitch_classes: &[u8]) -> Self {
        let mask = pitch_classes
            .iter()
            .filter(|&&pc| pc < 12)
            .fold(0u16, |m, &pc| m | (1u16 << pc));
        Self { mask }
    }

    pub fn contains_pitch(&self, pitch: i32) -> bool {
        let pc = pitch.rem_euclid(12);
        self.mask & (1u16 << pc) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }
}

// ---------------------------------------------------------------------------
// Register / ChromaticRange
// ---------------------------------------------------------------------------

/// Comfortable starting pitch for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Register {
    /// Starts at C2 (36).
    #[default]
    Low,
    /// Starts at C3 (48).
    High,
}

impl Register {
    pub fn base_pitch(self) -> u8 {
        match self {
            Register::Low => 36,
            Register::High => 48,
        }
    }
}

impl FromStr for Register {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Register::Low),
            "high" => Ok(Register::High),
            other => Err(format!("unknown register '{other}' (expected low or high)")),
        }
    }
}

/// Semitone-spaced pitches from a base pitch across `octaves` octaves.
///
/// Pitches above 127 are dropped, so the high register at seven octaves
/// yields 80 entries instead of 84.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromaticRange {
    pitches: Vec<u8>,
}

impl ChromaticRange {
    pub fn new(base_pitch: u8, octaves: u8) -> Self {
        let end = base_pitch as u16 + octaves as u16 * 12;
        let pitches = (base_pitch as u16..end)
            .take_while(|&p| p <= MAX_PITCH as u16)
            .map(|p| p as u8)
            .collect();
        Self { pitches }
    }

    pub fn pitches(&self) -> &[u8] {
        &self.pitches
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }
}

// ---------------------------------------------------------------------------
// GalaxyType – fixes the normalisation ceiling
// ---------------------------------------------------------------------------

/// Morphological profile. Only affects the quantisation bin width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GalaxyType {
    #[default]
    Spiral,
    Elliptical,
    Irregular,
    Unclassified,
}

/// Wavelength band used by [`GalaxyType::classify`].
pub const CLASSIFY_BAND: SonificationWindow = SonificationWindow {
    lo: 3800.0,
    hi: 4200.0,
};

impl GalaxyType {
    /// Normalisation ceiling for bin-width computation.
    pub fn ceiling(self, spectrum: &Spectrum) -> f64 {
        match self {
            GalaxyType::Spiral => 8.0,
            GalaxyType::Elliptical => 2.0,
            GalaxyType::Irregular => 5.0,
            GalaxyType::Unclassified => spectrum.intensity_range(),
        }
    }

    /// Guess the morphology from the mean flux between 3800 and 4200 Å.
    ///
    /// Mean above 2 is irregular, above 1 spiral, anything else elliptical.
    /// Spectra with no samples in the band are unclassified.
    pub fn classify(spectrum: &Spectrum) -> GalaxyType {
        let band = window_samples(spectrum, &CLASSIFY_BAND);
        if band.is_empty() {
            return GalaxyType::Unclassified;
        }
        let mean = band.iter().map(|s| s.intensity).sum::<f64>() / band.len() as f64;
        log::debug!("classification band mean {mean:.4} over {} samples", band.len());
        if mean > 2.0 {
            GalaxyType::Irregular
        } else if mean > 1.0 {
            GalaxyType::Spiral
        } else {
            GalaxyType::Elliptical
        }
    }
}

impl FromStr for GalaxyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spiral" => Ok(GalaxyType::Spiral),
            "elliptical" => Ok(GalaxyType::Elliptical),
            "irregular" => Ok(GalaxyType::Irregular),
            "unclassified" => Ok(GalaxyType::Unclassified),
            other => Err(format!("unknown galaxy type '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Pitch names
// ---------------------------------------------------------------------------

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name, `60` → `C4`.
pub fn pitch_name(pitch: u8) -> String {
    let octave = pitch as i32 / 12 - 1;
    format!("{}{octave}", NOTE_NAMES[pitch as usize % 12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromatic_range_spans_octaves() {
        let r = ChromaticRange::new(36, 5);
        assert_eq!(r.len(), 60);
        assert_eq!(r.pitches()[0], 36);
        assert_eq!(*r.pitches().last().unwrap(), 95);
    }

    #[test]
    fn chromatic_range_stops_at_127() {
        let r = ChromaticRange::new(48, 7);
        assert_eq!(r.len(), 80);
        assert_eq!(*r.pitches().last().unwrap(), 127);
    }

    #[test]
    fn scale_membership() {
        let s = ScaleKind::MinorPentatonic.definition();
        assert!(s.contains_pitch(60));
        assert!(s.contains_pitch(63));
        assert!(!s.contains_pitch(61));
        assert!(s.contains_pitch(70));
        assert!(ScaleDefinition::new(&[]).is_empty());
        assert!(ScaleDefinition::new(&[12, 40]).is_empty());
    }

    #[test]
    fn scale_names_round_trip() {
        for kind in ScaleKind::ALL {
            assert_eq!(kind.name().parse::<ScaleKind>().unwrap(), kind);
        }
        assert!("dorian".parse::<ScaleKind>().is_err());
    }

    #[test]
    fn pitch_names() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(69), "A4");
        assert_eq!(pitch_name(36), "C2");
        assert_eq!(pitch_name(0), "C-1");
    }

    #[test]
    fn classify_by_band_mean() {
        let w: Vec<f64> = (0..5).map(|i| 3900.0 + i as f64).collect();
        let spiral = Spectrum::from_columns(&w, &[1.5; 5]).unwrap();
        let elliptical = Spectrum::from_columns(&w, &[0.8; 5]).unwrap();
        let irregular = Spectrum::from_columns(&w, &[2.5; 5]).unwrap();
        assert_eq!(GalaxyType::classify(&spiral), GalaxyType::Spiral);
        assert_eq!(GalaxyType::classify(&elliptical), GalaxyType::Elliptical);
        assert_eq!(GalaxyType::classify(&irregular), GalaxyType::Irregular);

        let red = Spectrum::from_columns(&[6500.0, 6501.0], &[1.0, 1.0]).unwrap();
        assert_eq!(GalaxyType::classify(&red), GalaxyType::Unclassified);
    }

    #[test]
    fn unclassified_ceiling_is_own_range() {
        let sp = Spectrum::from_columns(&[1.0, 2.0, 3.0], &[0.5, 3.5, 1.0]).unwrap();
        assert_eq!(GalaxyType::Unclassified.ceiling(&sp), 3.0);
        assert_eq!(GalaxyType::Spiral.ceiling(&sp), 8.0);
    }
}
