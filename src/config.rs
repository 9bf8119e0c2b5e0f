use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::data::model::SonificationWindow;
use crate::error::{Result, SonifyError};
use crate::sonify::baseline::DetectorConfig;
use crate::sonify::scale::{GalaxyType, Register, ScaleKind};

pub const TEMPO_RANGE: std::ops::RangeInclusive<u16> = 40..=240;
pub const OCTAVE_RANGE: std::ops::RangeInclusive<u8> = 1..=7;

// ---------------------------------------------------------------------------
// NoteValue – the five selectable note lengths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteValue {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteValue {
    /// Length in beats.
    pub fn beats(self) -> f64 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
        }
    }
}

impl FromStr for NoteValue {
    type Err = String;

    /// Accepts names (`eighth`) or beat counts (`0.5`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let all = [
            NoteValue::Whole,
            NoteValue::Half,
            NoteValue::Quarter,
            NoteValue::Eighth,
            NoteValue::Sixteenth,
        ];
        if let Ok(beats) = s.parse::<f64>() {
            return all
                .into_iter()
                .find(|v| v.beats() == beats)
                .ok_or_else(|| format!("{beats} beats is not one of 4, 2, 1, 0.5, 0.25"));
        }
        match s.to_ascii_lowercase().as_str() {
            "whole" => Ok(NoteValue::Whole),
            "half" => Ok(NoteValue::Half),
            "quarter" => Ok(NoteValue::Quarter),
            "eighth" => Ok(NoteValue::Eighth),
            "sixteenth" => Ok(NoteValue::Sixteenth),
            other => Err(format!("unknown note value '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Instrument – named General MIDI presets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    Piano,
    AcousticGuitar,
    Violin,
    Trumpet,
    Flute,
    Organ,
    Saxophone,
    Synth,
}

impl Instrument {
    pub const ALL: [Instrument; 8] = [
        Instrument::Piano,
        Instrument::AcousticGuitar,
        Instrument::Violin,
        Instrument::Trumpet,
        Instrument::Flute,
        Instrument::Organ,
        Instrument::Saxophone,
        Instrument::Synth,
    ];

    /// General MIDI program number.
    pub fn program(self) -> u8 {
        match self {
            Instrument::Piano => 0,
            Instrument::AcousticGuitar => 24,
            Instrument::Violin => 40,
            Instrument::Trumpet => 56,
            Instrument::Flute => 73,
            Instrument::Organ => 19,
            Instrument::Saxophone => 65,
            Instrument::Synth => 81,
        }
    }

    /// The catalogue entry for a General MIDI program, if any.
    pub fn from_program(program: u8) -> Option<Instrument> {
        Instrument::ALL.into_iter().find(|i| i.program() == program)
    }

    pub fn register(self) -> Register {
        match self {
            Instrument::Piano | Instrument::AcousticGuitar | Instrument::Organ => Register::Low,
            Instrument::Violin
            | Instrument::Trumpet
            | Instrument::Flute
            | Instrument::Saxophone
            | Instrument::Synth => Register::High,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::AcousticGuitar => "guitar",
            Instrument::Violin => "violin",
            Instrument::Trumpet => "trumpet",
            Instrument::Flute => "flute",
            Instrument::Organ => "organ",
            Instrument::Saxophone => "saxophone",
            Instrument::Synth => "synth",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.program())
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Instrument::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Instrument::ALL.iter().map(|i| i.name()).collect();
                format!("unknown instrument '{s}' (known: {})", names.join(", "))
            })
    }
}

// ---------------------------------------------------------------------------
// SonificationRequest – everything one run needs
// ---------------------------------------------------------------------------

/// Immutable configuration for one sonification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonificationRequest {
    /// Wavelength interval to play; `None` plays the whole spectrum.
    pub window: Option<SonificationWindow>,
    /// Beats per minute.
    pub tempo: u16,
    pub note_value: NoteValue,
    pub emission_program: u8,
    pub absorption_program: u8,
    pub scale: ScaleKind,
    pub octaves: u8,
    /// Starting register; `None` follows the emission instrument.
    pub register: Option<Register>,
    pub galaxy_type: GalaxyType,
    pub detector: DetectorConfig,
}

impl Default for SonificationRequest {
    fn default() -> Self {
        Self {
            window: None,
            tempo: 120,
            note_value: NoteValue::Quarter,
            emission_program: Instrument::Piano.program(),
            absorption_program: Instrument::AcousticGuitar.program(),
            scale: ScaleKind::HarmonicMinor,
            octaves: 5,
            register: None,
            galaxy_type: GalaxyType::Spiral,
            detector: DetectorConfig::default(),
        }
    }
}

impl SonificationRequest {
    /// Read a request from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
    }

    /// Range checks that do not need the spectrum.
    pub fn validate(&self) -> Result<()> {
        if !TEMPO_RANGE.contains(&self.tempo) {
            return Err(SonifyError::InvalidTempo(self.tempo));
        }
        if !OCTAVE_RANGE.contains(&self.octaves) {
            return Err(SonifyError::InvalidOctaves(self.octaves));
        }
        for program in [self.emission_program, self.absorption_program] {
            if program > 127 {
                return Err(SonifyError::InvalidInstrument {
                    program,
                    channel: 0,
                });
            }
        }
        Ok(())
    }

    pub fn note_duration(&self) -> f64 {
        self.note_value.beats()
    }

    /// Explicit register, else the emission instrument's comfortable one,
    /// else low.
    pub fn resolved_register(&self) -> Register {
        self.register.unwrap_or_else(|| {
            Instrument::from_program(self.emission_program)
                .map(Instrument::register)
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let req = SonificationRequest::default();
        assert!(req.validate().is_ok());
        assert_eq!(req.note_duration(), 1.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let req: SonificationRequest = serde_json::from_str(
            r#"{
                "window": { "lo": 6500.0, "hi": 6700.0 },
                "tempo": 200,
                "note_value": "eighth",
                "scale": "minor-pentatonic",
                "galaxy_type": "elliptical",
                "detector": { "window": 50 }
            }"#,
        )
        .unwrap();
        assert_eq!(req.window, Some(SonificationWindow { lo: 6500.0, hi: 6700.0 }));
        assert_eq!(req.note_duration(), 0.5);
        assert_eq!(req.scale, ScaleKind::MinorPentatonic);
        assert_eq!(req.galaxy_type, GalaxyType::Elliptical);
        assert_eq!(req.detector.window, 50);
        assert_eq!(req.detector.smoothing, 10);
        assert_eq!(req.octaves, 5);
    }

    #[test]
    fn range_checks() {
        let slow = SonificationRequest { tempo: 39, ..Default::default() };
        assert!(matches!(slow.validate(), Err(SonifyError::InvalidTempo(39))));
        let deep = SonificationRequest { octaves: 8, ..Default::default() };
        assert!(matches!(deep.validate(), Err(SonifyError::InvalidOctaves(8))));
        let bad = SonificationRequest { absorption_program: 200, ..Default::default() };
        assert!(matches!(
            bad.validate(),
            Err(SonifyError::InvalidInstrument { program: 200, .. })
        ));
    }

    #[test]
    fn note_values_parse() {
        assert_eq!("0.25".parse::<NoteValue>().unwrap(), NoteValue::Sixteenth);
        assert_eq!("Half".parse::<NoteValue>().unwrap(), NoteValue::Half);
        assert!("0.3".parse::<NoteValue>().is_err());
    }

    #[test]
    fn instrument_catalogue() {
        assert_eq!("violin".parse::<Instrument>().unwrap().program(), 40);
        assert_eq!(Instrument::Flute.register(), Register::High);
        assert!("kazoo".parse::<Instrument>().is_err());
        assert_eq!(Instrument::from_program(73), Some(Instrument::Flute));
        assert_eq!(Instrument::from_program(1), None);
    }

    #[test]
    fn register_follows_emission_instrument() {
        let piano = SonificationRequest::default();
        assert_eq!(piano.resolved_register(), Register::Low);

        let flute: SonificationRequest =
            serde_json::from_str(r#"{ "emission_program": 73 }"#).unwrap();
        assert_eq!(flute.register, None);
        assert_eq!(flute.resolved_register(), Register::High);

        let pinned = SonificationRequest { register: Some(Register::Low), ..flute };
        assert_eq!(pinned.resolved_register(), Register::Low);

        // programs outside the catalogue stay low
        let harpsichord = SonificationRequest { emission_program: 6, ..Default::default() };
        assert_eq!(harpsichord.resolved_register(), Register::Low);
    }
}
