//! Sonification engine.
//!
//! Pipeline:
//! ```text
//!   Spectrum ──► baseline ──► (mean, std)
//!      │                          │
//!      ▼                          ▼
//!   window ──► quantize ──► sequencer ──► emission / absorption / combined
//!                                                   │
//!                                                   ▼
//!                                                 midi  → three .mid files
//! ```

pub mod baseline;
pub mod midi;
pub mod quantize;
pub mod scale;
pub mod sequencer;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::SonificationRequest;
use crate::data::model::{SonificationWindow, Spectrum};
use crate::data::window::window_samples;
use crate::error::{Result, SonifyError};

use baseline::Baseline;
use quantize::Quantizer;
use scale::{pitch_name, ChromaticRange, GalaxyType, Register, ScaleKind};
use sequencer::{StreamSet, Voicing};

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Result of one run, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct Sonification {
    pub window: SonificationWindow,
    pub baseline: Baseline,
    pub galaxy_type: GalaxyType,
    pub scale: ScaleKind,
    pub register: Register,
    pub quantizer: Quantizer,
    pub streams: StreamSet,
}

/// Run baseline detection, quantisation and sequencing for one request.
pub fn sonify(spectrum: &Spectrum, request: &SonificationRequest) -> Result<Sonification> {
    request.validate()?;

    let window = request
        .window
        .unwrap_or_else(|| SonificationWindow::full(spectrum));
    window.validate(spectrum)?;

    let baseline = baseline::estimate(spectrum, &request.detector)?;

    let register = request.resolved_register();
    let range = ChromaticRange::new(register.base_pitch(), request.octaves);
    let quantizer = Quantizer::new(
        range,
        request.scale.definition(),
        spectrum.min_intensity(),
        request.galaxy_type.ceiling(spectrum),
    );

    let samples = window_samples(spectrum, &window);
    log::info!(
        "sonifying {} samples in {:.1}..{:.1} as {:?}",
        samples.len(),
        window.lo,
        window.hi,
        request.galaxy_type
    );

    let voicing = Voicing {
        tempo: request.tempo,
        note_duration: request.note_duration(),
        emission_program: request.emission_program,
        absorption_program: request.absorption_program,
    };
    let streams = sequencer::sequence(samples, &quantizer, baseline.mean, &voicing);

    Ok(Sonification {
        window,
        baseline,
        galaxy_type: request.galaxy_type,
        scale: request.scale,
        register,
        quantizer,
        streams,
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Destinations of the three containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub emission: PathBuf,
    pub absorption: PathBuf,
    pub combined: PathBuf,
}

impl OutputPaths {
    /// `<dir>/<stem>_emission.mid`, `<dir>/<stem>_absorption.mid`,
    /// `<dir>/<stem>_combined.mid`.
    pub fn for_stem(dir: &Path, stem: &str) -> Self {
        Self {
            emission: dir.join(format!("{stem}_emission.mid")),
            absorption: dir.join(format!("{stem}_absorption.mid")),
            combined: dir.join(format!("{stem}_combined.mid")),
        }
    }
}

impl Sonification {
    /// Encode all three streams, then write them. Nothing is written if any
    /// stream fails to encode.
    pub fn write(&self, paths: &OutputPaths) -> Result<()> {
        let encoded = [
            (midi::encode(&self.streams.emission)?, &paths.emission),
            (midi::encode(&self.streams.absorption)?, &paths.absorption),
            (midi::encode(&self.streams.combined)?, &paths.combined),
        ];

        for (_, path) in &encoded {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(|source| SonifyError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        for (bytes, path) in &encoded {
            midi::write_atomic(bytes, path)?;
        }
        Ok(())
    }

    /// Summary of the run for display or JSON output.
    pub fn report(&self, outputs: Option<OutputPaths>) -> SonificationReport {
        let pitches: Vec<u8> = self.streams.combined.events.iter().map(|e| e.pitch).collect();
        SonificationReport {
            galaxy_type: self.galaxy_type,
            scale: self.scale,
            register: self.register,
            window: self.window,
            baseline: self.baseline,
            bin_width: self.quantizer.bin_width(),
            samples: self.streams.combined.len(),
            emission_notes: self.streams.emission.sounding().count(),
            absorption_notes: self.streams.absorption.sounding().count(),
            lowest_note: pitches.iter().min().map(|&p| pitch_name(p)),
            highest_note: pitches.iter().max().map(|&p| pitch_name(p)),
            outputs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SonificationReport {
    pub galaxy_type: GalaxyType,
    pub scale: ScaleKind,
    pub register: Register,
    pub window: SonificationWindow,
    pub baseline: Baseline,
    pub bin_width: f64,
    pub samples: usize,
    pub emission_notes: usize,
    pub absorption_notes: usize,
    pub lowest_note: Option<String>,
    pub highest_note: Option<String>,
    pub outputs: Option<OutputPaths>,
}

impl fmt::Display for SonificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "galaxy type : {:?}", self.galaxy_type)?;
        writeln!(f, "scale       : {}", self.scale)?;
        writeln!(f, "register    : {:?}", self.register)?;
        writeln!(f, "window      : {:.1} .. {:.1} Å", self.window.lo, self.window.hi)?;
        writeln!(
            f,
            "baseline    : mean {:.4}, std {:.4} (flat at {:.1} .. {:.1} Å)",
            self.baseline.mean,
            self.baseline.std_dev,
            self.baseline.wavelength_lo,
            self.baseline.wavelength_hi
        )?;
        writeln!(f, "bin width   : {:.6}", self.bin_width)?;
        writeln!(
            f,
            "samples     : {} ({} emission, {} absorption)",
            self.samples, self.emission_notes, self.absorption_notes
        )?;
        if let (Some(lo), Some(hi)) = (&self.lowest_note, &self.highest_note) {
            writeln!(f, "notes       : {lo} .. {hi}")?;
        }
        if let Some(out) = &self.outputs {
            writeln!(f, "emission    : {}", out.emission.display())?;
            writeln!(f, "absorption  : {}", out.absorption.display())?;
            writeln!(f, "combined    : {}", out.combined.display())?;
        }
        Ok(())
    }
}
