use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a sonification request.
#[derive(Debug, Error)]
pub enum SonifyError {
    /// No sliding window satisfied the flat-region criteria.
    #[error("no flat region found (window {window}, band {band_lo}..={band_hi})")]
    NoFlatRegion {
        window: usize,
        band_lo: f64,
        band_hi: f64,
    },

    /// Detector window is zero or longer than the spectrum.
    #[error("detector window of {size} samples is invalid for a spectrum of {len} samples")]
    InvalidWindow { size: usize, len: usize },

    /// Program number or channel outside the container's limits.
    #[error("invalid instrument: program {program} on channel {channel}")]
    InvalidInstrument { program: u8, channel: u8 },

    /// Sonification window reversed or outside the spectrum.
    #[error("wavelength window {lo}..={hi} is outside the spectrum range {min}..={max}")]
    InvalidRange { lo: f64, hi: f64, min: f64, max: f64 },

    #[error("tempo {0} BPM is outside 40..=240")]
    InvalidTempo(u16),

    #[error("octave count {0} is outside 1..=7")]
    InvalidOctaves(u8),

    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(String),

    /// Container could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = SonifyError> = std::result::Result<T, E>;
