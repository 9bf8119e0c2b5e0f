//! Spectral sonification: turn a galaxy spectrum into emission, absorption
//! and combined MIDI tracks.
//!
//! ```no_run
//! use spectral_sonify::{data::loader, sonify, OutputPaths, SonificationRequest};
//! use std::path::Path;
//!
//! let spectrum = loader::load_spectrum(Path::new("NGC_1300.txt"), 0)?;
//! let run = sonify::sonify(&spectrum, &SonificationRequest::default())?;
//! run.write(&OutputPaths::for_stem(Path::new("output"), "NGC_1300"))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod sonify;

pub use config::{Instrument, NoteValue, SonificationRequest};
pub use data::model::{Sample, SonificationWindow, Spectrum};
pub use error::{Result, SonifyError};
pub use sonify::{OutputPaths, Sonification, SonificationReport};
