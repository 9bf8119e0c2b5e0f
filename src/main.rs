use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use spectral_sonify::config::{Instrument, NoteValue, SonificationRequest};
use spectral_sonify::data::loader;
use spectral_sonify::sonify::scale::{GalaxyType, Register, ScaleKind};
use spectral_sonify::sonify::{self, OutputPaths};
use spectral_sonify::SonificationWindow;

/// Turn a galaxy spectrum into emission, absorption and combined MIDI files
#[derive(Parser)]
#[command(name = "spectral-sonify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Spectrum file (.txt, .dat, .csv, .json, .parquet)
    input: PathBuf,

    /// JSON request file; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which spectrum to use from multi-spectrum files
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Lower wavelength bound of the sonified window
    #[arg(long)]
    lo: Option<f64>,

    /// Upper wavelength bound of the sonified window
    #[arg(long)]
    hi: Option<f64>,

    /// Tempo in BPM (40-240)
    #[arg(short, long)]
    tempo: Option<u16>,

    /// Note length: whole, half, quarter, eighth, sixteenth (or beats)
    #[arg(short, long)]
    note: Option<NoteValue>,

    /// Emission instrument: preset name or GM program number
    #[arg(long)]
    emission: Option<String>,

    /// Absorption instrument: preset name or GM program number
    #[arg(long)]
    absorption: Option<String>,

    /// Scale: harmonic-minor, minor-pentatonic, major, natural-minor, chromatic
    #[arg(short, long)]
    scale: Option<ScaleKind>,

    /// Number of octaves (1-7)
    #[arg(long)]
    octaves: Option<u8>,

    /// Starting register: low (C2) or high (C3); defaults to the emission instrument's
    #[arg(long)]
    register: Option<Register>,

    /// Galaxy profile: spiral, elliptical, irregular, unclassified or auto
    #[arg(short, long)]
    galaxy: Option<String>,

    /// Flat-region detector window in samples
    #[arg(long)]
    detector_window: Option<usize>,

    /// Moving-average width used before flat-region detection
    #[arg(long)]
    smoothing: Option<usize>,

    /// Acceptance band for the flat-region mean, as LO,HI
    #[arg(long, value_delimiter = ',', num_args = 2)]
    band: Option<Vec<f64>>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Base name for output files (default: input file stem)
    #[arg(long)]
    name: Option<String>,

    /// Compute and report without writing any files
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let spectrum = loader::load_spectrum(&cli.input, cli.index)
        .with_context(|| format!("loading {}", cli.input.display()))?;

    let request = build_request(&cli, &spectrum)?;
    log::debug!("request: {request:?}");

    let run = sonify::sonify(&spectrum, &request)
        .with_context(|| format!("sonifying {}", cli.input.display()))?;

    let outputs = if cli.dry_run {
        None
    } else {
        let stem = cli.name.clone().unwrap_or_else(|| {
            cli.input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "spectrum".to_string())
        });
        let paths = OutputPaths::for_stem(&cli.output_dir, &stem);
        run.write(&paths).context("writing MIDI files")?;
        Some(paths)
    };

    let report = run.report(outputs);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

/// Merge the optional config file with command-line overrides.
fn build_request(cli: &Cli, spectrum: &spectral_sonify::Spectrum) -> Result<SonificationRequest> {
    let mut req = match &cli.config {
        Some(path) => SonificationRequest::from_json_file(path)?,
        None => SonificationRequest::default(),
    };

    if cli.lo.is_some() || cli.hi.is_some() {
        let current = req
            .window
            .unwrap_or_else(|| SonificationWindow::full(spectrum));
        req.window = Some(SonificationWindow {
            lo: cli.lo.unwrap_or(current.lo),
            hi: cli.hi.unwrap_or(current.hi),
        });
    }
    if let Some(tempo) = cli.tempo {
        req.tempo = tempo;
    }
    if let Some(note) = cli.note {
        req.note_value = note;
    }
    if let Some(arg) = &cli.emission {
        req.emission_program = parse_instrument(arg)?;
    }
    if let Some(arg) = &cli.absorption {
        req.absorption_program = parse_instrument(arg)?;
    }
    if let Some(scale) = cli.scale {
        req.scale = scale;
    }
    if let Some(octaves) = cli.octaves {
        req.octaves = octaves;
    }
    if let Some(register) = cli.register {
        req.register = Some(register);
    }
    if let Some(galaxy) = &cli.galaxy {
        req.galaxy_type = if galaxy.eq_ignore_ascii_case("auto") {
            let guessed = GalaxyType::classify(spectrum);
            log::info!("classified spectrum as {guessed:?}");
            guessed
        } else {
            galaxy.parse::<GalaxyType>().map_err(anyhow::Error::msg)?
        };
    }
    if let Some(w) = cli.detector_window {
        req.detector.window = w;
    }
    if let Some(s) = cli.smoothing {
        req.detector.smoothing = s;
    }
    if let Some(band) = &cli.band {
        if let [lo, hi] = band.as_slice() {
            req.detector.band_lo = *lo;
            req.detector.band_hi = *hi;
        }
    }
    Ok(req)
}

/// Preset name (`violin`) or raw program number (`40`).
fn parse_instrument(arg: &str) -> Result<u8> {
    if let Ok(program) = arg.parse::<u8>() {
        return Ok(program);
    }
    let inst: Instrument = arg.parse().map_err(anyhow::Error::msg)?;
    Ok(inst.program())
}
