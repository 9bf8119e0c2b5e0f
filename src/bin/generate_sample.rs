//! Writes synthetic galaxy spectra for trying out the sonifier:
//! one NED-style text file per morphology plus a parquet file holding all
//! of them as rows.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Quiet stretch of continuum (Å) with no ripple and a quarter of the noise.
/// The baseline detector needs at least one such stretch to lock onto.
const QUIET_BAND: (f64, f64) = (5250.0, 5650.0);
/// Instrumental ripple on the rest of the continuum.
const RIPPLE_PERIOD: f64 = 200.0;
const RIPPLE_AMPLITUDE: f64 = 0.1;
const NOISE_LEVEL: f64 = 0.01;

fn in_quiet_band(wl: f64) -> bool {
    wl >= QUIET_BAND.0 && wl <= QUIET_BAND.1
}

/// Multiplicative ripple, zero inside the quiet band. The band spans whole
/// periods so the ripple meets it at a zero crossing.
fn ripple(wl: f64) -> f64 {
    if in_quiet_band(wl) {
        return 0.0;
    }
    let phase = 2.0 * std::f64::consts::PI * (wl - QUIET_BAND.0) / RIPPLE_PERIOD;
    RIPPLE_AMPLITUDE * phase.sin()
}

/// Rippled continuum with a gentle slope plus Gaussian lines (negative
/// amplitude for absorption).
fn generate_spectrum(wavelengths: &[f64], profile: &Profile, rng: &mut SimpleRng) -> Vec<f64> {
    let mid = wavelengths.iter().sum::<f64>() / wavelengths.len() as f64;
    wavelengths
        .iter()
        .map(|&wl| {
            let base = profile.continuum * (1.0 + ripple(wl)) + profile.slope * (wl - mid);
            let signal: f64 = profile
                .lines
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp))
                .sum();
            let noise = if in_quiet_band(wl) {
                NOISE_LEVEL * 0.25
            } else {
                NOISE_LEVEL
            };
            base + signal + rng.gauss(0.0, noise)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Profile {
    name: &'static str,
    continuum: f64,
    slope: f64,
    lines: Vec<(f64, f64, f64)>,
}

fn profiles() -> Vec<Profile> {
    vec![
        Profile {
            name: "spiral",
            continuum: 1.0,
            slope: 0.0,
            lines: vec![
                (3934.0, 6.0, -0.35), // Ca II K
                (3968.0, 6.0, -0.30), // Ca II H
                (4861.0, 4.0, 0.6),   // H-beta
                (5007.0, 4.0, 0.8),   // [O III]
                (6548.0, 3.0, 0.5),   // [N II]
                (6563.0, 4.0, 2.5),   // H-alpha
                (6583.0, 3.0, 1.1),   // [N II]
            ],
        },
        Profile {
            name: "elliptical",
            continuum: 1.0,
            slope: 0.0001,
            lines: vec![
                (3934.0, 8.0, -0.5),
                (3968.0, 8.0, -0.45),
                (4304.0, 10.0, -0.25), // G band
                (5175.0, 12.0, -0.3),  // Mg b
                (5893.0, 8.0, -0.25),  // Na D
            ],
        },
        Profile {
            name: "irregular",
            continuum: 1.0,
            slope: -0.0002,
            lines: vec![
                (4341.0, 3.0, 0.9),  // H-gamma
                (4861.0, 3.0, 1.8),
                (4959.0, 3.0, 1.5),  // [O III]
                (5007.0, 3.0, 4.0),
                (6563.0, 3.0, 4.5),
                (6717.0, 3.0, 0.7),  // [S II]
                (6731.0, 3.0, 0.6),
            ],
        },
    ]
}

/// 3700 → 7000 Å, step 2
fn wavelength_grid() -> Vec<f64> {
    (0..=1650).map(|i| 3700.0 + i as f64 * 2.0).collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);
    let wavelengths = wavelength_grid();

    let mut all_y: Vec<Vec<f64>> = Vec::new();
    let mut names: Vec<&str> = Vec::new();

    for profile in profiles() {
        let y = generate_spectrum(&wavelengths, &profile, &mut rng);

        // NED-style two-column text with a header line
        let mut text = String::from("# synthetic galaxy spectrum\nwavelength flux\n");
        for (wl, flux) in wavelengths.iter().zip(&y) {
            writeln!(text, "{wl:.1} {flux:.6}")?;
        }
        let txt_path = format!("sample_{}.txt", profile.name);
        std::fs::write(&txt_path, text).with_context(|| format!("writing {txt_path}"))?;
        log::info!("wrote {txt_path}");

        all_y.push(y);
        names.push(profile.name);
    }

    // Build Arrow arrays
    let mut x_builder = ListBuilder::new(Float64Builder::new());
    for _ in &all_y {
        let values = x_builder.values();
        for &v in &wavelengths {
            values.append_value(v);
        }
        x_builder.append(true);
    }
    let x_array = x_builder.finish();

    let mut y_builder = ListBuilder::new(Float64Builder::new());
    for row in &all_y {
        let values = y_builder.values();
        for &v in row {
            values.append_value(v);
        }
        y_builder.append(true);
    }
    let y_array = y_builder.finish();

    let name_array = StringArray::from(names.clone());

    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("y", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("galaxy", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(x_array), Arc::new(y_array), Arc::new(name_array)],
    )
    .context("creating record batch")?;

    // Write Parquet
    let output_path = "sample_galaxies.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!(
        "Wrote {} spectra ({} samples each) to {output_path} and sample_<type>.txt",
        names.len(),
        wavelengths.len()
    );
    Ok(())
}
