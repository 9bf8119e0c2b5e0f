use std::ops::Range;

use super::model::{Sample, SonificationWindow, Spectrum};

// ---------------------------------------------------------------------------
// Window selection: which samples fall inside [lo, hi]
// ---------------------------------------------------------------------------

/// Index range of the samples whose wavelength lies in the window.
///
/// Both bounds are inclusive, so a window equal to the spectrum's own
/// wavelength bounds selects every sample. Relies on the spectrum being
/// sorted by wavelength.
pub fn window_indices(spectrum: &Spectrum, window: &SonificationWindow) -> Range<usize> {
    let samples = spectrum.samples();
    let start = samples.partition_point(|s| s.wavelength < window.lo);
    let end = samples.partition_point(|s| s.wavelength <= window.hi);
    start..end.max(start)
}

/// The samples inside the window, in wavelength order.
pub fn window_samples<'a>(spectrum: &'a Spectrum, window: &SonificationWindow) -> &'a [Sample] {
    &spectrum.samples()[window_indices(spectrum, window)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum() -> Spectrum {
        Spectrum::from_columns(
            &[4000.0, 4001.0, 4002.0, 4003.0, 4004.0],
            &[0.5, 1.5, 0.9, 1.1, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn exact_bounds_include_endpoints() {
        let sp = spectrum();
        let w = SonificationWindow::full(&sp);
        assert_eq!(window_indices(&sp, &w), 0..5);
    }

    #[test]
    fn interior_window() {
        let sp = spectrum();
        let w = SonificationWindow { lo: 4000.5, hi: 4003.0 };
        let picked: Vec<f64> = window_samples(&sp, &w).iter().map(|s| s.wavelength).collect();
        assert_eq!(picked, vec![4001.0, 4002.0, 4003.0]);
    }

    #[test]
    fn window_between_samples_is_empty() {
        let sp = spectrum();
        let w = SonificationWindow { lo: 4001.2, hi: 4001.8 };
        assert!(window_samples(&sp, &w).is_empty());
    }
}
