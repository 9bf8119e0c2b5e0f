/// Data layer: spectrum types, loading, and window selection.
///
/// Architecture:
/// ```text
///  .txt / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<Spectrum>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Spectrum  │  sorted samples, global intensity extrema
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  window   │  [lo, hi] → sample slice to sonify
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod window;
