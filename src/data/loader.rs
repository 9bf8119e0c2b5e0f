use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Spectrum;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load every spectrum stored in a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.txt` / `.dat` – two columns (wavelength, intensity), whitespace or
///   `;` separated, `#` comments, optional header line (NED exports)
/// * `.csv`          – two columns, `,` or `;` separated, optional header
/// * `.json`         – `{ "wavelength": [...], "intensity": [...] }` or
///   `[{ "x": [...], "y": [...] }, ...]`
/// * `.parquet`      – `x` and `y` list columns, one spectrum per row
pub fn load_file(path: &Path) -> Result<Vec<Spectrum>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let spectra = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        "txt" | "dat" | "" => load_text(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    if spectra.is_empty() {
        bail!("{} contains no spectra", path.display());
    }
    log::debug!("loaded {} spectra from {}", spectra.len(), path.display());
    Ok(spectra)
}

/// Load a single spectrum, picking the `index`-th one from multi-spectrum files.
pub fn load_spectrum(path: &Path, index: usize) -> Result<Spectrum> {
    let mut spectra = load_file(path)?;
    let count = spectra.len();
    if index >= count {
        bail!("{} holds {count} spectra, index {index} is out of range", path.display());
    }
    Ok(spectra.swap_remove(index))
}

// ---------------------------------------------------------------------------
// Column text loaders (.txt / .dat / .csv)
// ---------------------------------------------------------------------------

fn load_text(path: &Path) -> Result<Vec<Spectrum>> {
    let text = std::fs::read_to_string(path).context("reading spectrum text file")?;
    Ok(vec![parse_columns(&text, None)?])
}

fn load_csv(path: &Path) -> Result<Vec<Spectrum>> {
    let text = std::fs::read_to_string(path).context("reading CSV")?;
    let first = first_data_line(&text).unwrap_or("");
    let delimiter = if first.contains(';') { b';' } else { b',' };
    Ok(vec![parse_columns(&text, Some(delimiter))?])
}

/// Parse two-column spectrum text.
///
/// With `delimiter == None` the separator is sniffed from the first data
/// line: `;` when present, runs of whitespace otherwise. A first line that
/// does not start with two numbers is treated as a header and skipped.
pub fn parse_columns(text: &str, delimiter: Option<u8>) -> Result<Spectrum> {
    let delimiter = delimiter.or_else(|| {
        first_data_line(text)
            .filter(|line| line.contains(';'))
            .map(|_| b';')
    });

    let rows = match delimiter {
        Some(d) => delimited_rows(text, d)?,
        None => whitespace_rows(text),
    };

    let mut wavelengths = Vec::with_capacity(rows.len());
    let mut intensities = Vec::with_capacity(rows.len());

    for (row_no, (line_no, fields)) in rows.iter().enumerate() {
        let parsed = parse_pair(fields);
        match parsed {
            Some((w, i)) => {
                wavelengths.push(w);
                intensities.push(i);
            }
            // header sniffing: only the very first row may be non-numeric
            None if row_no == 0 => log::debug!("skipping header line {line_no}"),
            None => bail!("line {line_no}: expected two numeric columns, got {fields:?}"),
        }
    }

    Spectrum::from_columns(&wavelengths, &intensities).context("building spectrum")
}

fn first_data_line(text: &str) -> Option<&str> {
    text.lines().map(strip_comment).find(|l| !l.is_empty())
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

fn whitespace_rows(text: &str) -> Vec<(usize, Vec<String>)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, strip_comment(l)))
        .filter(|(_, l)| !l.is_empty())
        .map(|(i, l)| (i, l.split_whitespace().map(str::to_string).collect()))
        .collect()
}

fn delimited_rows(text: &str, delimiter: u8) -> Result<Vec<(usize, Vec<String>)>> {
    // keep one output line per input line so record positions stay valid
    let cleaned = text.lines().map(strip_comment).collect::<Vec<_>>().join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("reading delimited row")?;
        let line_no = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push((line_no, fields));
    }
    Ok(rows)
}

fn parse_pair(fields: &[String]) -> Option<(f64, f64)> {
    let w = fields.first()?.parse::<f64>().ok()?;
    let i = fields.get(1)?.parse::<f64>().ok()?;
    Some((w, i))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Two accepted layouts:
///
/// ```json
/// { "wavelength": [6500.0, 6501.0], "intensity": [0.98, 1.02] }
/// ```
///
/// or records-oriented (`df.to_json(orient='records')`):
///
/// ```json
/// [ { "x": [6500.0, 6501.0], "y": [0.98, 1.02], "name": "NGC 1300" } ]
/// ```
fn load_json(path: &Path) -> Result<Vec<Spectrum>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    json_to_spectra(&root)
}

fn json_to_spectra(root: &JsonValue) -> Result<Vec<Spectrum>> {
    if let Some(obj) = root.as_object() {
        let w = json_array_to_f64(obj.get("wavelength").or(obj.get("x")), 0, "wavelength")?;
        let i = json_array_to_f64(obj.get("intensity").or(obj.get("y")), 0, "intensity")?;
        return Ok(vec![Spectrum::from_columns(&w, &i)?]);
    }

    let records = root
        .as_array()
        .context("Expected a JSON object or a top-level JSON array")?;

    let mut spectra = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let x = json_array_to_f64(obj.get("x"), i, "x")?;
        let y = json_array_to_f64(obj.get("y"), i, "y")?;

        let spectrum =
            Spectrum::from_columns(&x, &y).with_context(|| format!("Row {i}"))?;
        spectra.push(spectrum);
    }

    Ok(spectra)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Expected schema:
/// - `x`: List<Float64> or LargeList<Float64> – wavelength arrays
/// - `y`: List<Float64> or LargeList<Float64> – intensity arrays
/// - Any other columns are ignored
fn load_parquet(path: &Path) -> Result<Vec<Spectrum>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut spectra = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let x_idx = schema
            .index_of("x")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'x' column"))?;
        let y_idx = schema
            .index_of("y")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'y' column"))?;

        let x_col = batch.column(x_idx);
        let y_col = batch.column(y_idx);

        for row in 0..batch.num_rows() {
            let x = extract_f64_list(x_col, row)
                .with_context(|| format!("Row {row}: failed to read 'x'"))?;
            let y = extract_f64_list(y_col, row)
                .with_context(|| format!("Row {row}: failed to read 'y'"))?;

            spectra.push(Spectrum::from_columns(&x, &y).with_context(|| format!("Row {row}"))?);
        }
    }

    Ok(spectra)
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Nulls become NaN and are then rejected by `Spectrum::new`.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float32Builder, Float64Builder, LargeListBuilder, ListBuilder};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn write_parquet(path: &Path, x: ArrayRef, y: ArrayRef) {
        let batch = RecordBatch::try_from_iter([("x", x), ("y", y)]).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn f64_list(rows: &[&[Option<f64>]]) -> ArrayRef {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for row in rows {
            for &v in *row {
                builder.values().append_option(v);
            }
            builder.append(true);
        }
        Arc::new(builder.finish())
    }

    fn wavelengths(sp: &Spectrum) -> Vec<f64> {
        sp.samples().iter().map(|s| s.wavelength).collect()
    }

    #[test]
    fn whitespace_with_header_and_comments() {
        let text = "# NED spectrum\nlambda flux\n4000.0   0.5\n4001.0\t1.5 # peak\n\n4002.0 0.9\n";
        let sp = parse_columns(text, None).unwrap();
        assert_eq!(wavelengths(&sp), vec![4000.0, 4001.0, 4002.0]);
        assert_eq!(sp.max_intensity(), 1.5);
    }

    #[test]
    fn semicolon_is_sniffed() {
        let text = "4000;0.5\n4001;1.5\n4002;0.9\n";
        let sp = parse_columns(text, None).unwrap();
        assert_eq!(sp.len(), 3);
        assert_eq!(sp.min_intensity(), 0.5);
    }

    #[test]
    fn delimited_rows_strip_trailing_comments() {
        let text = "# exported\n4000;0.5 # continuum\n4001;1.5\n# gap\n4002;0.9#edge\n";
        let sp = parse_columns(text, None).unwrap();
        assert_eq!(wavelengths(&sp), vec![4000.0, 4001.0, 4002.0]);
        assert_eq!(sp.samples()[2].intensity, 0.9);
    }

    #[test]
    fn comma_csv_with_header() {
        let text = "wavelength,intensity\n6500,1.0\n6501,2.0\n";
        let sp = parse_columns(text, Some(b',')).unwrap();
        assert_eq!(wavelengths(&sp), vec![6500.0, 6501.0]);
    }

    #[test]
    fn garbage_after_first_line_is_an_error() {
        let text = "4000 0.5\nnot numbers\n";
        assert!(parse_columns(text, None).is_err());
    }

    #[test]
    fn json_layouts() {
        let obj: JsonValue =
            serde_json::from_str(r#"{"wavelength":[1.0,2.0],"intensity":[3.0,4.0]}"#).unwrap();
        assert_eq!(json_to_spectra(&obj).unwrap().len(), 1);

        let records: JsonValue = serde_json::from_str(
            r#"[{"x":[1.0,2.0],"y":[3.0,4.0],"name":"a"},{"x":[5.0],"y":[6.0]}]"#,
        )
        .unwrap();
        let spectra = json_to_spectra(&records).unwrap();
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[1].min_intensity(), 6.0);
    }

    #[test]
    fn json_length_mismatch_fails() {
        let obj: JsonValue = serde_json::from_str(r#"{"x":[1.0,2.0],"y":[3.0]}"#).unwrap();
        assert!(json_to_spectra(&obj).is_err());
    }

    #[test]
    fn parquet_rows_become_spectra() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("galaxies.parquet");

        let x = f64_list(&[&[Some(4000.0), Some(4001.0), Some(4002.0)], &[Some(6500.0), Some(6501.0)]]);
        let mut y = ListBuilder::new(Float32Builder::new());
        for row in [&[0.5f32, 1.5, 0.25][..], &[2.0, 1.0][..]] {
            for &v in row {
                y.values().append_value(v);
            }
            y.append(true);
        }
        write_parquet(&path, x, Arc::new(y.finish()));

        let spectra = load_file(&path).unwrap();
        assert_eq!(spectra.len(), 2);
        assert_eq!(wavelengths(&spectra[0]), vec![4000.0, 4001.0, 4002.0]);
        assert_eq!(spectra[0].intensities(), vec![0.5, 1.5, 0.25]);
        assert_eq!(spectra[1].wavelength_bounds(), (6500.0, 6501.0));

        let second = load_spectrum(&path, 1).unwrap();
        assert_eq!(second.max_intensity(), 2.0);
        let err = load_spectrum(&path, 2).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn parquet_large_lists_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.parquet");

        let mut x = LargeListBuilder::new(Float64Builder::new());
        let mut y = LargeListBuilder::new(Float64Builder::new());
        for (w, i) in [(5000.0, 1.0), (5001.0, 1.25)] {
            x.values().append_value(w);
            y.values().append_value(i);
        }
        x.append(true);
        y.append(true);
        write_parquet(&path, Arc::new(x.finish()), Arc::new(y.finish()));

        let sp = load_spectrum(&path, 0).unwrap();
        assert_eq!(wavelengths(&sp), vec![5000.0, 5001.0]);
        assert_eq!(sp.max_intensity(), 1.25);
    }

    #[test]
    fn parquet_null_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holes.parquet");
        let x = f64_list(&[&[Some(4000.0), Some(4001.0)]]);
        let y = f64_list(&[&[Some(1.0), None]]);
        write_parquet(&path, x, y);

        assert!(load_file(&path).is_err());
    }
}
