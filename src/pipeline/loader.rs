//! Dataset loader for CSV and Parquet files

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::path::Path;

/// Load a dataset eagerly, with a spinner for CSV parsing
///
/// # Arguments
/// * `path` - Input file; format is decided by the extension
/// * `infer_schema_length` - Rows scanned for CSV schema inference
///
/// # Returns
/// The DataFrame plus row count, column count, and estimated memory in MB
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let df = match extension.as_str() {
        "csv" => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            spinner.set_message(format!("Loading {}", path.display()));
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));

            // 0 means scan the whole file for schema inference
            let schema_length = if infer_schema_length == 0 {
                None
            } else {
                Some(infer_schema_length)
            };

            let df = CsvReadOptions::default()
                .with_infer_schema_length(schema_length)
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))
                .with_context(|| format!("Failed to open CSV file: {}", path.display()))?
                .finish()
                .with_context(|| format!("Failed to load CSV file: {}", path.display()))?;

            spinner.finish_and_clear();
            df
        }
        "parquet" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            ParquetReader::new(file)
                .finish()
                .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?
        }
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);

    Ok((df, rows, cols, memory_mb))
}

/// Read just the column names of a dataset without loading the data
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let mut lf = scan_dataset(path)?;
    let schema = lf
        .collect_schema()
        .with_context(|| format!("Failed to read schema from {}", path.display()))?;
    Ok(schema.iter_names().map(|name| name.to_string()).collect())
}

/// Open a lazy scan over a dataset (CSV or Parquet based on extension)
fn scan_dataset(path: &Path) -> Result<LazyFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}
