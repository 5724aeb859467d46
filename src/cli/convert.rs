//! CSV to Parquet conversion utility with streaming support

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use polars::prelude::*;

use crate::utils::create_spinner;

/// Convert a transaction CSV to Parquet without materializing it in memory
///
/// # Arguments
/// * `input` - Path to the input CSV file
/// * `output` - Optional output path; defaults to the input path with a .parquet extension
/// * `infer_schema_length` - Number of rows to use for schema inference (0 scans everything)
pub fn run_convert(input: &Path, output: Option<&Path>, infer_schema_length: usize) -> Result<()> {
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let parent = input.parent().unwrap_or_else(|| Path::new("."));
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}.parquet", stem))
        }
    };

    println!("\n {} Converting CSV to Parquet", style("◆").cyan().bold());
    println!("   Input:  {}", style(input.display()).dim());
    println!("   Output: {}", style(output_path.display()).dim());
    println!();

    // Schema length 0 means full scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let spinner = create_spinner("Reading CSV schema...");
    let lf = LazyCsvReader::new(input)
        .with_infer_schema_length(schema_length)
        .with_rechunk(false)
        .finish()
        .with_context(|| format!("Failed to read CSV file: {}", input.display()))?;

    let schema = lf.clone().collect_schema()?;
    let num_cols = schema.len();
    spinner.finish_with_message(format!(
        "{} Schema loaded ({} columns)",
        style("✓").green(),
        num_cols
    ));

    // Stream straight to Parquet; row groups sized for scan performance
    let spinner = create_spinner("Streaming to Parquet...");
    let parquet_options = ParquetWriteOptions {
        compression: ParquetCompression::Snappy,
        statistics: StatisticsOptions::full(),
        row_group_size: Some(100_000),
        ..Default::default()
    };

    lf.sink_parquet(&output_path, parquet_options, None)
        .with_context(|| format!("Failed to write Parquet file: {}", output_path.display()))?;

    spinner.finish_with_message(format!("{} Parquet written", style("✓").green()));

    let input_size = file_size_mb(input);
    let output_size = file_size_mb(&output_path);

    println!();
    println!("   {} File sizes:", style("✧").cyan());
    println!("      CSV:     {:.2} MB", input_size);
    println!("      Parquet: {:.2} MB", output_size);

    if output_size < input_size && input_size > 0.0 {
        let reduction = ((input_size - output_size) / input_size) * 100.0;
        println!(
            "      {}",
            style(format!("↓ {:.1}% smaller", reduction)).green()
        );
    }

    println!();
    println!(" {} Conversion complete!", style("✓").green().bold());

    Ok(())
}

fn file_size_mb(path: &Path) -> f64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0) as f64 / (1024.0 * 1024.0)
}
