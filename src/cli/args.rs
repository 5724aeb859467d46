//! Command-line argument definitions using clap

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rfvkit - Segment customers by recency, frequency and monetary value
#[derive(Parser, Debug)]
#[command(name = "rfvkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input transaction file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Customer identifier column
    #[arg(long, default_value = "ID_cliente")]
    pub customer_col: String,

    /// Purchase date column.
    /// Accepts date/datetime columns or strings like 2024-01-31.
    #[arg(long, default_value = "DiaCompra")]
    pub date_col: String,

    /// Transaction amount column
    #[arg(long, default_value = "ValorTotal")]
    pub amount_col: String,

    /// Reference date for recency in YYYY-MM-DD format.
    /// Recency is the number of days from a customer's most recent purchase
    /// to this date. Defaults to today.
    #[arg(long, value_parser = validate_reference_date)]
    pub reference_date: Option<NaiveDate>,

    /// Number of clusters for k-means over the standardized RFV features
    #[arg(short = 'k', long = "clusters", default_value = "4", value_parser = validate_cluster_count)]
    pub clusters: usize,

    /// Random seed for reproducible clustering
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Independent k-means restarts; the lowest-inertia run wins
    #[arg(long, default_value = "10")]
    pub n_init: usize,

    /// Skip the clustering stage entirely
    #[arg(long, default_value = "false")]
    pub skip_clustering: bool,

    /// JSON file mapping composite codes to marketing actions.
    /// Defaults to the built-in rule table when not provided.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_rfv' suffix (e.g., sales.csv -> sales_rfv.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write a JSON run report next to the output table
    #[arg(long, default_value = "false")]
    pub report: bool,

    /// Bundle the result table and JSON report into a zip archive
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Higher values improve type detection for ambiguous columns but may be slower.
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a CSV file to Parquet format
    Convert {
        /// Input CSV file path
        input: PathBuf,

        /// Output file path (optional, defaults to input with .parquet extension)
        output: Option<PathBuf>,

        /// Number of rows to use for schema inference.
        /// Use 0 for full table scan (very slow for large files).
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },
}

#[allow(dead_code)]
impl Cli {
    /// Get the input path, if one was provided.
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Get the output path, deriving from input if not explicitly provided.
    /// The derived path will be in the same directory as the input with a '_rfv' suffix.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(self.output.clone().unwrap_or_else(|| {
            let parent = input.parent().unwrap_or_else(|| std::path::Path::new("."));
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            let extension = input
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("csv");
            parent.join(format!("{}_rfv.{}", stem, extension))
        }))
    }

    /// Get the JSON report path, derived from the resolved output path.
    pub fn report_path(&self) -> Option<PathBuf> {
        let output = self.output_path()?;
        let parent = output.parent().unwrap_or_else(|| std::path::Path::new("."));
        let stem = output.file_stem().and_then(|s| s.to_str())?;
        Some(parent.join(format!("{}_report.json", stem)))
    }

    /// Get the zip bundle path, derived from the resolved output path.
    pub fn bundle_path(&self) -> Option<PathBuf> {
        let output = self.output_path()?;
        let parent = output.parent().unwrap_or_else(|| std::path::Path::new("."));
        let stem = output.file_stem().and_then(|s| s.to_str())?;
        Some(parent.join(format!("{}_bundle.zip", stem)))
    }
}

/// Validator for the reference date parameter
fn validate_reference_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a valid date (expected YYYY-MM-DD)", s))
}

/// Validator for the cluster count parameter
fn validate_cluster_count(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid cluster count", s))?;

    if value < 2 {
        Err(format!("clusters must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}
