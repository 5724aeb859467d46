//! Segmentation run report generation
//!
//! Produces a JSON report documenting one run: configuration, quartile
//! thresholds, segment distribution, action coverage and clustering outcome.
//! Also owns saving the result table and bundling the artifacts into a zip.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::{
    ColumnMapping, LoadDiagnostics, MetricThresholds, SegmentationPipeline, SegmentationResult,
};
use crate::report::SegmentationSummary;

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub rfvkit_version: String,
    pub input_file: String,
    pub output_file: String,
    pub reference_date: String,
    pub columns: ColumnMapping,
}

/// One composite code and the customers it captured
#[derive(Debug, Clone, Serialize)]
pub struct SegmentEntry {
    pub code: String,
    pub count: usize,
    pub share: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Clustering configuration and outcome of the winning restart
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
    pub sizes: Vec<usize>,
}

/// Timing information in milliseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingInfo {
    pub load_ms: u64,
    pub extract_ms: u64,
    pub aggregate_ms: u64,
    pub grade_ms: u64,
    pub cluster_ms: u64,
    pub save_ms: u64,
    pub total_ms: u64,
}

/// Report summary
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub customers: usize,
    pub distinct_segments: usize,
    pub actioned_customers: usize,
    pub action_coverage: f64,
    pub timing: TimingInfo,
}

/// Complete segmentation report
#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub thresholds: MetricThresholds,
    pub diagnostics: LoadDiagnostics,
    pub segments: Vec<SegmentEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering: Option<ClusteringReport>,
}

/// Assemble the report for a finished run
pub fn build_segment_report(
    pipeline: &SegmentationPipeline,
    result: &SegmentationResult,
    summary: &SegmentationSummary,
    input_file: &Path,
    output_file: &Path,
) -> SegmentReport {
    let customers = result.customers.len();

    // Collect per-code counts; every customer with the same code carries the
    // same resolved action, so the first one seen is representative
    let mut segments: Vec<SegmentEntry> = Vec::new();
    for customer in &result.customers {
        match segments
            .iter_mut()
            .find(|s| s.code == customer.composite_score)
        {
            Some(entry) => entry.count += 1,
            None => segments.push(SegmentEntry {
                code: customer.composite_score.clone(),
                count: 1,
                share: 0.0,
                action: customer.action.clone(),
            }),
        }
    }
    for entry in &mut segments {
        entry.share = entry.count as f64 / customers as f64;
    }

    // Largest segments first, ties alphabetically
    segments.sort_by(|a, b| b.count.cmp(&a.count).then(a.code.cmp(&b.code)));

    let actioned = result.actioned_count();
    let action_coverage = if customers > 0 {
        actioned as f64 / customers as f64
    } else {
        0.0
    };

    let clustering = match (&pipeline.clustering, &result.clustering) {
        (Some(config), Some(assignments)) => Some(ClusteringReport {
            k: config.k,
            seed: config.seed,
            n_init: config.n_init,
            inertia: assignments.inertia,
            iterations: assignments.iterations,
            converged: assignments.converged,
            sizes: assignments.sizes(),
        }),
        _ => None,
    };

    SegmentReport {
        metadata: ReportMetadata {
            timestamp: Utc::now().to_rfc3339(),
            rfvkit_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.display().to_string(),
            output_file: output_file.display().to_string(),
            reference_date: pipeline.reference_date.format("%Y-%m-%d").to_string(),
            columns: pipeline.columns.clone(),
        },
        summary: ReportSummary {
            customers,
            distinct_segments: segments.len(),
            actioned_customers: actioned,
            action_coverage,
            timing: TimingInfo {
                load_ms: summary.load_time.as_millis() as u64,
                extract_ms: summary.extract_time.as_millis() as u64,
                aggregate_ms: summary.aggregate_time.as_millis() as u64,
                grade_ms: summary.grade_time.as_millis() as u64,
                cluster_ms: summary.cluster_time.as_millis() as u64,
                save_ms: summary.save_time.as_millis() as u64,
                total_ms: summary.total_time().as_millis() as u64,
            },
        },
        thresholds: result.thresholds.clone(),
        diagnostics: result.diagnostics.clone(),
        segments,
        clustering,
    }
}

/// Export the segmentation report to a JSON file
pub fn export_segment_report(report: &SegmentReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize segmentation report to JSON")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write segmentation report to {}",
            output_path.display()
        )
    })?;

    Ok(())
}

/// Save the result table to file (CSV or Parquet based on extension)
pub fn save_result_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}

/// Package the result table and JSON report into a zip archive
///
/// The individual files are removed after packaging.
pub fn bundle_reports(table_path: &Path, report_path: &Path, zip_path: &Path) -> Result<()> {
    use std::io::{Read, Write};
    use ::zip::write::SimpleFileOptions;
    use ::zip::ZipWriter;

    let zip_file = std::fs::File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(::zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut add_file_to_zip = |path: &Path, default_name: &str| -> Result<()> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(default_name);
        zip.start_file(filename, options)
            .with_context(|| format!("Failed to add {} to zip", filename))?;
        let mut content = Vec::new();
        std::fs::File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        zip.write_all(&content)?;
        Ok(())
    };

    add_file_to_zip(table_path, "rfv_segments.csv")?;
    add_file_to_zip(report_path, "segment_report.json")?;

    zip.finish().context("Failed to finalize zip file")?;

    std::fs::remove_file(table_path).ok();
    std::fs::remove_file(report_path).ok();

    Ok(())
}
