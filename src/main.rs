//! rfvkit: RFV Customer Segmentation CLI Tool
//!
//! A command-line tool for segmenting customers by recency, frequency
//! and value, with quartile grading, action rules and k-means clustering.

mod cli;
mod pipeline;
mod report;
mod utils;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use cli::{Cli, Commands};
use pipeline::{
    aggregate_transactions, cluster_customers, extract_transactions, load_dataset_with_progress,
    score_customers, ActionTable, ClusterConfig, ColumnMapping, MetricThresholds,
    SegmentationPipeline, SegmentationResult,
};
use report::{
    build_segment_report, bundle_reports, export_segment_report, save_result_table,
    SegmentationSummary,
};
use utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Convert {
                input,
                output,
                infer_schema_length,
            } => cli::convert::run_convert(input, output.as_deref(), *infer_schema_length),
        };
    }

    // Main segmentation pipeline - require input
    let input = cli.input().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;

    // Derive output path from input if not provided
    let output_path = cli.output_path().unwrap();

    let reference_date = cli
        .reference_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let columns = ColumnMapping::new(
        cli.customer_col.clone(),
        cli.date_col.clone(),
        cli.amount_col.clone(),
    );
    let actions = match &cli.rules {
        Some(path) => ActionTable::from_json_file(path)?,
        None => ActionTable::default(),
    };
    let clustering = if cli.skip_clustering {
        None
    } else {
        Some(ClusterConfig {
            k: cli.clusters,
            seed: cli.seed,
            n_init: cli.n_init,
            ..Default::default()
        })
    };

    let pipeline = SegmentationPipeline::new(reference_date)
        .with_columns(columns)
        .with_actions(actions)
        .with_clustering(clustering);

    // Print styled banner
    print_banner(env!("CARGO_PKG_VERSION"));

    // Print configuration card
    print_config(
        input,
        &output_path,
        &pipeline.columns.customer_id,
        &pipeline.columns.purchase_date,
        &pipeline.columns.amount,
        &reference_date.format("%Y-%m-%d").to_string(),
        pipeline.clustering.as_ref().map(|c| c.k),
        cli.seed,
    );

    // Load dataset (with progress bar for CSV files)
    let step_start = Instant::now();
    println!(); // Blank line before progress bar
    let (df, rows, cols, memory_mb) = load_dataset_with_progress(input, cli.infer_schema_length)?;
    print_success("Dataset loaded");

    // Display statistics (instant since data is already collected)
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    let mut summary = SegmentationSummary::new();
    summary.total_rows = rows;
    let load_elapsed = step_start.elapsed();
    summary.set_load_time(load_elapsed);
    print_step_time(load_elapsed);

    // Verify the mapped columns exist
    let column_names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for column in [
        &pipeline.columns.customer_id,
        &pipeline.columns.purchase_date,
        &pipeline.columns.amount,
    ] {
        if !column_names.contains(column) {
            anyhow::bail!(
                "Column '{}' not found in dataset. Available columns: {:?}",
                column,
                column_names
            );
        }
    }

    // Step 1: Typed transaction extraction with the malformed-row policy
    print_step_header(1, "Extract Transactions");

    let step_start = Instant::now();
    let spinner = create_spinner("Extracting transactions...");
    let (records, diagnostics) = extract_transactions(&df, &pipeline.columns)?;
    if diagnostics.has_issues() {
        finish_with_warning(&spinner, "Extraction finished with skipped rows");
    } else {
        finish_with_success(&spinner, "Transaction extraction complete");
    }

    print_count("valid transaction(s)", records.len(), None);
    if diagnostics.has_issues() {
        print_warning(&format!(
            "Skipped {} malformed row(s)",
            diagnostics.malformed_rows
        ));
        for error in &diagnostics.sample_errors {
            println!("      {}", style(error).dim());
        }
    }
    if !diagnostics.dropped_customers.is_empty() {
        print_warning(&format!(
            "{} customer(s) had no valid rows and were dropped",
            diagnostics.dropped_customers.len()
        ));
    }

    summary.malformed_rows = diagnostics.malformed_rows;
    summary.dropped_customers = diagnostics.dropped_customers.len();
    let extract_elapsed = step_start.elapsed();
    summary.set_extract_time(extract_elapsed);
    print_step_time(extract_elapsed);

    // Step 2: Per-customer RFV aggregation
    print_step_header(2, "Aggregate Customers");

    let step_start = Instant::now();
    let metrics = aggregate_transactions(&records, pipeline.reference_date)?;
    print_count("distinct customer(s)", metrics.len(), None);

    summary.customers = metrics.len();
    let aggregate_elapsed = step_start.elapsed();
    summary.set_aggregate_time(aggregate_elapsed);
    print_step_time(aggregate_elapsed);

    // Step 3: Quartile thresholds, grading, action resolution
    print_step_header(3, "Grade & Score");

    let step_start = Instant::now();
    let spinner = create_spinner("Computing quartile thresholds...");
    let recencies: Vec<f64> = metrics.iter().map(|m| m.recency as f64).collect();
    let frequencies: Vec<f64> = metrics.iter().map(|m| m.frequency as f64).collect();
    let values: Vec<f64> = metrics.iter().map(|m| m.value).collect();
    let thresholds = MetricThresholds::from_metrics(&recencies, &frequencies, &values)?;
    let mut customers = score_customers(&metrics, &thresholds, &pipeline.actions);
    finish_with_success(&spinner, "Grading complete");

    print_info(&format!(
        "Recency quartiles: {:.1} / {:.1} / {:.1} days",
        thresholds.recency.q1, thresholds.recency.q2, thresholds.recency.q3
    ));
    print_info(&format!(
        "Frequency quartiles: {:.1} / {:.1} / {:.1} purchases",
        thresholds.frequency.q1, thresholds.frequency.q2, thresholds.frequency.q3
    ));
    print_info(&format!(
        "Value quartiles: {:.2} / {:.2} / {:.2}",
        thresholds.value.q1, thresholds.value.q2, thresholds.value.q3
    ));

    let grade_elapsed = step_start.elapsed();
    summary.set_grade_time(grade_elapsed);
    print_step_time(grade_elapsed);

    // Step 4: K-means clustering over standardized RFV triples
    print_step_header(4, "Cluster Customers");

    let clustering_result = match &pipeline.clustering {
        Some(config) => {
            let step_start = Instant::now();
            let spinner = create_spinner("Running k-means restarts...");
            let assignments = cluster_customers(&metrics, config)?;
            finish_with_success(&spinner, "Clustering complete");

            for (customer, &label) in customers.iter_mut().zip(assignments.labels.iter()) {
                customer.cluster = Some(label);
            }

            print_info(&format!(
                "k={}, inertia {:.4}, {} iteration(s){}",
                config.k,
                assignments.inertia,
                assignments.iterations,
                if assignments.converged {
                    ""
                } else {
                    ", not converged"
                }
            ));
            print_info(&format!("Cluster sizes: {:?}", assignments.sizes()));

            summary.clusters = Some(config.k);
            let cluster_elapsed = step_start.elapsed();
            summary.set_cluster_time(cluster_elapsed);
            print_step_time(cluster_elapsed);
            Some(assignments)
        }
        None => {
            print_info("Clustering skipped (--skip-clustering)");
            None
        }
    };

    let result = SegmentationResult {
        customers,
        thresholds,
        diagnostics,
        clustering: clustering_result,
    };

    let distribution = result.segment_distribution();
    summary.segments = distribution.len();
    summary.actioned = result.actioned_count();
    let mut top_segments: Vec<(String, usize)> = distribution.into_iter().collect();
    top_segments.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_segments.truncate(5);
    summary.top_segments = top_segments;

    // Step 5: Save output
    print_step_header(5, "Save Results");

    let step_start = Instant::now();
    let spinner = create_spinner("Writing output file...");
    let mut output_df = result.to_dataframe()?;
    save_result_table(&mut output_df, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));
    let save_elapsed = step_start.elapsed();
    summary.set_save_time(save_elapsed);

    if cli.report || cli.bundle {
        let report_path = cli.report_path().unwrap();
        let report = build_segment_report(&pipeline, &result, &summary, input, &output_path);
        export_segment_report(&report, &report_path)?;
        print_success(&format!("Report saved to {}", report_path.display()));

        if cli.bundle {
            let bundle_path = cli.bundle_path().unwrap();
            bundle_reports(&output_path, &report_path, &bundle_path)?;
            print_success(&format!("Bundled outputs into {}", bundle_path.display()));
        }
    }
    print_step_time(save_elapsed);

    // Display summary
    summary.display();

    // Final completion message
    print_completion();

    Ok(())
}
