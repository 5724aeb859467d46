//! Segmentation summary report generation

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use std::time::Duration;

/// Summary of one segmentation run, filled in step by step
#[derive(Debug, Default)]
pub struct SegmentationSummary {
    pub total_rows: usize,
    pub customers: usize,
    pub malformed_rows: usize,
    pub dropped_customers: usize,
    pub segments: usize,
    pub actioned: usize,
    /// None when the clustering stage was skipped
    pub clusters: Option<usize>,
    /// Largest segments first, for the breakdown block
    pub top_segments: Vec<(String, usize)>,

    pub load_time: Duration,
    pub extract_time: Duration,
    pub aggregate_time: Duration,
    pub grade_time: Duration,
    pub cluster_time: Duration,
    pub save_time: Duration,
}

impl SegmentationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_load_time(&mut self, elapsed: Duration) {
        self.load_time = elapsed;
    }

    pub fn set_extract_time(&mut self, elapsed: Duration) {
        self.extract_time = elapsed;
    }

    pub fn set_aggregate_time(&mut self, elapsed: Duration) {
        self.aggregate_time = elapsed;
    }

    pub fn set_grade_time(&mut self, elapsed: Duration) {
        self.grade_time = elapsed;
    }

    pub fn set_cluster_time(&mut self, elapsed: Duration) {
        self.cluster_time = elapsed;
    }

    pub fn set_save_time(&mut self, elapsed: Duration) {
        self.save_time = elapsed;
    }

    pub fn total_time(&self) -> Duration {
        self.load_time
            + self.extract_time
            + self.aggregate_time
            + self.grade_time
            + self.cluster_time
            + self.save_time
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("SEGMENTATION SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📥 Input Rows"),
            Cell::new(self.total_rows),
        ]);

        table.add_row(vec![
            Cell::new("🧹 Malformed Rows"),
            Cell::new(self.malformed_rows).fg(if self.malformed_rows == 0 {
                Color::White
            } else {
                Color::Red
            }),
        ]);

        table.add_row(vec![
            Cell::new("👥 Customers"),
            Cell::new(self.customers)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("🏷️  Distinct Segments"),
            Cell::new(self.segments),
        ]);

        let action_pct = if self.customers > 0 {
            (self.actioned as f64 / self.customers as f64) * 100.0
        } else {
            0.0
        };

        table.add_row(vec![
            Cell::new("🎯 Actioned Customers"),
            Cell::new(format!("{} ({:.1}%)", self.actioned, action_pct)).fg(
                if self.actioned > 0 {
                    Color::Cyan
                } else {
                    Color::White
                },
            ),
        ]);

        table.add_row(vec![
            Cell::new("🧩 Clusters"),
            match self.clusters {
                Some(k) => Cell::new(k).fg(Color::Cyan),
                None => Cell::new("skipped").fg(Color::DarkGrey),
            },
        ]);

        table.add_row(vec![
            Cell::new("⏱️  Total Time"),
            Cell::new(format!("{:.2}s", self.total_time().as_secs_f64())),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        // Show the largest segments if any were recorded
        if !self.top_segments.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("📝").cyan(),
                style("LARGEST SEGMENTS").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            println!();

            for (code, count) in &self.top_segments {
                println!(
                    "        {} {} {}",
                    style("•").dim(),
                    style(code).yellow(),
                    style(format!("({} customers)", count)).dim()
                );
            }
        }

        if self.dropped_customers > 0 {
            println!();
            println!(
                "      {} {}",
                style("⚠️").yellow(),
                style(format!(
                    "{} customer(s) had only malformed rows and were dropped",
                    self.dropped_customers
                ))
                .yellow()
            );
        }
    }
}
