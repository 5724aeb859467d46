//! Segmentation pipeline orchestration
//!
//! Wires the stages together: typed extraction, per-customer aggregation,
//! quartile thresholds, grading and action resolution, optional clustering.
//! The pipeline owns the run configuration; the stages stay free functions.

use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

use super::aggregate::aggregate_transactions;
use super::cluster::{cluster_customers, ClusterAssignments, ClusterConfig};
use super::error::{RfvError, RfvResult};
use super::quartile::MetricThresholds;
use super::score::{score_customers, ActionTable, CustomerRfv};
use super::transactions::{extract_transactions, ColumnMapping, LoadDiagnostics};

/// Configuration for one segmentation run
#[derive(Debug, Clone)]
pub struct SegmentationPipeline {
    pub columns: ColumnMapping,
    pub reference_date: NaiveDate,
    pub actions: ActionTable,
    /// `None` skips the clustering stage entirely
    pub clustering: Option<ClusterConfig>,
}

impl SegmentationPipeline {
    /// Pipeline with default column names, rules and clustering
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            columns: ColumnMapping::default(),
            reference_date,
            actions: ActionTable::default(),
            clustering: Some(ClusterConfig::default()),
        }
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_actions(mut self, actions: ActionTable) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_clustering(mut self, clustering: Option<ClusterConfig>) -> Self {
        self.clustering = clustering;
        self
    }

    /// Run the full segmentation against a loaded dataset
    ///
    /// Column validation happens before any extraction, so a bad mapping
    /// fails fast with `MissingColumn` and no partial output. Malformed rows
    /// are excluded and counted in the diagnostics rather than aborting the
    /// run; only an entirely unusable dataset is an error.
    pub fn run(&self, df: &DataFrame) -> RfvResult<SegmentationResult> {
        let (records, diagnostics) = extract_transactions(df, &self.columns)?;
        let metrics = aggregate_transactions(&records, self.reference_date)?;

        let recencies: Vec<f64> = metrics.iter().map(|m| m.recency as f64).collect();
        let frequencies: Vec<f64> = metrics.iter().map(|m| m.frequency as f64).collect();
        let values: Vec<f64> = metrics.iter().map(|m| m.value).collect();
        let thresholds = MetricThresholds::from_metrics(&recencies, &frequencies, &values)?;

        let mut customers = score_customers(&metrics, &thresholds, &self.actions);

        let clustering = match &self.clustering {
            Some(config) => {
                let assignments = cluster_customers(&metrics, config)?;
                for (customer, &label) in customers.iter_mut().zip(assignments.labels.iter()) {
                    customer.cluster = Some(label);
                }
                Some(assignments)
            }
            None => None,
        };

        Ok(SegmentationResult {
            customers,
            thresholds,
            diagnostics,
            clustering,
        })
    }
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// One row per distinct customer, sorted by customer id
    pub customers: Vec<CustomerRfv>,
    pub thresholds: MetricThresholds,
    pub diagnostics: LoadDiagnostics,
    pub clustering: Option<ClusterAssignments>,
}

impl SegmentationResult {
    /// Customers per composite code
    pub fn segment_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for customer in &self.customers {
            *distribution
                .entry(customer.composite_score.clone())
                .or_insert(0) += 1;
        }
        distribution
    }

    /// Customers whose composite code resolved to an action
    pub fn actioned_count(&self) -> usize {
        self.customers.iter().filter(|c| c.action.is_some()).count()
    }

    /// Materialize the result as a DataFrame for export
    ///
    /// The `cluster` column is only present when the clustering stage ran.
    pub fn to_dataframe(&self) -> RfvResult<DataFrame> {
        let ids: Vec<&str> = self.customers.iter().map(|c| c.customer_id.as_str()).collect();
        let recencies: Vec<i64> = self.customers.iter().map(|c| c.recency).collect();
        let frequencies: Vec<u32> = self.customers.iter().map(|c| c.frequency).collect();
        let values: Vec<f64> = self.customers.iter().map(|c| c.value).collect();
        let recency_grades: Vec<String> = self
            .customers
            .iter()
            .map(|c| c.recency_grade.to_string())
            .collect();
        let frequency_grades: Vec<String> = self
            .customers
            .iter()
            .map(|c| c.frequency_grade.to_string())
            .collect();
        let value_grades: Vec<String> = self
            .customers
            .iter()
            .map(|c| c.value_grade.to_string())
            .collect();
        let codes: Vec<&str> = self
            .customers
            .iter()
            .map(|c| c.composite_score.as_str())
            .collect();
        let actions: Vec<Option<String>> =
            self.customers.iter().map(|c| c.action.clone()).collect();

        let mut columns = vec![
            Column::new("customer_id".into(), ids),
            Column::new("recency".into(), recencies),
            Column::new("frequency".into(), frequencies),
            Column::new("value".into(), values),
            Column::new("recency_grade".into(), recency_grades),
            Column::new("frequency_grade".into(), frequency_grades),
            Column::new("value_grade".into(), value_grades),
            Column::new("composite_score".into(), codes),
            Column::new("action".into(), actions),
        ];

        if let Some(clustering) = &self.clustering {
            let labels: Vec<u32> = clustering.labels.iter().map(|&l| l as u32).collect();
            columns.push(Column::new("cluster".into(), labels));
        }

        Ok(DataFrame::new(columns)?)
    }
}
