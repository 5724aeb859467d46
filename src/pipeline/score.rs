//! Composite RFV scores and marketing action resolution
//!
//! Concatenates the three letter grades into a composite code (recency,
//! frequency, value order) and resolves it against a configurable rule
//! table. The rule table is domain configuration: codes without a rule get
//! no action, never an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::aggregate::CustomerMetrics;
use super::error::RfvResult;
use super::quartile::{grade_frequency_value, grade_recency, Grade, MetricThresholds};

/// Mapping from composite code to marketing action text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTable {
    rules: BTreeMap<String, String>,
}

impl ActionTable {
    pub fn new(rules: BTreeMap<String, String>) -> Self {
        Self { rules }
    }

    /// Load a rule table from a JSON object file (`{"AAA": "text", ...}`)
    pub fn from_json_file(path: &Path) -> RfvResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let rules: BTreeMap<String, String> = serde_json::from_str(&contents)?;
        Ok(Self { rules })
    }

    /// Exact-match lookup of a composite code
    pub fn resolve(&self, code: &str) -> Option<&str> {
        self.rules.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &BTreeMap<String, String> {
        &self.rules
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            "AAA".to_string(),
            "Send discount coupons, ask for referrals, send free samples".to_string(),
        );
        rules.insert(
            "DDD".to_string(),
            "Churned low-value customer: no action".to_string(),
        );
        rules.insert(
            "DAA".to_string(),
            "Churned high-value customer: win back with discount coupons".to_string(),
        );
        rules.insert(
            "CAA".to_string(),
            "Churned high-value customer: win back with discount coupons".to_string(),
        );
        Self { rules }
    }
}

/// A fully scored customer row
#[derive(Debug, Clone)]
pub struct CustomerRfv {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u32,
    pub value: f64,
    pub recency_grade: Grade,
    pub frequency_grade: Grade,
    pub value_grade: Grade,
    /// Three-symbol code in fixed recency, frequency, value order
    pub composite_score: String,
    pub action: Option<String>,
    pub cluster: Option<usize>,
}

/// Concatenate the grades into the composite code
pub fn compose_score(recency: Grade, frequency: Grade, value: Grade) -> String {
    format!("{}{}{}", recency, frequency, value)
}

/// Grade each customer against the population thresholds and resolve actions
///
/// # Arguments
/// * `metrics` - Per-customer aggregates
/// * `thresholds` - Quartile thresholds computed from this population
/// * `actions` - Rule table for composite code resolution
pub fn score_customers(
    metrics: &[CustomerMetrics],
    thresholds: &MetricThresholds,
    actions: &ActionTable,
) -> Vec<CustomerRfv> {
    metrics
        .iter()
        .map(|m| {
            let recency_grade = grade_recency(m.recency as f64, &thresholds.recency);
            let frequency_grade =
                grade_frequency_value(m.frequency as f64, &thresholds.frequency);
            let value_grade = grade_frequency_value(m.value, &thresholds.value);
            let composite_score = compose_score(recency_grade, frequency_grade, value_grade);
            let action = actions.resolve(&composite_score).map(String::from);

            CustomerRfv {
                customer_id: m.customer_id.clone(),
                recency: m.recency,
                frequency: m.frequency,
                value: m.value,
                recency_grade,
                frequency_grade,
                value_grade,
                composite_score,
                action,
                cluster: None,
            }
        })
        .collect()
}
