//! Per-customer RFV metric aggregation
//!
//! Collapses the transaction log into one row per customer: days since the
//! most recent purchase, purchase count, and total spend.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::{RfvError, RfvResult};
use super::transactions::TransactionRecord;

/// Raw RFV metrics for one customer, before grading
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    /// Unique customer identifier
    pub customer_id: String,
    /// Whole days from the most recent purchase to the reference date;
    /// negative when the purchase is future-dated
    pub recency: i64,
    /// Number of valid transactions
    pub frequency: u32,
    /// Total monetary value across all transactions
    pub value: f64,
}

/// Aggregate transaction records into per-customer metrics
///
/// # Arguments
/// * `records` - Valid transaction records
/// * `reference_date` - The "today" recency is measured against
///
/// # Returns
/// One metrics row per distinct customer, sorted by customer id so runs
/// over the same data always produce the same ordering.
pub fn aggregate_transactions(
    records: &[TransactionRecord],
    reference_date: NaiveDate,
) -> RfvResult<Vec<CustomerMetrics>> {
    if records.is_empty() {
        return Err(RfvError::EmptyDataset);
    }

    // (most recent purchase, count, total value) keyed by customer
    let mut grouped: BTreeMap<&str, (NaiveDate, u32, f64)> = BTreeMap::new();
    for record in records {
        let entry = grouped
            .entry(record.customer_id.as_str())
            .or_insert((record.purchase_date, 0, 0.0));
        if record.purchase_date > entry.0 {
            entry.0 = record.purchase_date;
        }
        entry.1 += 1;
        entry.2 += record.amount;
    }

    Ok(grouped
        .into_iter()
        .map(|(id, (last_purchase, frequency, value))| CustomerMetrics {
            customer_id: id.to_string(),
            recency: (reference_date - last_purchase).num_days(),
            frequency,
            value,
        })
        .collect())
}
