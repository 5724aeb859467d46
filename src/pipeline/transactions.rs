//! Transaction extraction from raw datasets
//!
//! This module maps the user's column names onto the dataset, converts rows
//! into typed transaction records, and applies the malformed-row policy:
//! rows with a missing id, unparseable date, or non-numeric amount are
//! skipped and counted rather than failing the run.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::error::{RfvError, RfvResult};

/// Days from 0001-01-01 (CE) to the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Date formats accepted for string-typed purchase date columns
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Datetime formats accepted as a fallback; the time part is discarded
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Cap on malformed-row messages retained for diagnostics
const MAX_SAMPLE_ERRORS: usize = 5;

/// Names of the three required input columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Customer identifier column
    pub customer_id: String,
    /// Purchase date column
    pub purchase_date: String,
    /// Transaction amount column
    pub amount: String,
}

impl ColumnMapping {
    pub fn new(customer_id: String, purchase_date: String, amount: String) -> Self {
        Self {
            customer_id,
            purchase_date,
            amount,
        }
    }

    /// Check that every mapped column exists in the dataset
    ///
    /// Runs before any extraction so a bad mapping fails fast with no
    /// partial output.
    pub fn validate(&self, df: &DataFrame) -> RfvResult<()> {
        for column in [&self.customer_id, &self.purchase_date, &self.amount] {
            if df.column(column).is_err() {
                return Err(RfvError::MissingColumn {
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            customer_id: "ID_cliente".to_string(),
            purchase_date: "DiaCompra".to_string(),
            amount: "ValorTotal".to_string(),
        }
    }
}

/// A single valid purchase event
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub customer_id: String,
    pub purchase_date: NaiveDate,
    pub amount: f64,
}

/// Bookkeeping for skipped rows and excluded customers
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadDiagnostics {
    /// Rows in the input dataset
    pub total_rows: usize,
    /// Rows converted into transaction records
    pub valid_rows: usize,
    /// Rows skipped by the malformed-row policy
    pub malformed_rows: usize,
    /// Customers whose every row was malformed (excluded from the run)
    pub dropped_customers: Vec<String>,
    /// First few malformed-row messages, for operator context
    pub sample_errors: Vec<String>,
}

impl LoadDiagnostics {
    pub fn has_issues(&self) -> bool {
        self.malformed_rows > 0
    }
}

/// Convert the mapped columns into typed transaction records
///
/// # Arguments
/// * `df` - The raw dataset
/// * `columns` - Column mapping to apply
///
/// # Returns
/// The valid records plus diagnostics. Fails with `MissingColumn` if the
/// mapping does not fit the schema, or `EmptyDataset` if no valid records
/// remain after filtering.
pub fn extract_transactions(
    df: &DataFrame,
    columns: &ColumnMapping,
) -> RfvResult<(Vec<TransactionRecord>, LoadDiagnostics)> {
    columns.validate(df)?;

    let ids = column_to_id_vec(df.column(&columns.customer_id)?)?;
    let dates = column_to_date_vec(df.column(&columns.purchase_date)?)?;
    let amounts = column_to_amount_vec(df.column(&columns.amount)?)?;

    let total_rows = df.height();
    let mut records = Vec::with_capacity(total_rows);
    let mut diagnostics = LoadDiagnostics {
        total_rows,
        ..Default::default()
    };
    let mut valid_ids: BTreeSet<String> = BTreeSet::new();
    let mut malformed_ids: BTreeSet<String> = BTreeSet::new();

    for row in 0..total_rows {
        match build_record(row, &ids[row], &dates[row], &amounts[row]) {
            Ok(record) => {
                valid_ids.insert(record.customer_id.clone());
                records.push(record);
            }
            Err(err) => {
                diagnostics.malformed_rows += 1;
                if let Some(id) = &ids[row] {
                    malformed_ids.insert(id.clone());
                }
                if diagnostics.sample_errors.len() < MAX_SAMPLE_ERRORS {
                    diagnostics.sample_errors.push(err.to_string());
                }
            }
        }
    }

    if records.is_empty() {
        return Err(RfvError::EmptyDataset);
    }

    diagnostics.valid_rows = records.len();
    diagnostics.dropped_customers = malformed_ids
        .difference(&valid_ids)
        .cloned()
        .collect();

    Ok((records, diagnostics))
}

/// Assemble one record, or say which field made the row unusable
fn build_record(
    row: usize,
    id: &Option<String>,
    date: &Option<NaiveDate>,
    amount: &Option<f64>,
) -> RfvResult<TransactionRecord> {
    let customer_id = id.clone().ok_or_else(|| RfvError::MalformedRecord {
        row,
        reason: "missing customer id".to_string(),
    })?;
    let purchase_date = date.ok_or_else(|| RfvError::MalformedRecord {
        row,
        reason: "missing or unparseable purchase date".to_string(),
    })?;
    let amount = amount.ok_or_else(|| RfvError::MalformedRecord {
        row,
        reason: "missing or non-numeric amount".to_string(),
    })?;

    Ok(TransactionRecord {
        customer_id,
        purchase_date,
        amount,
    })
}

/// Stringify the id column; empty and whitespace-only ids count as missing
fn column_to_id_vec(col: &Column) -> RfvResult<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.and_then(non_empty_id))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        _ => {
            // For other types, try to cast to string
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.and_then(non_empty_id))
                .collect()
        }
    };

    Ok(values)
}

fn non_empty_id(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Read the purchase date column as calendar dates
///
/// Native Date/Datetime columns go through their epoch representation;
/// string columns are parsed against the accepted formats.
fn column_to_date_vec(col: &Column) -> RfvResult<Vec<Option<NaiveDate>>> {
    let values: Vec<Option<NaiveDate>> = match col.dtype() {
        DataType::Date => {
            let cast = col.cast(&DataType::Int32)?;
            cast.i32()?
                .into_iter()
                .map(|v| v.and_then(|days| date_from_epoch_days(days as i64)))
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let divisor = match unit {
                TimeUnit::Nanoseconds => 86_400_000_000_000i64,
                TimeUnit::Microseconds => 86_400_000_000i64,
                TimeUnit::Milliseconds => 86_400_000i64,
            };
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.and_then(|ts| date_from_epoch_days(ts.div_euclid(divisor))))
                .collect()
        }
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_date_str))
            .collect(),
        _ => {
            // For other types, try to cast to string
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.and_then(parse_date_str))
                .collect()
        }
    };

    Ok(values)
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    None
}

fn date_from_epoch_days(days: i64) -> Option<NaiveDate> {
    let days_from_ce = (UNIX_EPOCH_DAYS_FROM_CE as i64).checked_add(days)?;
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(days_from_ce).ok()?)
}

/// Read the amount column as finite floats; NaN and infinities count as missing
fn column_to_amount_vec(col: &Column) -> RfvResult<Vec<Option<f64>>> {
    let values: Vec<Option<f64>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?.into_iter().collect()
        }
    };

    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df! {
            "ID_cliente" => ["c1", "c2", "c1", "c3"],
            "DiaCompra" => ["2024-01-10", "2024-02-05", "2024-03-01", "2024-03-15"],
            "ValorTotal" => [100.0f64, 250.0, 80.0, 40.0],
        }
        .unwrap()
    }

    #[test]
    fn test_extract_valid_rows() {
        let df = sample_df();
        let (records, diagnostics) =
            extract_transactions(&df, &ColumnMapping::default()).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(diagnostics.total_rows, 4);
        assert_eq!(diagnostics.valid_rows, 4);
        assert_eq!(diagnostics.malformed_rows, 0);
        assert!(!diagnostics.has_issues());

        assert_eq!(records[0].customer_id, "c1");
        assert_eq!(
            records[0].purchase_date,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert_eq!(records[0].amount, 100.0);
    }

    #[test]
    fn test_missing_column_fails_before_extraction() {
        let df = df! {
            "ID_cliente" => ["c1"],
            "DiaCompra" => ["2024-01-10"],
        }
        .unwrap();

        let result = extract_transactions(&df, &ColumnMapping::default());
        match result {
            Err(RfvError::MissingColumn { column }) => assert_eq!(column, "ValorTotal"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_mapping() {
        let df = df! {
            "who" => ["a", "b"],
            "when" => ["2024-05-01", "2024-05-02"],
            "how_much" => [1.5f64, 2.5],
        }
        .unwrap();

        let mapping = ColumnMapping::new(
            "who".to_string(),
            "when".to_string(),
            "how_much".to_string(),
        );
        let (records, _) = extract_transactions(&df, &mapping).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].amount, 2.5);
    }

    #[test]
    fn test_malformed_rows_skipped_and_counted() {
        let df = df! {
            "ID_cliente" => [Some("c1"), Some("c2"), None, Some("c1"), Some("  ")],
            "DiaCompra" => [Some("2024-01-10"), Some("not a date"), Some("2024-01-12"), Some("2024-01-13"), Some("2024-01-14")],
            "ValorTotal" => [Some(10.0f64), Some(20.0), Some(30.0), Some(40.0), Some(50.0)],
        }
        .unwrap();

        let (records, diagnostics) =
            extract_transactions(&df, &ColumnMapping::default()).unwrap();

        // c2's date is junk, row 2 has no id, row 4's id is blank
        assert_eq!(records.len(), 2);
        assert_eq!(diagnostics.malformed_rows, 3);
        assert_eq!(diagnostics.valid_rows, 2);
        assert!(records.iter().all(|r| r.customer_id == "c1"));
    }

    #[test]
    fn test_dropped_customer_reported() {
        let df = df! {
            "ID_cliente" => ["c1", "c2", "c1"],
            "DiaCompra" => [Some("2024-01-10"), None, Some("2024-01-12")],
            "ValorTotal" => [10.0f64, 20.0, 30.0],
        }
        .unwrap();

        let (records, diagnostics) =
            extract_transactions(&df, &ColumnMapping::default()).unwrap();

        // c2 only ever appeared on a malformed row
        assert_eq!(records.len(), 2);
        assert_eq!(diagnostics.dropped_customers, vec!["c2".to_string()]);
    }

    #[test]
    fn test_all_rows_malformed_is_empty_dataset() {
        let df = df! {
            "ID_cliente" => ["c1", "c2"],
            "DiaCompra" => ["junk", "also junk"],
            "ValorTotal" => [10.0f64, 20.0],
        }
        .unwrap();

        let result = extract_transactions(&df, &ColumnMapping::default());
        assert!(matches!(result, Err(RfvError::EmptyDataset)));
    }

    #[test]
    fn test_zero_row_dataset_is_empty_dataset() {
        let df = df! {
            "ID_cliente" => Vec::<String>::new(),
            "DiaCompra" => Vec::<String>::new(),
            "ValorTotal" => Vec::<f64>::new(),
        }
        .unwrap();

        let result = extract_transactions(&df, &ColumnMapping::default());
        assert!(matches!(result, Err(RfvError::EmptyDataset)));
    }

    #[test]
    fn test_numeric_ids_and_amounts() {
        let df = df! {
            "ID_cliente" => [101i64, 102, 101],
            "DiaCompra" => ["2024-01-10", "2024-01-11", "2024-01-12"],
            "ValorTotal" => [10i64, 20, 30],
        }
        .unwrap();

        let (records, _) = extract_transactions(&df, &ColumnMapping::default()).unwrap();
        assert_eq!(records[0].customer_id, "101");
        assert_eq!(records[2].amount, 30.0);
    }

    #[test]
    fn test_native_date_column() {
        let df = df! {
            "ID_cliente" => ["c1", "c2"],
            "DiaCompra" => [19000i32, 19010],
            "ValorTotal" => [10.0f64, 20.0],
        }
        .unwrap();
        let df = df
            .lazy()
            .with_column(col("DiaCompra").cast(DataType::Date))
            .collect()
            .unwrap();

        let (records, _) = extract_transactions(&df, &ColumnMapping::default()).unwrap();
        // 19000 days after the epoch
        assert_eq!(
            records[0].purchase_date,
            NaiveDate::from_ymd_opt(2022, 1, 8).unwrap()
        );
        assert_eq!(
            records[1].purchase_date,
            NaiveDate::from_ymd_opt(2022, 1, 18).unwrap()
        );
    }

    #[test]
    fn test_alternate_date_formats() {
        let df = df! {
            "ID_cliente" => ["c1", "c2", "c3"],
            "DiaCompra" => ["10/01/2024", "2024/01/11", "2024-01-12 08:30:00"],
            "ValorTotal" => [10.0f64, 20.0, 30.0],
        }
        .unwrap();

        let (records, diagnostics) =
            extract_transactions(&df, &ColumnMapping::default()).unwrap();
        assert_eq!(diagnostics.malformed_rows, 0);
        assert_eq!(
            records[0].purchase_date,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert_eq!(
            records[2].purchase_date,
            NaiveDate::from_ymd_opt(2024, 1, 12).unwrap()
        );
    }

    #[test]
    fn test_non_finite_amount_is_malformed() {
        let df = df! {
            "ID_cliente" => ["c1", "c2"],
            "DiaCompra" => ["2024-01-10", "2024-01-11"],
            "ValorTotal" => [f64::NAN, 20.0],
        }
        .unwrap();

        let (records, diagnostics) =
            extract_transactions(&df, &ColumnMapping::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(diagnostics.malformed_rows, 1);
        assert_eq!(records[0].customer_id, "c2");
    }

    #[test]
    fn test_sample_errors_are_capped() {
        let ids: Vec<String> = (0..10).map(|i| format!("c{}", i)).collect();
        let dates: Vec<&str> = vec!["junk"; 10];
        let amounts: Vec<f64> = vec![1.0; 10];
        let mut df = df! {
            "ID_cliente" => ids,
            "DiaCompra" => dates,
            "ValorTotal" => amounts,
        }
        .unwrap();
        // One valid row so the dataset is not empty
        let valid = df! {
            "ID_cliente" => ["ok"],
            "DiaCompra" => ["2024-01-10"],
            "ValorTotal" => [5.0f64],
        }
        .unwrap();
        df = df.vstack(&valid).unwrap();

        let (_, diagnostics) =
            extract_transactions(&df, &ColumnMapping::default()).unwrap();
        assert_eq!(diagnostics.malformed_rows, 10);
        assert_eq!(diagnostics.sample_errors.len(), MAX_SAMPLE_ERRORS);
        assert!(diagnostics.sample_errors[0].contains("purchase date"));
    }
}
