//! Shared test utilities and fixture generators

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create the three-customer transaction DataFrame used across tests
///
/// Against a reference date of 2024-04-10:
/// - `X`: one purchase of 50.0, ten days back -> composite BDC
/// - `Y`: three purchases totalling 60.0, the latest one day back -> AAA
/// - `Z`: two purchases totalling 10.0, the latest 80 days back -> DCD
pub fn create_transactions_dataframe() -> DataFrame {
    df! {
        "ID_cliente" => ["X", "Y", "Y", "Y", "Z", "Z"],
        "DiaCompra" => [
            "2024-03-31",
            "2024-03-21",
            "2024-03-26",
            "2024-04-09",
            "2024-01-11",
            "2024-01-21",
        ],
        "ValorTotal" => [50.0f64, 20.0, 30.0, 10.0, 5.0, 5.0],
    }
    .unwrap()
}

/// Create a transaction DataFrame with malformed rows mixed in
///
/// Four rows are valid. Row 2 has no customer id, row 3 an unparseable
/// date, row 4 a missing amount. Customer `c3` only appears on the
/// missing-amount row, so it is dropped from the run entirely.
pub fn create_messy_transactions_dataframe() -> DataFrame {
    df! {
        "ID_cliente" => [Some("c1"), Some("c2"), None, Some("c1"), Some("c3"), Some("c2"), Some("c4")],
        "DiaCompra" => [
            Some("2024-03-01"),
            Some("2024-03-05"),
            Some("2024-03-06"),
            Some("not a date"),
            Some("2024-03-10"),
            Some("2024-03-12"),
            Some("2024-03-15"),
        ],
        "ValorTotal" => [Some(10.0f64), Some(20.0), Some(30.0), Some(40.0), None, Some(60.0), Some(70.0)],
    }
    .unwrap()
}

/// Create a larger random transaction log for stress tests
pub fn create_large_transactions_dataframe(customers: usize, rows: usize) -> DataFrame {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    let ids: Vec<String> = (0..rows)
        .map(|_| format!("c{:04}", rng.gen_range(0..customers)))
        .collect();
    let dates: Vec<String> = (0..rows)
        .map(|_| {
            format!(
                "2024-{:02}-{:02}",
                rng.gen_range(1..=12u32),
                rng.gen_range(1..=28u32)
            )
        })
        .collect();
    let amounts: Vec<f64> = (0..rows).map(|_| rng.gen_range(1.0..500.0)).collect();

    df! {
        "ID_cliente" => ids,
        "DiaCompra" => dates,
        "ValorTotal" => amounts,
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("transactions.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("transactions.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
