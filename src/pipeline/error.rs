//! Error types for the segmentation pipeline

use thiserror::Error;

/// Errors produced by the segmentation pipeline
#[derive(Error, Debug)]
pub enum RfvError {
    #[error("Required column '{column}' not found in dataset")]
    MissingColumn { column: String },

    #[error("Dataset contains no usable transactions")]
    EmptyDataset,

    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("Invalid cluster count: k={k} must be between 2 and {customers} (distinct customers)")]
    InvalidClusterCount { k: usize, customers: usize },

    #[error("Data processing error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RfvResult<T> = Result<T, RfvError>;
