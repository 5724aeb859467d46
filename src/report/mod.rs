//! Report module - summarizing segmentation results

pub mod segment_report;
pub mod summary;

pub use segment_report::*;
pub use summary::*;
