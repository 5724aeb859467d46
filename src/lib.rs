//! rfvkit: RFV Customer Segmentation Library
//!
//! A library for segmenting customers from a transaction log using
//! recency/frequency/value aggregation, quartile grading, action rules
//! and seeded k-means clustering.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
