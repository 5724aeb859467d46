//! Pipeline module - orchestrates the segmentation stages

pub mod aggregate;
pub mod cache;
pub mod cluster;
pub mod error;
pub mod loader;
pub mod quartile;
pub mod run;
pub mod score;
pub mod transactions;

pub use aggregate::*;
pub use cache::*;
pub use cluster::*;
pub use error::*;
pub use loader::*;
pub use quartile::*;
pub use run::*;
pub use score::*;
pub use transactions::*;
