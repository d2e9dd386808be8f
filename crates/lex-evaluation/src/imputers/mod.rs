//! Imputation module for handling missing values.
//!
//! Imputers follow a fit/transform contract: statistics and donor rows are
//! learned from the train partition, then applied to other partitions.
//!
//! - KNN imputation ([`KNNImputer`])
//! - Statistical imputation, mean and median ([`StatisticalImputer`])

mod knn;
mod statistical;

pub use knn::{FittedKnn, KNNImputer};
pub use statistical::{FittedStatistics, Statistic, StatisticalImputer};
