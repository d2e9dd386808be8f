//! Statistical imputation methods.
//!
//! Provides mean and median imputation. Statistics are learned from one
//! frame (the train partition) and applied to another.

use crate::error::{EvaluationError, Result};
use crate::utils::fill_numeric_nulls;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Statistic used to fill missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Mean,
    Median,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
        }
    }
}

/// Statistical imputer for numeric columns.
#[derive(Debug, Clone, Copy)]
pub struct StatisticalImputer {
    statistic: Statistic,
}

/// Per-column fill values learned by [`StatisticalImputer::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedStatistics {
    statistic: Statistic,
    fill_values: Vec<(String, f64)>,
}

impl StatisticalImputer {
    pub fn new(statistic: Statistic) -> Self {
        Self { statistic }
    }

    pub fn mean() -> Self {
        Self::new(Statistic::Mean)
    }

    pub fn median() -> Self {
        Self::new(Statistic::Median)
    }

    /// Learn one fill value per column from `df`.
    ///
    /// Null values are ignored. A column with no values at all cannot be
    /// summarized and fails with [`EvaluationError::Imputation`].
    pub fn fit(&self, df: &DataFrame, columns: &[String]) -> Result<FittedStatistics> {
        let mut fill_values = Vec::with_capacity(columns.len());

        for col_name in columns {
            let series = df.column(col_name)?.as_materialized_series();
            let value = match self.statistic {
                Statistic::Mean => series.mean(),
                Statistic::Median => series.median(),
            };

            let value = value.ok_or_else(|| EvaluationError::Imputation {
                column: col_name.clone(),
                reason: format!("no values to compute the {}", self.statistic.as_str()),
            })?;

            debug!("{} of '{}': {:.4}", self.statistic.as_str(), col_name, value);
            fill_values.push((col_name.clone(), value));
        }

        Ok(FittedStatistics {
            statistic: self.statistic,
            fill_values,
        })
    }
}

impl FittedStatistics {
    /// Return a copy of `df` with nulls in the fitted columns filled.
    ///
    /// Columns that were not fitted are left untouched.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result_df = df.clone();

        for (col_name, fill_value) in &self.fill_values {
            let series = df.column(col_name)?.as_materialized_series();
            if series.null_count() == 0 {
                continue;
            }
            debug!(
                "Filling {} nulls in '{}' with train {} {:.4}",
                series.null_count(),
                col_name,
                self.statistic.as_str(),
                fill_value
            );
            let filled = fill_numeric_nulls(series, *fill_value)?;
            result_df.replace(col_name, filled)?;
        }

        Ok(result_df)
    }
}
