//! Dataset partitioning.
//!
//! Column 0 of the input frame is a continuous target score; every other
//! column is a numeric feature. Rows with at least one absent feature value
//! form the `missing` partition. Complete rows are divided into a fixed-size
//! random `train` sample and the remaining `test` rows.

use crate::config::EvaluationConfig;
use crate::error::{EvaluationError, Result, ResultExt};
use crate::types::{Label, PartitionSizes};
use crate::utils::{column_names, frame_to_matrix, numeric_values, take_rows};
use polars::prelude::*;
use rand::prelude::*;
use tracing::{debug, info, warn};

/// One partition of the dataset: feature rows, their labels and the
/// positions of the rows in the input frame.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Feature columns only, all `Float64`, absent values as null.
    pub features: DataFrame,
    pub labels: Vec<Label>,
    pub row_indices: Vec<usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Dense row-major feature matrix. Fails if any value is absent.
    pub fn matrix(&self) -> Result<Vec<Vec<f64>>> {
        frame_to_matrix(&self.features)
    }
}

/// The three partitions produced by [`Splitter::split`], frozen for the
/// rest of the run.
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub target_name: String,
    pub feature_names: Vec<String>,
    pub train: Partition,
    pub test: Partition,
    pub missing: Partition,
    /// Feature columns with at least one absent value anywhere, in column order.
    pub missing_columns: Vec<String>,
}

impl DataSplit {
    pub fn sizes(&self) -> PartitionSizes {
        PartitionSizes {
            train: self.train.len(),
            test: self.test.len(),
            missing: self.missing.len(),
        }
    }
}

/// Splits a labeled dataset into train, test and missing partitions.
pub struct Splitter;

impl Splitter {
    pub fn split(df: &DataFrame, config: &EvaluationConfig) -> Result<DataSplit> {
        if df.width() < 2 {
            return Err(EvaluationError::NoTargetColumn { width: df.width() });
        }

        let names = column_names(df);
        let target_name = names[0].clone();
        let feature_names = names[1..].to_vec();

        let labels: Vec<Label> = numeric_values(df, &target_name)
            .context(format!("target column '{}'", target_name))?
            .into_iter()
            .map(|score| Label::from(score.is_some_and(|s| s >= config.threshold)))
            .collect();

        // Normalize every feature to Float64 with NaN folded into null
        let mut is_missing = vec![false; df.height()];
        let mut missing_columns = Vec::new();
        let mut columns = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let values = numeric_values(df, name)?;
            let mut column_has_missing = false;
            for (flag, value) in is_missing.iter_mut().zip(&values) {
                if value.is_none() {
                    *flag = true;
                    column_has_missing = true;
                }
            }
            if column_has_missing {
                missing_columns.push(name.clone());
            }
            columns.push(Series::new(name.as_str().into(), values).into_column());
        }
        let features = DataFrame::new(columns)?;

        let (complete_rows, missing_rows): (Vec<usize>, Vec<usize>) =
            (0..df.height()).partition(|&row| !is_missing[row]);

        if complete_rows.len() < config.train_size {
            return Err(EvaluationError::InsufficientData {
                required: config.train_size,
                available: complete_rows.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let train_rows: Vec<usize> = complete_rows
            .choose_multiple(&mut rng, config.train_size)
            .copied()
            .collect();

        let mut in_train = vec![false; df.height()];
        for &row in &train_rows {
            in_train[row] = true;
        }
        let test_rows: Vec<usize> = complete_rows
            .iter()
            .copied()
            .filter(|&row| !in_train[row])
            .collect();

        let split = DataSplit {
            train: Self::partition(&features, &labels, train_rows)?,
            test: Self::partition(&features, &labels, test_rows)?,
            missing: Self::partition(&features, &labels, missing_rows)?,
            target_name,
            feature_names,
            missing_columns,
        };

        let sizes = split.sizes();
        info!(
            "Split {} rows: train={}, test={}, missing={}",
            df.height(),
            sizes.train,
            sizes.test,
            sizes.missing
        );
        debug!("Columns with missing values: {:?}", split.missing_columns);
        if split.missing.is_empty() {
            warn!("No rows with missing values; missing-only accuracies will be 0.0");
        }

        Ok(split)
    }

    fn partition(features: &DataFrame, labels: &[Label], rows: Vec<usize>) -> Result<Partition> {
        Ok(Partition {
            features: take_rows(features, &rows)?,
            labels: rows.iter().map(|&row| labels[row]).collect(),
            row_indices: rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(train_size: usize) -> EvaluationConfig {
        EvaluationConfig::builder()
            .train_size(train_size)
            .build()
            .unwrap()
    }

    fn sample_frame() -> DataFrame {
        df![
            "score" => [0.9, 0.1, 0.5, 0.4, 0.7, 0.2, 0.8],
            "f1" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0), Some(7.0)],
            "f2" => [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(f64::NAN), Some(6.0), Some(7.0)],
            "f3" => [1i64, 2, 3, 4, 5, 6, 7],
        ]
        .unwrap()
    }

    #[test]
    fn test_split_partitions_are_complete_and_disjoint() {
        let split = Splitter::split(&sample_frame(), &config(3)).unwrap();

        assert_eq!(split.train.len(), 3);
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.missing.len(), 2);

        let mut all: Vec<usize> = split
            .train
            .row_indices
            .iter()
            .chain(&split.test.row_indices)
            .chain(&split.missing.row_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_missing_rows_keep_input_order() {
        let split = Splitter::split(&sample_frame(), &config(3)).unwrap();

        assert_eq!(split.missing.row_indices, vec![2, 4]);
        assert!(split.test.row_indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_split_labels_follow_threshold() {
        let split = Splitter::split(&sample_frame(), &config(3)).unwrap();

        // Row 2 has score 0.5 (>= threshold), row 4 has 0.7
        assert_eq!(split.missing.labels, vec![1, 1]);
        for (row, label) in split.train.row_indices.iter().zip(&split.train.labels) {
            let expected = [1, 0, 1, 0, 1, 0, 1][*row];
            assert_eq!(*label, expected);
        }
    }

    #[test]
    fn test_split_missing_columns_in_column_order() {
        let split = Splitter::split(&sample_frame(), &config(3)).unwrap();

        assert_eq!(split.target_name, "score");
        assert_eq!(split.feature_names, vec!["f1", "f2", "f3"]);
        assert_eq!(split.missing_columns, vec!["f1", "f2"]);
    }

    #[test]
    fn test_split_normalizes_features_to_float_with_nulls() {
        let split = Splitter::split(&sample_frame(), &config(3)).unwrap();

        let f2 = split.missing.features.column("f2").unwrap();
        assert!(matches!(f2.dtype(), DataType::Float64));
        // NaN in the input becomes null
        assert_eq!(f2.null_count(), 1);
        assert!(split.train.matrix().is_ok());
        assert!(split.missing.matrix().is_err());
    }

    #[test]
    fn test_split_is_deterministic_for_seed() {
        let a = Splitter::split(&sample_frame(), &config(3)).unwrap();
        let b = Splitter::split(&sample_frame(), &config(3)).unwrap();
        assert_eq!(a.train.row_indices, b.train.row_indices);
        assert_eq!(a.test.row_indices, b.test.row_indices);
    }

    #[test]
    fn test_split_insufficient_data() {
        let err = Splitter::split(&sample_frame(), &config(6)).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::InsufficientData {
                required: 6,
                available: 5
            }
        ));
    }

    #[test]
    fn test_split_no_target_column() {
        let df = df!["score" => [0.1, 0.9]].unwrap();
        let err = Splitter::split(&df, &config(1)).unwrap_err();
        assert!(matches!(err, EvaluationError::NoTargetColumn { width: 1 }));
    }

    #[test]
    fn test_split_rejects_string_features() {
        let df = df![
            "score" => [0.1, 0.9],
            "name" => ["a", "b"],
        ]
        .unwrap();
        let err = Splitter::split(&df, &config(1)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_split_null_target_is_label_zero() {
        let df = df![
            "score" => [None, Some(0.9), Some(0.8)],
            "f1" => [1.0, 2.0, 3.0],
        ]
        .unwrap();
        let split = Splitter::split(&df, &config(3)).unwrap();

        let mut pairs: Vec<(usize, Label)> = split
            .train
            .row_indices
            .iter()
            .copied()
            .zip(split.train.labels.iter().copied())
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 1)]);
    }
}
