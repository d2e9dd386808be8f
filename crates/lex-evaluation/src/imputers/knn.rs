use crate::error::{EvaluationError, Result};
use crate::utils::{column_names, frame_to_optional_matrix};
use polars::prelude::*;
use tracing::debug;

pub struct KNNImputer {
    n_neighbors: usize,
}

/// Reference rows and column means learned by [`KNNImputer::fit`].
#[derive(Debug, Clone)]
pub struct FittedKnn {
    n_neighbors: usize,
    columns: Vec<String>,
    reference: Vec<Vec<Option<f64>>>,
    column_means: Vec<f64>,
}

impl KNNImputer {
    /// Create a new KNN imputer with specified number of neighbors
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1), // Ensure at least 1 neighbor
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Store the rows of `df` as donors for later imputation.
    ///
    /// Every column takes part in the distance computation, so `transform`
    /// expects frames with the same columns in the same order.
    pub fn fit(&self, df: &DataFrame) -> Result<FittedKnn> {
        let columns = column_names(df);
        let reference = frame_to_optional_matrix(df)?;

        let mut column_means = Vec::with_capacity(columns.len());
        for (col_idx, col_name) in columns.iter().enumerate() {
            let (sum, count) = reference
                .iter()
                .filter_map(|row| row[col_idx])
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

            if count == 0 {
                return Err(EvaluationError::Imputation {
                    column: col_name.clone(),
                    reason: "no observed values in the fitted data".to_string(),
                });
            }
            column_means.push(sum / count as f64);
        }

        debug!(
            "KNN imputer fitted on {} rows x {} columns (k = {})",
            reference.len(),
            columns.len(),
            self.n_neighbors
        );

        Ok(FittedKnn {
            n_neighbors: self.n_neighbors,
            columns,
            reference,
            column_means,
        })
    }
}

impl FittedKnn {
    /// Return a copy of `df` with every null replaced by the mean of that
    /// column over the `k` nearest fitted rows that observe it.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let columns = column_names(df);
        if columns != self.columns {
            return Err(EvaluationError::InvalidData(format!(
                "KNN imputer was fitted on columns {:?} but received {:?}",
                self.columns, columns
            )));
        }

        let data_matrix = frame_to_optional_matrix(df)?;
        let mut imputed = data_matrix.clone();
        let mut filled = 0usize;

        for (row_idx, row) in data_matrix.iter().enumerate() {
            if row.iter().all(Option::is_some) {
                continue;
            }

            // Distances are computed once per row on the unfilled values.
            let distances: Vec<Option<f64>> = self
                .reference
                .iter()
                .map(|donor| self.calculate_distance(row, donor))
                .collect();

            for (col_idx, value) in row.iter().enumerate() {
                if value.is_none() {
                    imputed[row_idx][col_idx] = Some(self.impute_value(&distances, col_idx));
                    filled += 1;
                }
            }
        }

        debug!("KNN imputed {} values across {} rows", filled, df.height());

        let mut result_df = df.clone();
        for (col_idx, col_name) in self.columns.iter().enumerate() {
            if data_matrix.iter().all(|row| row[col_idx].is_some()) {
                continue;
            }
            let values: Vec<Option<f64>> = imputed.iter().map(|row| row[col_idx]).collect();
            let imputed_series = Series::new(col_name.as_str().into(), values);
            result_df.replace(col_name, imputed_series)?;
        }

        Ok(result_df)
    }

    /// Impute a single missing value from the donors that observe `target_col`
    fn impute_value(&self, distances: &[Option<f64>], target_col: usize) -> f64 {
        let mut candidates: Vec<(usize, f64)> = self
            .reference
            .iter()
            .zip(distances)
            .enumerate()
            .filter_map(|(idx, (donor, distance))| match (donor[target_col], distance) {
                (Some(_), Some(d)) => Some((idx, *d)),
                _ => None,
            })
            .collect();

        if candidates.is_empty() {
            // No donor shares an observed coordinate with this row
            return self.column_means[target_col];
        }

        // Sort by distance, then by donor position for a deterministic order
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let k = self.n_neighbors.min(candidates.len());
        let sum: f64 = candidates
            .iter()
            .take(k)
            .filter_map(|(idx, _)| self.reference[*idx][target_col])
            .sum();

        sum / k as f64
    }

    /// Euclidean distance over coordinates present in both rows, scaled up by
    /// the fraction of coordinates that were present. `None` when no
    /// coordinate is shared.
    fn calculate_distance(&self, row1: &[Option<f64>], row2: &[Option<f64>]) -> Option<f64> {
        let n_cols = row1.len();
        let mut sum_squared_diff = 0.0;
        let mut present = 0usize;

        for (a, b) in row1.iter().zip(row2) {
            if let (Some(a), Some(b)) = (a, b) {
                let diff = a - b;
                sum_squared_diff += diff * diff;
                present += 1;
            }
        }

        if present == 0 {
            None
        } else {
            Some((n_cols as f64 / present as f64 * sum_squared_diff).sqrt())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::numeric_values;

    fn fitted(k: usize, df: &DataFrame) -> FittedKnn {
        KNNImputer::new(k).fit(df).unwrap()
    }

    fn imputed_value(df: &DataFrame, col: &str, row: usize) -> f64 {
        numeric_values(df, col).unwrap()[row].unwrap()
    }

    // ========================================================================
    // KNNImputer::new() tests
    // ========================================================================

    #[test]
    fn test_knn_imputer_new_with_valid_neighbors() {
        let imputer = KNNImputer::new(5);
        assert_eq!(imputer.n_neighbors(), 5);
    }

    #[test]
    fn test_knn_imputer_new_with_zero_neighbors_defaults_to_one() {
        let imputer = KNNImputer::new(0);
        assert_eq!(imputer.n_neighbors(), 1);
    }

    // ========================================================================
    // fit() tests
    // ========================================================================

    #[test]
    fn test_fit_stores_column_means() {
        let train = df![
            "a" => [1.0, 2.0, 3.0],
            "b" => [10.0, 20.0, 60.0],
        ]
        .unwrap();

        let knn = fitted(2, &train);
        assert_eq!(knn.column_means, vec![2.0, 30.0]);
        assert_eq!(knn.reference.len(), 3);
    }

    #[test]
    fn test_fit_rejects_empty_column() {
        let train = df![
            "a" => [1.0, 2.0],
            "b" => [Option::<f64>::None, None],
        ]
        .unwrap();

        let err = KNNImputer::new(2).fit(&train).unwrap_err();
        assert_eq!(err.error_code(), "IMPUTATION_FAILED");
    }

    // ========================================================================
    // transform() tests
    // ========================================================================

    #[test]
    fn test_transform_uses_uniform_mean_of_nearest_donors() {
        let train = df![
            "a" => [1.0, 2.0, 3.0, 100.0],
            "b" => [10.0, 20.0, 30.0, 1000.0],
        ]
        .unwrap();
        let missing = df![
            "a" => [Some(2.1)],
            "b" => [Option::<f64>::None],
        ]
        .unwrap();

        let result = fitted(3, &train).transform(&missing).unwrap();

        // Nearest three donors by `a` are 2, 3, 1 -> mean of 20, 30, 10
        assert!((imputed_value(&result, "b", 0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform_k_larger_than_donor_count() {
        let train = df![
            "a" => [1.0, 3.0],
            "b" => [10.0, 30.0],
        ]
        .unwrap();
        let missing = df![
            "a" => [Some(2.0)],
            "b" => [Option::<f64>::None],
        ]
        .unwrap();

        let result = fitted(30, &train).transform(&missing).unwrap();
        assert_eq!(imputed_value(&result, "b", 0), 20.0);
    }

    #[test]
    fn test_transform_no_shared_coordinates_falls_back_to_mean() {
        let train = df![
            "a" => [1.0, 2.0, 3.0],
            "b" => [10.0, 20.0, 60.0],
        ]
        .unwrap();
        let missing = df![
            "a" => [Option::<f64>::None],
            "b" => [Option::<f64>::None],
        ]
        .unwrap();

        let result = fitted(1, &train).transform(&missing).unwrap();
        assert_eq!(imputed_value(&result, "a", 0), 2.0);
        assert_eq!(imputed_value(&result, "b", 0), 30.0);
    }

    #[test]
    fn test_transform_keeps_observed_values_and_complete_rows() {
        let train = df![
            "a" => [1.0, 2.0, 3.0],
            "b" => [10.0, 20.0, 30.0],
        ]
        .unwrap();
        let target = df![
            "a" => [Some(5.0), Some(1.0)],
            "b" => [Some(7.0), None],
        ]
        .unwrap();

        let result = fitted(1, &train).transform(&target).unwrap();
        let b = numeric_values(&result, "b").unwrap();
        assert_eq!(b, vec![Some(7.0), Some(10.0)]);
        let a = numeric_values(&result, "a").unwrap();
        assert_eq!(a, vec![Some(5.0), Some(1.0)]);
    }

    #[test]
    fn test_transform_rejects_different_columns() {
        let train = df![
            "a" => [1.0, 2.0],
            "b" => [1.0, 2.0],
        ]
        .unwrap();
        let other = df![
            "b" => [Some(1.0)],
            "a" => [Option::<f64>::None],
        ]
        .unwrap();

        assert!(fitted(1, &train).transform(&other).is_err());
    }

    #[test]
    fn test_transform_empty_frame() {
        let train = df![
            "a" => [1.0, 2.0],
        ]
        .unwrap();
        let empty = df![
            "a" => Vec::<Option<f64>>::new(),
        ]
        .unwrap();

        let result = fitted(1, &train).transform(&empty).unwrap();
        assert_eq!(result.height(), 0);
    }

    // ========================================================================
    // calculate_distance() tests
    // ========================================================================

    #[test]
    fn test_calculate_distance_identical_rows() {
        let knn = fitted(1, &df!["a" => [0.0]].unwrap());
        let row = vec![Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(knn.calculate_distance(&row, &row), Some(0.0));
    }

    #[test]
    fn test_calculate_distance_scales_for_missing_coordinates() {
        let knn = fitted(1, &df!["a" => [0.0]].unwrap());

        let row1 = vec![None, Some(0.0), Some(0.0)];
        let row2 = vec![Some(9.0), Some(3.0), Some(4.0)];

        // sqrt(3 / 2 * (9 + 16))
        let expected = (1.5_f64 * 25.0).sqrt();
        let distance = knn.calculate_distance(&row1, &row2).unwrap();
        assert!((distance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_distance_no_common_features() {
        let knn = fitted(1, &df!["a" => [0.0]].unwrap());

        let row1 = vec![Some(1.0), None];
        let row2 = vec![None, Some(2.0)];
        assert_eq!(knn.calculate_distance(&row1, &row2), None);
    }
}
