use crate::domain::errors::ModelError;
use crate::domain::ml::feature_row::FeatureMatrix;

/// Folds with fewer training rows are skipped
pub const MIN_FOLD_TRAIN_ROWS: usize = 10;
const CV_GAP_PCT: f64 = 0.05;

/// Chronological train/test partition of a feature matrix
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
}

/// Splits at `floor(n * (1 - test_ratio))`. No shuffling.
///
/// `test_ratio` of 0 keeps every row for training.
pub fn chronological_split(
    matrix: &FeatureMatrix,
    test_ratio: f64,
) -> Result<DatasetSplit, ModelError> {
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(ModelError::InvalidSplit {
            reason: format!("test ratio must be in [0, 1), got {}", test_ratio),
        });
    }

    let n = matrix.len();
    let split = (n as f64 * (1.0 - test_ratio)).floor() as usize;
    let needed = min_train_rows(matrix.n_features());

    if split < needed {
        return Err(ModelError::InsufficientRows {
            needed,
            available: split,
        });
    }

    Ok(DatasetSplit {
        train: matrix.slice(0, split),
        test: matrix.slice(split, n),
    })
}

/// Fewest rows a model can be fitted on
pub fn min_train_rows(n_features: usize) -> usize {
    n_features + 2
}

/// Walk-forward fold boundaries: train `[0, train_end)`, test `[test_start, test_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvFold {
    pub index: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// Test regions tile 20%..80% of `n` rows; each train region ends a 5% gap
/// before its test region.
pub fn walk_forward_folds(n: usize, folds: usize) -> Vec<CvFold> {
    if folds < 2 {
        return Vec::new();
    }

    let gap = (n as f64 * CV_GAP_PCT).floor() as usize;
    let boundary = |i: usize| (n as f64 * (0.2 + (i as f64 / folds as f64) * 0.6)).floor() as usize;

    (0..folds)
        .filter_map(|index| {
            let test_start = boundary(index);
            let test_end = boundary(index + 1).min(n);
            let train_end = test_start.saturating_sub(gap).min(n);

            if train_end < MIN_FOLD_TRAIN_ROWS || test_end <= test_start {
                return None;
            }

            Some(CvFold {
                index,
                train_end,
                test_start,
                test_end,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_row::FeatureRow;
    use chrono::{Duration, TimeZone, Utc};

    fn matrix(n: usize, n_features: usize) -> FeatureMatrix {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        FeatureMatrix {
            names: (0..n_features).map(|i| format!("f{}", i)).collect(),
            rows: (0..n)
                .map(|i| FeatureRow {
                    timestamp: start + Duration::days(i as i64),
                    features: vec![i as f64; n_features],
                    target: 0.0,
                    prev_close: 100.0,
                    close: 100.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_split_sizes() {
        let split = chronological_split(&matrix(100, 3), 0.2).unwrap();
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.test.len(), 20);
        assert!(split.train.rows.last().unwrap().timestamp < split.test.rows[0].timestamp);

        let split = chronological_split(&matrix(101, 3), 0.25).unwrap();
        assert_eq!(split.train.len(), 75);
        assert_eq!(split.test.len(), 26);
    }

    #[test]
    fn test_zero_ratio_keeps_everything() {
        let split = chronological_split(&matrix(30, 3), 0.0).unwrap();
        assert_eq!(split.train.len(), 30);
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_invalid_ratio() {
        assert!(matches!(
            chronological_split(&matrix(30, 3), 1.0),
            Err(ModelError::InvalidSplit { .. })
        ));
        assert!(matches!(
            chronological_split(&matrix(30, 3), -0.1),
            Err(ModelError::InvalidSplit { .. })
        ));
    }

    #[test]
    fn test_too_few_train_rows() {
        // 10 rows * 0.5 = 5 train rows, 5 features need 7
        assert!(matches!(
            chronological_split(&matrix(10, 5), 0.5),
            Err(ModelError::InsufficientRows {
                needed: 7,
                available: 5
            })
        ));
    }

    #[test]
    fn test_walk_forward_folds() {
        let folds = walk_forward_folds(200, 3);
        assert_eq!(folds.len(), 3);
        // first test region starts at 40 with a 10 row gap
        assert_eq!(folds[0].index, 0);
        assert_eq!(folds[0].test_start, 40);
        assert_eq!(folds[0].train_end, 30);
        for pair in folds.windows(2) {
            assert_eq!(pair[0].test_end, pair[1].test_start);
        }
        for fold in &folds {
            assert!(fold.train_end < fold.test_start);
        }
    }

    #[test]
    fn test_walk_forward_skips_small_folds() {
        // n = 40: first test region starts at 8, so its train region is too small
        let folds = walk_forward_folds(40, 2);
        assert!(folds.iter().all(|f| f.train_end >= MIN_FOLD_TRAIN_ROWS));
        assert!(walk_forward_folds(40, 1).is_empty());
    }
}
