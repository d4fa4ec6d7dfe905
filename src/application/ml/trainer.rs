use super::dataset::{CvFold, walk_forward_folds};
use super::evaluator::RegressionMetrics;
use crate::domain::errors::ModelError;
use crate::domain::ml::feature_row::FeatureMatrix;
use crate::domain::ml::model_kind::ModelKind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

type Linear = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// A fitted smartcore regressor
#[derive(Serialize, Deserialize)]
#[serde(tag = "model", content = "params", rename_all = "snake_case")]
pub enum FittedModel {
    Linear(Linear),
    RandomForest(Forest),
}

impl fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FittedModel::Linear(_) => write!(f, "FittedModel::Linear"),
            FittedModel::RandomForest(_) => write!(f, "FittedModel::RandomForest"),
        }
    }
}

impl FittedModel {
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let x = to_matrix(features)?;
        let predicted = match self {
            FittedModel::Linear(model) => model.predict(&x),
            FittedModel::RandomForest(model) => model.predict(&x),
        };

        predicted.map_err(|e| ModelError::PredictFailed {
            reason: e.to_string(),
        })
    }
}

/// Out-of-sample RMSE across walk-forward folds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub fold_rmse: Vec<f64>,
    pub mean_rmse: f64,
    pub std_rmse: f64,
    /// Fold RMSE std above half its mean
    pub unstable: bool,
}

pub struct Trainer;

impl Trainer {
    /// Fits `kind` on every row of `train`.
    pub fn fit(kind: &ModelKind, train: &FeatureMatrix, seed: u64) -> Result<FittedModel, ModelError> {
        let needed = super::dataset::min_train_rows(train.n_features());
        if train.len() < needed {
            return Err(ModelError::InsufficientRows {
                needed,
                available: train.len(),
            });
        }

        let started = Instant::now();
        let x = to_matrix(&train.features())?;
        let y = train.targets();

        let model = match kind {
            ModelKind::Linear => {
                let params = LinearRegressionParameters::default()
                    .with_solver(LinearRegressionSolverName::SVD);
                Linear::fit(&x, &y, params)
                    .map(FittedModel::Linear)
                    .map_err(|e| fit_failed(kind, e))?
            }
            ModelKind::RandomForest {
                n_trees,
                max_depth,
                min_samples_split,
            } => {
                let params = RandomForestRegressorParameters::default()
                    .with_n_trees(*n_trees)
                    .with_max_depth(*max_depth)
                    .with_min_samples_split(*min_samples_split)
                    .with_seed(seed);
                Forest::fit(&x, &y, params)
                    .map(FittedModel::RandomForest)
                    .map_err(|e| fit_failed(kind, e))?
            }
        };

        info!(
            "Trainer: fitted {} on {} rows x {} features in {:.2?}",
            kind.slug(),
            train.len(),
            train.n_features(),
            started.elapsed()
        );

        Ok(model)
    }

    /// Walk-forward cross validation. `None` when `folds < 2` or no fold
    /// had enough training rows.
    pub fn cross_validate(
        kind: &ModelKind,
        matrix: &FeatureMatrix,
        folds: usize,
        seed: u64,
    ) -> Result<Option<CvSummary>, ModelError> {
        let plan = walk_forward_folds(matrix.len(), folds);
        if plan.is_empty() {
            if folds > 1 {
                warn!("Trainer: no valid CV folds for {} rows", matrix.len());
            }
            return Ok(None);
        }

        let results: Vec<Option<f64>> = plan
            .par_iter()
            .map(|fold| Self::run_fold(kind, matrix, fold, seed))
            .collect::<Result<_, _>>()?;
        let fold_rmse: Vec<f64> = results.into_iter().flatten().collect();

        if fold_rmse.is_empty() {
            return Ok(None);
        }

        let k = fold_rmse.len() as f64;
        let mean_rmse = fold_rmse.iter().sum::<f64>() / k;
        let variance = fold_rmse
            .iter()
            .map(|r| (r - mean_rmse).powi(2))
            .sum::<f64>()
            / (k - 1.0).max(1.0);
        let std_rmse = variance.sqrt();
        let unstable = mean_rmse > 0.0 && std_rmse > 0.5 * mean_rmse;

        info!(
            "Trainer: CV OOS RMSE over {} folds: mean={:.6}, std={:.6}",
            fold_rmse.len(),
            mean_rmse,
            std_rmse
        );
        if unstable {
            warn!("Trainer: model unstable across folds (std > 50% of mean RMSE)");
        }

        Ok(Some(CvSummary {
            fold_rmse,
            mean_rmse,
            std_rmse,
            unstable,
        }))
    }

    /// Folds too small to fit are skipped rather than failing the run.
    fn run_fold(
        kind: &ModelKind,
        matrix: &FeatureMatrix,
        fold: &CvFold,
        seed: u64,
    ) -> Result<Option<f64>, ModelError> {
        let train = matrix.slice(0, fold.train_end);
        let test = matrix.slice(fold.test_start, fold.test_end);

        let model = match Self::fit(kind, &train, seed) {
            Ok(model) => model,
            Err(ModelError::InsufficientRows { needed, available }) => {
                warn!(
                    "Trainer: skipping CV fold {} ({} train rows, need {})",
                    fold.index, available, needed
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let predicted = model.predict(&test.features())?;
        let metrics = RegressionMetrics::calculate(&test.targets(), &predicted).map_err(|e| {
            ModelError::PredictFailed {
                reason: e.to_string(),
            }
        })?;
        Ok(Some(metrics.rmse))
    }
}

fn to_matrix(features: &[Vec<f64>]) -> Result<DenseMatrix<f64>, ModelError> {
    DenseMatrix::from_2d_vec(&features.to_vec()).map_err(|e| ModelError::Matrix {
        reason: e.to_string(),
    })
}

fn fit_failed(kind: &ModelKind, e: smartcore::error::Failed) -> ModelError {
    ModelError::FitFailed {
        model: kind.slug().to_string(),
        reason: e.to_string(),
    }
}
