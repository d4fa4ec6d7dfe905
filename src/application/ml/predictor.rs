use super::artifact::ModelArtifact;
use super::trainer::FittedModel;
use crate::domain::errors::ModelError;
use crate::domain::ml::feature_row::FeatureMatrix;

/// Anything that maps feature rows to predicted returns
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ModelError>;

    /// Model name for logs
    fn name(&self) -> &str;
}

impl Predictor for FittedModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ModelError> {
        FittedModel::predict(self, &features.features())
    }

    fn name(&self) -> &str {
        match self {
            FittedModel::Linear(_) => "linear",
            FittedModel::RandomForest(_) => "random_forest",
        }
    }
}

impl Predictor for ModelArtifact {
    /// Refuses rows built with a different feature recipe.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ModelError> {
        if features.names != self.feature_names {
            return Err(ModelError::FeatureMismatch {
                expected: self.feature_names.clone(),
                actual: features.names.clone(),
            });
        }
        self.model.predict(&features.features())
    }

    fn name(&self) -> &str {
        self.kind.slug()
    }
}
