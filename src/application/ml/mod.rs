pub mod artifact;
pub mod dataset;
pub mod evaluator;
pub mod predictor;
pub mod trainer;
