// Market data exploration and feature preparation
pub mod market_data;

// Model training, evaluation and artifacts
pub mod ml;

// Orchestration used by every CLI subcommand
pub mod pipeline;

// Console reports
pub mod reporting;
