// Market data processing modules
pub mod feature_engineering;
pub mod summary;
