pub mod feature_registry;
pub mod feature_row;
pub mod model_kind;
