pub mod bar_repository;
pub mod database;
pub mod model_store;
pub mod predictions_store;
pub mod price_store;

pub use bar_repository::SqliteBarRepository;
pub use database::Database;
pub use model_store::ModelStore;
pub use predictions_store::PredictionsStore;
pub use price_store::{PriceStore, SavedCsv};
