pub mod cached_provider;
pub mod core;
pub mod mock;
pub mod observability;
pub mod persistence;
pub mod yahoo;

pub use cached_provider::CachedMarketDataService;
pub use mock::MockMarketDataService;
pub use yahoo::YahooMarketDataService;
