pub mod interval;
pub mod price_series;
pub mod stock_info;
