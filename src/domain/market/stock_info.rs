use serde::{Deserialize, Serialize};

/// Descriptive information about a listed security.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    pub symbol: String,
    pub long_name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub instrument_type: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<u64>,
    pub last_price: Option<f64>,
}

impl StockInfo {
    /// Market cap with thousands separators, or `N/A`.
    pub fn market_cap_display(&self) -> String {
        match self.market_cap {
            Some(cap) => format!("${}", group_thousands(cap)),
            None => "N/A".to_string(),
        }
    }
}

/// Renders an optional field the way reports expect it.
pub fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
