//! Console reports for the CLI
//!
//! The fetch report walks through the close-price statistics in plain
//! language; the training report shows the target distribution, metrics and
//! a residual histogram.

use crate::application::market_data::summary::SummaryStats;
use crate::application::ml::evaluator::{Evaluation, RegressionMetrics};
use crate::application::ml::trainer::CvSummary;
use crate::domain::market::interval::Ticker;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::market::stock_info::{StockInfo, or_na};
use crate::domain::ml::feature_row::FeatureMatrix;
use crate::infrastructure::persistence::SavedCsv;

const RULE: &str = "══════════════════════════════════════════════════════";
const HISTOGRAM_BUCKETS: usize = 10;
const HISTOGRAM_WIDTH: f64 = 40.0;

pub fn print_info(info: &StockInfo) {
    println!("\n--- Stock Information for {} ---", info.symbol);
    println!("Company:    {}", or_na(&info.long_name));
    println!("Exchange:   {}", or_na(&info.exchange));
    println!("Type:       {}", or_na(&info.instrument_type));
    println!("Sector:     {}", or_na(&info.sector));
    println!("Industry:   {}", or_na(&info.industry));
    println!("Market Cap: {}", info.market_cap_display());
    println!("Currency:   {}", or_na(&info.currency));
    if let Some(price) = info.last_price {
        println!("Last Price: {:.2}", price);
    }
}

pub fn print_fetched(series: &PriceSeries) {
    println!("Successfully fetched {} rows of data", series.len());
    println!(
        "Date range: {} to {}",
        series.first().timestamp,
        series.last().timestamp
    );
    print_head(series, 5);
}

pub fn print_head(series: &PriceSeries, n: usize) {
    println!("\nFirst {} rows of data:", n.min(series.len()));
    println!(
        "{:<26} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for bar in series.head(n) {
        println!(
            "{:<26} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>14.0}",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S%:z"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );
    }
}

/// Close-price statistics with an explanation under each figure, then the story.
pub fn print_summary(ticker: &Ticker, stats: &SummaryStats) {
    println!("\nBasic Statistics:");

    println!("\ncount: {:.6}", stats.count as f64);
    println!("What it means: The number of data points (trading days) in your dataset.");

    println!("\nmean: {:.6}", stats.mean);
    println!(
        "What it means: The average closing price across all {} days.",
        stats.count
    );

    println!("\nstd: {:.6} (Standard Deviation)", stats.std);
    println!("What it means: How much the stock price varies or spreads out from the average.");

    println!("\nmin: {:.6}", stats.min);
    println!("What it means: The lowest closing price in the dataset.");

    println!("\n25%: {:.6} (First Quartile)", stats.q25);
    println!(
        "What it means: 25% of the days, the stock closed at or below ${:.2}.",
        stats.q25
    );

    println!("\n50%: {:.6} (Median)", stats.median);
    println!(
        "What it means: The middle value. Half the days were above this price, half were below."
    );

    println!("\n75%: {:.6} (Third Quartile)", stats.q75);
    println!(
        "What it means: 75% of the days, the stock closed at or below ${:.2}.",
        stats.q75
    );

    println!("\nmax: {:.6}", stats.max);
    println!("What it means: The highest closing price in the dataset.");

    let story = stats.story();
    println!("\n{}", "=".repeat(60));
    println!("Putting It All Together - The Story");
    println!("{}", "=".repeat(60));
    println!("These stats tell us:");
    println!("1. {} averaged ${:.0} over the period", ticker, stats.mean);
    println!(
        "2. Prices ranged from ${:.0} to ${:.0} - that's a ${:.0} spread (about {:.0}% increase from low to high!)",
        stats.min, stats.max, story.price_range, story.percent_increase
    );
    println!(
        "3. Most days (50% of them) the stock was between ${:.0} and ${:.0} (the 25%-75% range, ${:.0} wide)",
        stats.q25, stats.q75, story.iqr
    );
    println!(
        "4. Standard deviation of ${:.0} means daily prices typically varied by about {:.0}% from average",
        stats.std, story.volatility_percent
    );
}

pub fn print_saved(saved: &SavedCsv) {
    println!("Data saved to: {}", saved.path.display());
    println!("File size: {:.2} KB", saved.size_kb());
}

pub fn print_target_distribution(matrix: &FeatureMatrix) {
    let y = matrix.targets();
    let n = y.len();
    if n == 0 {
        return;
    }

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let y_pos = y.iter().filter(|&&v| v > 0.0).count();
    let y_min = y.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    println!("\nTarget Distribution (next-bar return):");
    println!("  Total:    {}", n);
    println!("  Mean:     {:.6} ({:.4}%)", y_mean, y_mean * 100.0);
    println!(
        "  Positive: {} ({:.1}%)",
        y_pos,
        y_pos as f64 / n as f64 * 100.0
    );
    println!("  Min:      {:+.4}%", y_min * 100.0);
    println!("  Max:      {:+.4}%", y_max * 100.0);
}

pub fn print_cv(cv: Option<&CvSummary>) {
    match cv {
        None => println!("CV: No valid folds."),
        Some(cv) => {
            println!(
                "CV OOS RMSE over {} folds: mean={:.6}, std={:.6}",
                cv.fold_rmse.len(),
                cv.mean_rmse,
                cv.std_rmse
            );
            if cv.unstable {
                println!(
                    "  WARNING: fold RMSE std is {:.0}% of the mean, the model is unstable across periods",
                    cv.std_rmse / cv.mean_rmse * 100.0
                );
            }
        }
    }
}

pub fn print_evaluation(model: &str, evaluation: &Evaluation) {
    println!("\n{}", RULE);
    println!("  EVALUATION ({})", model);
    println!("{}", RULE);

    println!("\n  Returns:");
    print_metrics(&evaluation.returns, true);
    println!("\n  Prices (prev close x (1 + predicted return)):");
    print_metrics(&evaluation.prices, false);

    print_residual_histogram(&evaluation.residuals());
    println!("{}\n", RULE);
}

fn print_metrics(m: &RegressionMetrics, as_percent: bool) {
    println!("    Rows:        {}", m.n);
    if as_percent {
        println!("    RMSE:        {:.6}  ({:.4}%)", m.rmse, m.rmse * 100.0);
        println!("    MAE:         {:.6}  ({:.4}%)", m.mae, m.mae * 100.0);
    } else {
        println!("    RMSE:        {:.4}", m.rmse);
        println!("    MAE:         {:.4}", m.mae);
    }
    println!("    R²:          {:.4}", m.r2);
    match m.mape {
        Some(mape) => println!("    MAPE:        {:.2}%", mape),
        None => println!("    MAPE:        N/A"),
    }
    println!(
        "    Direction:   {:.1}%",
        m.directional_accuracy * 100.0
    );
}

/// One histogram row: `[lo, hi)` and its count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBucket {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Equal-width buckets between min and max; the max lands in the last bucket.
/// Empty when the values have no spread.
pub fn histogram(values: &[f64], n_buckets: usize) -> Vec<HistogramBucket> {
    if values.is_empty() || n_buckets == 0 {
        return Vec::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return Vec::new();
    }

    let bucket_size = range / n_buckets as f64;
    let mut counts = vec![0usize; n_buckets];
    for v in values {
        let idx = ((v - min) / bucket_size).floor() as usize;
        counts[idx.min(n_buckets - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lo = min + i as f64 * bucket_size;
            HistogramBucket {
                lo,
                hi: lo + bucket_size,
                count,
            }
        })
        .collect()
}

pub fn print_residual_histogram(residuals: &[f64]) {
    println!("\n  Residual Histogram (actual - predicted return):");
    let buckets = histogram(residuals, HISTOGRAM_BUCKETS);
    if buckets.is_empty() {
        println!("    (no spread)");
        return;
    }

    let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(1).max(1);
    for b in &buckets {
        let bar_len = (b.count as f64 / max_count as f64 * HISTOGRAM_WIDTH).ceil() as usize;
        let bar: String = "█".repeat(bar_len);
        println!(
            "    [{:+.5}% .. {:+.5}%] {:>7} {}",
            b.lo * 100.0,
            b.hi * 100.0,
            b.count,
            bar
        );
    }
}
