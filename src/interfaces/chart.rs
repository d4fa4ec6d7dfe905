//! Actual vs predicted close chart

use crate::application::ml::evaluator::PredictionRecord;
use egui_plot::{Legend, Line, Plot, PlotPoints};

const ACTUAL_COLOR: egui::Color32 = egui::Color32::from_rgb(100, 200, 255);
const PREDICTED_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 165, 0);

/// Plot-ready series; x is the bar's Unix timestamp in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub actual: Vec<[f64; 2]>,
    pub predicted: Vec<[f64; 2]>,
}

impl ChartSeries {
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let x = |r: &PredictionRecord| r.date.timestamp() as f64;
        Self {
            actual: records.iter().map(|r| [x(r), r.actual_close]).collect(),
            predicted: records.iter().map(|r| [x(r), r.predicted_close]).collect(),
        }
    }
}

pub struct ChartApp {
    title: String,
    series: ChartSeries,
}

impl ChartApp {
    pub fn new(title: String, records: &[PredictionRecord]) -> Self {
        Self {
            title,
            series: ChartSeries::from_records(records),
        }
    }
}

impl eframe::App for ChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label(egui::RichText::new(&self.title).size(18.0).strong());
            ui.add_space(10.0);

            if self.series.actual.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new("No predictions to plot.").italics());
                });
                return;
            }

            Plot::new("actual_vs_predicted")
                .legend(Legend::default())
                .show_axes([true, true])
                .show_grid([true, true])
                .x_axis_formatter(|mark, _range| {
                    chrono::DateTime::from_timestamp(mark.value as i64, 0)
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default()
                })
                .show(ui, |plot_ui| {
                    plot_ui.line(
                        Line::new("Actual", PlotPoints::from(self.series.actual.clone()))
                            .color(ACTUAL_COLOR)
                            .width(2.0),
                    );
                    plot_ui.line(
                        Line::new("Predicted", PlotPoints::from(self.series.predicted.clone()))
                            .color(PREDICTED_COLOR)
                            .width(1.5),
                    );
                });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_chart_series_from_records() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let records = vec![PredictionRecord {
            date,
            actual_close: 101.0,
            predicted_close: 100.5,
            actual_return: 0.01,
            predicted_return: 0.005,
        }];

        let series = ChartSeries::from_records(&records);
        assert_eq!(series.actual, vec![[date.timestamp() as f64, 101.0]]);
        assert_eq!(series.predicted, vec![[date.timestamp() as f64, 100.5]]);
    }
}
