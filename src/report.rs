use anyhow::Result;

use crate::session::{SessionSummary, SummarySink};

/// Emits the summary as one structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSummary;

impl SummarySink for TracingSummary {
    fn report(&self, summary: &SessionSummary) -> Result<()> {
        tracing::info!(
            symbol = %summary.symbol,
            interval = %summary.interval,
            model = %summary.model,
            cycles = summary.cycles,
            updates = summary.updates,
            forecasts = summary.forecasts_issued,
            correct = summary.tally.correct,
            incorrect = summary.tally.incorrect,
            hit_rate = ?summary.hit_rate,
            mae = ?summary.mae,
            rmse = ?summary.rmse,
            final_coefficients = ?summary.final_params.as_ref().map(|p| &p.coefficients),
            final_intercept = ?summary.final_params.as_ref().map(|p| p.intercept),
            elapsed_secs = (summary.ended_at - summary.started_at).num_seconds(),
            "Session summary"
        );
        Ok(())
    }
}

#[cfg(feature = "plot")]
pub use chart::ChartSummary;

#[cfg(feature = "plot")]
mod chart {
    use std::path::PathBuf;

    use anyhow::{anyhow, Result};
    use plotters::prelude::*;

    use crate::session::{SessionSummary, SummarySink};
    use crate::storage::JsonForecastLog;

    /// Renders forecast vs. actual prices from the session's forecast log
    /// to `chart-<date>.png`.
    #[derive(Debug, Clone)]
    pub struct ChartSummary {
        log: JsonForecastLog,
        out_dir: PathBuf,
        size: (u32, u32),
    }

    impl ChartSummary {
        pub fn new(log: JsonForecastLog, out_dir: impl Into<PathBuf>) -> Self {
            Self {
                log,
                out_dir: out_dir.into(),
                size: (1280, 540),
            }
        }
    }

    impl SummarySink for ChartSummary {
        fn report(&self, summary: &SessionSummary) -> Result<()> {
            let mut records = self.log.load()?;
            if records.len() < 2 {
                tracing::debug!(records = records.len(), "Too few settled forecasts to chart");
                return Ok(());
            }
            records.reverse();

            let actual: Vec<f64> = records.iter().map(|r| r.actual_price()).collect();
            let forecast: Vec<f64> = records.iter().map(|r| r.record.forecast_price).collect();
            let (lo, hi) = actual
                .iter()
                .chain(forecast.iter())
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(*v), hi.max(*v))
                });
            let pad = ((hi - lo) * 0.05).max(1e-6);

            std::fs::create_dir_all(&self.out_dir)?;
            let path = self.out_dir.join(format!(
                "chart-{}.png",
                summary.ended_at.date_naive().format("%Y-%m-%d")
            ));
            let root = BitMapBackend::new(&path, self.size).into_drawing_area();
            root.fill(&WHITE).map_err(|e| anyhow!("{e}"))?;
            let mut chart = ChartBuilder::on(&root)
                .caption(
                    format!("{} {} {}", summary.symbol, summary.interval, summary.model),
                    ("sans-serif", 20),
                )
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(60)
                .build_cartesian_2d(0usize..records.len(), (lo - pad)..(hi + pad))
                .map_err(|e| anyhow!("{e}"))?;
            chart
                .configure_mesh()
                .x_desc("settled forecast")
                .y_desc("price")
                .draw()
                .map_err(|e| anyhow!("{e}"))?;
            chart
                .draw_series(LineSeries::new(
                    actual.iter().enumerate().map(|(i, v)| (i, *v)),
                    &BLUE,
                ))
                .map_err(|e| anyhow!("{e}"))?
                .label("actual")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
            chart
                .draw_series(LineSeries::new(
                    forecast.iter().enumerate().map(|(i, v)| (i, *v)),
                    &RED,
                ))
                .map_err(|e| anyhow!("{e}"))?
                .label("forecast")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(|e| anyhow!("{e}"))?;
            root.present().map_err(|e| anyhow!("{e}"))?;
            tracing::info!(path = %path.display(), points = records.len(), "Forecast chart written");
            Ok(())
        }
    }
}
