//! Plain-text views of a [`ComputeResult`] for the command line.

use serde::Serialize;
use std::fmt::{self, Write as _};

use crate::analysis::{BandEdges, ComputeResult, BAND_COUNT};

/// How many of the most recent months the text table shows.
pub const TABLE_MONTHS: usize = 12;

/// Label of one band, e.g. `"100.0–200.0 W"`.
pub fn band_label(edges: &BandEdges, band: usize) -> String {
    format!("{:.1}–{:.1} W", edges.lower(band), edges.upper(band))
}

/// Short summary: the current month against the reference maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub series_id: String,
    pub latest_month: Option<String>,
    pub latest_max: f64,
    pub latest_avg: f64,
    pub scale_max: f64,
    pub band_labels: Vec<String>,
}

impl Summary {
    pub fn from_result(result: &ComputeResult) -> Self {
        let latest = result.latest();

        Self {
            series_id: result.series_id.clone(),
            latest_month: latest.map(|m| m.window.label()),
            latest_max: latest.map_or(0.0, |m| m.outcome.result().max_value),
            latest_avg: latest.map_or(0.0, |m| m.descriptive.avg),
            scale_max: result.global_max,
            band_labels: (0..BAND_COUNT).map(|b| band_label(&result.edges, b)).collect(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Series {}", self.series_id)?;
        match &self.latest_month {
            Some(month) => writeln!(
                f,
                "  Current month ({}): max {:.1} W, average {:.1} W",
                month, self.latest_max, self.latest_avg
            )?,
            None => writeln!(f, "  Current month: no data")?,
        }
        write!(f, "  Reference maximum (scale): {:.1} W", self.scale_max)
    }
}

/// Width of one month column in [`format_table`].
const CELL_WIDTH: usize = 17;

/// Band-by-month table, highest band first, covering the last
/// [`TABLE_MONTHS`] months. Each cell shows the share and the minutes spent
/// in the band; the cell holding the global maximum is marked `*`. Footer
/// rows give the per-month share total, total minutes and avg/max.
pub fn format_table(result: &ComputeResult) -> String {
    let skip = result.months.len().saturating_sub(TABLE_MONTHS);
    let months = &result.months[skip..];
    let pointer = result
        .global_max_pointer
        .filter(|p| p.month_index >= skip)
        .map(|p| (p.month_index - skip, p.band_index));

    let mut out = String::new();
    let _ = write!(out, "{:<22}", "Band");
    for month in months {
        let _ = write!(out, "{:>w$}", month.window.label(), w = CELL_WIDTH);
    }
    out.push('\n');

    for band in (0..BAND_COUNT).rev() {
        let _ = write!(out, "{:<22}", band_label(&result.edges, band));
        for (i, month) in months.iter().enumerate() {
            let cell = match month.outcome.computed() {
                Some(r) => {
                    let marker = if pointer == Some((i, band)) { "*" } else { "" };
                    format!(
                        "{}{:.2}% {}m",
                        marker,
                        r.percent_per_band[band],
                        r.seconds_per_band[band] / 60
                    )
                }
                None => "—".to_string(),
            };
            let _ = write!(out, "{:>w$}", cell, w = CELL_WIDTH);
        }
        out.push('\n');
    }

    let _ = write!(out, "{:<22}", "Sum");
    for month in months {
        let cell = match month.outcome.computed() {
            Some(r) => {
                let hundredths: u32 = r.hundredths_per_band.iter().sum();
                format!("{:.2}% {}m", hundredths as f64 / 100.0, r.total_seconds() / 60)
            }
            None => "—".to_string(),
        };
        let _ = write!(out, "{:>w$}", cell, w = CELL_WIDTH);
    }
    out.push('\n');

    let _ = write!(out, "{:<22}", "Avg / Max");
    for month in months {
        let _ = write!(
            out,
            "{:>w$}",
            format!("{:.0}/{:.0}", month.descriptive.avg, month.descriptive.max),
            w = CELL_WIDTH
        );
    }
    out.push('\n');

    out
}
