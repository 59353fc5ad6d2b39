use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::storage::HourlyAggregate;

/// Average and maximum of one day, from hourly aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub avg: f64,
    pub max: f64,
    pub hours: usize,
}

/// Descriptive statistics of one month, independent of band allocation.
///
/// `avg` is the mean of the hourly averages and `max` the largest hourly
/// maximum. Both are 0 when no usable hour exists.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DescriptiveStats {
    pub avg: f64,
    pub max: f64,
    pub hours: usize,
    pub days: Vec<DailyStats>,
}

#[derive(Default)]
struct Accumulator {
    avg_sum: f64,
    avg_count: usize,
    max: Option<f64>,
    hours: usize,
}

impl Accumulator {
    fn observe(&mut self, aggregate: &HourlyAggregate) {
        let avg = aggregate.avg.filter(|v| v.is_finite());
        let max = aggregate.max.filter(|v| v.is_finite());
        if avg.is_none() && max.is_none() {
            return;
        }

        self.hours += 1;
        if let Some(avg) = avg {
            self.avg_sum += avg;
            self.avg_count += 1;
        }
        if let Some(max) = max {
            self.max = Some(self.max.map_or(max, |current| current.max(max)));
        }
    }

    fn avg(&self) -> f64 {
        if self.avg_count == 0 {
            0.0
        } else {
            self.avg_sum / self.avg_count as f64
        }
    }
}

/// Summarize a month of hourly aggregates, per month and per local day.
///
/// Hours whose avg and max are both missing or non-finite are ignored.
pub fn describe(aggregates: &[HourlyAggregate], offset: FixedOffset) -> DescriptiveStats {
    let mut month = Accumulator::default();
    let mut days: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();

    for aggregate in aggregates {
        month.observe(aggregate);
        let date = aggregate.hour_start.with_timezone(&offset).date_naive();
        days.entry(date).or_default().observe(aggregate);
    }

    let days = days
        .into_iter()
        .filter(|(_, acc)| acc.hours > 0)
        .map(|(date, acc)| DailyStats {
            date,
            avg: acc.avg(),
            max: acc.max.unwrap_or(0.0),
            hours: acc.hours,
        })
        .collect();

    DescriptiveStats {
        avg: month.avg(),
        max: month.max.unwrap_or(0.0),
        hours: month.hours,
        days,
    }
}
