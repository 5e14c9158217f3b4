//! Folding 3-hour forecast samples into per-day summaries.

use chrono::{DateTime, NaiveDate};

use crate::types::{ApiForecastSample, ForecastDay};

pub const MAX_FORECAST_DAYS: usize = 5;

/// Group samples by UTC calendar date, in the order dates are first seen.
///
/// Each day keeps the lowest min and highest max across its samples and the
/// condition of its first sample. Only the first [`MAX_FORECAST_DAYS`] dates
/// are kept.
pub fn group_by_day(samples: &[ApiForecastSample]) -> Vec<ForecastDay> {
    let mut days: Vec<ForecastDay> = Vec::with_capacity(MAX_FORECAST_DAYS);

    for sample in samples {
        let Some(date) = sample_date(sample) else {
            tracing::debug!("Skipping forecast sample with invalid timestamp {}", sample.dt);
            continue;
        };
        let (min, max) = sample.min_max();

        if let Some(day) = days.iter_mut().find(|d| d.date == date) {
            day.min_temp = fold(day.min_temp, min, f64::min);
            day.max_temp = fold(day.max_temp, max, f64::max);
            continue;
        }

        if days.len() == MAX_FORECAST_DAYS {
            continue;
        }

        let condition = sample.condition();
        days.push(ForecastDay {
            date,
            min_temp: min,
            max_temp: max,
            condition_text: condition.map(|c| c.description.clone()),
            icon_id: condition.and_then(|c| c.icon.clone()),
        });
    }

    days
}

fn sample_date(sample: &ApiForecastSample) -> Option<NaiveDate> {
    DateTime::from_timestamp(sample.dt, 0).map(|dt| dt.date_naive())
}

fn fold(current: Option<f64>, next: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (current, next) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}
