//! Views over a [`ForecastSeries`]: the next hours, and one summary per day.

use chrono::{NaiveDate, Timelike};

use crate::types::{ForecastEntry, ForecastSeries};

/// Forecast steps are 3 hours apart, so 8 steps cover the next 24 hours.
pub const HOURS_PER_STEP: usize = 3;
pub const NEXT_DAY_STEPS: usize = 24 / HOURS_PER_STEP;

/// One calendar day of the forecast
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast<'a> {
    pub date: NaiveDate,
    /// The 12:00 step when present, else the day's first step
    pub representative: &'a ForecastEntry,
    pub min_temp: f64,
    pub max_temp: f64,
}

/// The first `steps` entries of the series.
pub fn next_hours(series: &ForecastSeries, steps: usize) -> &[ForecastEntry] {
    &series.list[..steps.min(series.list.len())]
}

/// Group entries by the calendar date of `dt_txt`, in feed order.
///
/// Entries whose timestamp cannot be parsed are skipped.
pub fn daily_summary(series: &ForecastSeries) -> Vec<DailyForecast<'_>> {
    let mut days: Vec<(NaiveDate, Vec<&ForecastEntry>)> = Vec::new();

    for entry in &series.list {
        let Some(date) = entry.date() else {
            tracing::debug!(dt_txt = %entry.dt_txt, "Skipping forecast entry with bad timestamp");
            continue;
        };
        if let Some((day, items)) = days.last_mut() {
            if *day == date {
                items.push(entry);
                continue;
            }
        }
        days.push((date, vec![entry]));
    }

    days.into_iter()
        .filter_map(|(date, items)| {
            let first = *items.first()?;
            let representative = items
                .iter()
                .copied()
                .find(|item| item.timestamp().map(|ts| ts.hour()) == Some(12))
                .unwrap_or(first);
            let temps = items.iter().map(|item| item.main.temp);
            let min_temp = temps.clone().fold(f64::INFINITY, f64::min);
            let max_temp = temps.fold(f64::NEG_INFINITY, f64::max);

            Some(DailyForecast {
                date,
                representative,
                min_temp,
                max_temp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{City, ForecastMain, Wind};

    fn entry(dt_txt: &str, temp: f64) -> ForecastEntry {
        ForecastEntry {
            dt: 0,
            main: ForecastMain {
                temp,
                feels_like: temp,
                humidity: 50,
            },
            weather: Vec::new(),
            wind: Wind::default(),
            dt_txt: dt_txt.to_string(),
        }
    }

    fn series(entries: Vec<ForecastEntry>) -> ForecastSeries {
        ForecastSeries {
            list: entries,
            city: City {
                name: "Seoul".into(),
                country: "KR".into(),
            },
        }
    }

    #[test]
    fn test_next_hours_truncates() {
        let s = series((0..10).map(|i| entry(&format!("2024-01-01 {:02}:00:00", i), 1.0)).collect());
        assert_eq!(next_hours(&s, NEXT_DAY_STEPS).len(), 8);

        let short = series(vec![entry("2024-01-01 00:00:00", 1.0)]);
        assert_eq!(next_hours(&short, NEXT_DAY_STEPS).len(), 1);
    }

    #[test]
    fn test_daily_summary_prefers_noon() {
        let s = series(vec![
            entry("2024-01-01 09:00:00", 3.0),
            entry("2024-01-01 12:00:00", 7.0),
            entry("2024-01-01 15:00:00", 5.0),
            entry("2024-01-02 00:00:00", -2.0),
            entry("2024-01-02 03:00:00", -4.0),
        ]);

        let days = daily_summary(&s);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(days[0].representative.dt_txt, "2024-01-01 12:00:00");
        assert_eq!(days[0].min_temp, 3.0);
        assert_eq!(days[0].max_temp, 7.0);

        assert_eq!(days[1].representative.dt_txt, "2024-01-02 00:00:00");
        assert_eq!(days[1].min_temp, -4.0);
    }

    #[test]
    fn test_daily_summary_skips_bad_timestamps() {
        let s = series(vec![entry("garbage", 1.0), entry("2024-01-01 12:00:00", 2.0)]);
        assert_eq!(daily_summary(&s).len(), 1);
    }
}
