//! Presentation helpers shared by every view of the data.

use chrono::{DateTime, Utc};

use crate::types::TemperatureUnit;

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Provider icon image for a condition icon code, e.g. `"01d"`.
pub fn icon_url(icon_code: &str) -> String {
    format!("{}/{}@2x.png", ICON_BASE_URL, icon_code)
}

/// Format a Celsius reading in the requested unit, rounded to a whole degree.
///
/// Halves round up (`2.5 → 3`, `-2.5 → -2`) and negative zero prints as `0`.
pub fn format_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    let value = match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    };
    format!("{}{}", round_half_up(value), unit.symbol())
}

fn round_half_up(value: f64) -> i64 {
    // `+ 0.0` turns -0.0 into 0.0
    ((value + 0.5).floor() + 0.0) as i64
}

/// Human-readable age of the last successful refresh.
pub fn format_last_updated(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last_updated else {
        return "never updated".to_string();
    };

    let minutes = (now - last).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{} minute{} ago", minutes, plural(minutes));
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hour{} ago", hours, plural(hours));
    }

    last.format("%b %-d %H:%M").to_string()
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_temperature_celsius() {
        assert_eq!(format_temperature(20.0, TemperatureUnit::Celsius), "20°C");
        assert_eq!(format_temperature(20.4, TemperatureUnit::Celsius), "20°C");
        assert_eq!(format_temperature(20.5, TemperatureUnit::Celsius), "21°C");
    }

    #[test]
    fn test_format_temperature_fahrenheit() {
        assert_eq!(format_temperature(20.0, TemperatureUnit::Fahrenheit), "68°F");
        assert_eq!(format_temperature(-40.0, TemperatureUnit::Fahrenheit), "-40°F");
        assert_eq!(format_temperature(0.0, TemperatureUnit::Fahrenheit), "32°F");
    }

    #[test]
    fn test_small_negatives_round_to_zero() {
        assert_eq!(format_temperature(-0.4, TemperatureUnit::Celsius), "0°C");
        assert_eq!(format_temperature(-0.0, TemperatureUnit::Celsius), "0°C");
        assert_eq!(format_temperature(-0.5, TemperatureUnit::Celsius), "0°C");
        assert_eq!(format_temperature(-0.6, TemperatureUnit::Celsius), "-1°C");
    }

    #[test]
    fn test_icon_url() {
        assert_eq!(icon_url("01d"), "https://openweathermap.org/img/wn/01d@2x.png");
    }

    #[test]
    fn test_format_last_updated() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();

        assert_eq!(format_last_updated(None, now), "never updated");
        assert_eq!(format_last_updated(Some(now - Duration::seconds(20)), now), "just now");
        assert_eq!(format_last_updated(Some(now - Duration::minutes(1)), now), "1 minute ago");
        assert_eq!(format_last_updated(Some(now - Duration::minutes(45)), now), "45 minutes ago");
        assert_eq!(format_last_updated(Some(now - Duration::hours(3)), now), "3 hours ago");
        assert_eq!(
            format_last_updated(Some(now - Duration::days(2)), now),
            "Mar 8 15:30"
        );
    }
}
