use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::iso_date;
use crate::{Coordinates, ValidationError};

pub const DEFAULT_FORECAST_DAYS: u8 = 7;
pub const MAX_FORECAST_DAYS: u8 = 16;

/// Current conditions normalized across weather providers.
///
/// Temperature is °C, humidity %, wind speed m/s, rainfall mm over the last hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherObservation {
    pub temperature: f64,
    pub humidity: f64,
    pub conditions: String,
    pub wind_speed: f64,
    pub rainfall: f64,
    pub location: String,
}

/// Validated forecast lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub at: Coordinates,
    pub days: u8,
}

impl ForecastRequest {
    pub fn new(at: Coordinates, days: i64) -> Result<Self, ValidationError> {
        if days < 1 || days > i64::from(MAX_FORECAST_DAYS) {
            return Err(ValidationError::ForecastDaysOutOfRange {
                value: days,
                min: 1,
                max: MAX_FORECAST_DAYS,
            });
        }

        Ok(Self {
            at,
            days: days as u8,
        })
    }

    /// Parse an optional path segment; a missing segment means the default.
    pub fn parse(at: Coordinates, days: Option<&str>) -> Result<Self, ValidationError> {
        let Some(raw) = days else {
            return Ok(Self::with_default_days(at));
        };
        let days = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidForecastDays {
                raw: raw.to_owned(),
            })?;
        Self::new(at, days)
    }

    pub fn with_default_days(at: Coordinates) -> Self {
        Self {
            at,
            days: DEFAULT_FORECAST_DAYS,
        }
    }
}

/// A single forecast sample (three-hour resolution for OpenWeatherMap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub conditions: String,
    pub wind_speed: f64,
    pub rainfall: f64,
}

/// Per-day roll-up of forecast points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub date: String,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub conditions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    pub location: String,
    pub current: Option<ForecastPoint>,
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherAlert {
    pub sender: String,
    pub event: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Group forecast points by UTC day and keep the first `days` days.
///
/// Humidity is averaged, rainfall summed, and the most frequent conditions
/// string wins (earliest on ties).
pub fn summarize_daily(points: &[ForecastPoint], days: u8) -> Vec<DailyForecast> {
    let mut by_day: BTreeMap<time::Date, Vec<&ForecastPoint>> = BTreeMap::new();
    for point in points {
        by_day.entry(point.time.date()).or_default().push(point);
    }

    by_day
        .into_iter()
        .take(usize::from(days))
        .map(|(date, samples)| {
            let count = samples.len() as f64;
            let min_temperature = samples
                .iter()
                .map(|p| p.temperature)
                .fold(f64::INFINITY, f64::min);
            let max_temperature = samples
                .iter()
                .map(|p| p.temperature)
                .fold(f64::NEG_INFINITY, f64::max);
            let humidity = samples.iter().map(|p| p.humidity).sum::<f64>() / count;
            let rainfall = samples.iter().map(|p| p.rainfall).sum::<f64>();

            DailyForecast {
                date: iso_date(date),
                min_temperature,
                max_temperature,
                humidity: round_to(humidity, 1),
                rainfall: round_to(rainfall, 2),
                conditions: dominant_conditions(&samples),
            }
        })
        .collect()
}

fn dominant_conditions(samples: &[&ForecastPoint]) -> String {
    let mut best: Option<(&str, usize)> = None;
    for (index, sample) in samples.iter().enumerate() {
        let seen_before = samples[..index]
            .iter()
            .any(|earlier| earlier.conditions == sample.conditions);
        if seen_before {
            continue;
        }
        let count = samples
            .iter()
            .filter(|other| other.conditions == sample.conditions)
            .count();
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((sample.conditions.as_str(), count));
        }
    }

    best.map(|(conditions, _)| conditions.to_owned())
        .unwrap_or_default()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(unix: i64, temperature: f64, rainfall: f64, conditions: &str) -> ForecastPoint {
        ForecastPoint {
            time: OffsetDateTime::from_unix_timestamp(unix).expect("valid timestamp"),
            temperature,
            humidity: 60.0,
            conditions: conditions.to_owned(),
            wind_speed: 2.0,
            rainfall,
        }
    }

    #[test]
    fn forecast_days_are_bounded() {
        let at = Coordinates::new(10.0, 10.0).expect("valid");
        assert!(ForecastRequest::new(at, 0).is_err());
        assert!(ForecastRequest::new(at, 17).is_err());
        assert_eq!(ForecastRequest::new(at, 3).expect("valid").days, 3);
        assert_eq!(ForecastRequest::with_default_days(at).days, 7);
    }

    #[test]
    fn forecast_days_segment_is_optional() {
        let at = Coordinates::new(10.0, 10.0).expect("valid");
        assert_eq!(ForecastRequest::parse(at, None).expect("default").days, 7);
        assert_eq!(ForecastRequest::parse(at, Some("14")).expect("valid").days, 14);
        assert!(matches!(
            ForecastRequest::parse(at, Some("week")),
            Err(ValidationError::InvalidForecastDays { .. })
        ));
    }

    #[test]
    fn summarize_daily_groups_by_utc_day() {
        // 2024-06-01T00:00Z, 03:00Z, 06:00Z and 2024-06-02T00:00Z
        let points = vec![
            point(1_717_200_000, 14.0, 0.0, "clear sky"),
            point(1_717_210_800, 18.0, 1.25, "light rain"),
            point(1_717_221_600, 22.0, 0.5, "light rain"),
            point(1_717_286_400, 12.0, 0.0, "overcast clouds"),
        ];

        let daily = summarize_daily(&points, 7);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, "2024-06-01");
        assert_eq!(daily[0].min_temperature, 14.0);
        assert_eq!(daily[0].max_temperature, 22.0);
        assert_eq!(daily[0].rainfall, 1.75);
        assert_eq!(daily[0].conditions, "light rain");
        assert_eq!(daily[1].date, "2024-06-02");
    }

    #[test]
    fn summarize_daily_truncates_to_requested_days() {
        let points = vec![
            point(1_717_200_000, 14.0, 0.0, "clear sky"),
            point(1_717_286_400, 12.0, 0.0, "clear sky"),
            point(1_717_372_800, 11.0, 0.0, "clear sky"),
        ];

        assert_eq!(summarize_daily(&points, 2).len(), 2);
    }
}
