// ABOUTME: Open-Meteo weekly forecast client and outdoor-suitability heuristics
// ABOUTME: Derives precipitation chance, advisories, and suitability per forecast day
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Weather Intelligence
//!
//! Weekly forecasts feed both prompt construction and the weather snapshot
//! stored with each suggestion. The provider is degradable: the planner
//! treats any failure here as "no forecast" and keeps going.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::errors::{AppError, AppResult};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Daytime high below this is too cold for outdoor family activities (°C)
const OUTDOOR_MIN_HIGH_C: f64 = 5.0;
/// Heat advisory threshold (°C)
const HEAT_ADVISORY_HIGH_C: f64 = 32.0;
/// Severe-cold advisory threshold (°C)
const COLD_ADVISORY_LOW_C: f64 = -5.0;
/// Heavy-precipitation advisory threshold (mm)
const HEAVY_PRECIP_MM: f64 = 15.0;
/// Significant-snowfall threshold (mm)
const SIGNIFICANT_SNOW_MM: f64 = 5.0;

/// Weather service errors
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("no location or coordinates supplied")]
    MissingLocation,

    #[error("malformed forecast response: {0}")]
    MalformedResponse(String),
}

impl From<WeatherError> for AppError {
    fn from(error: WeatherError) -> Self {
        Self::external_service("weather", error.to_string())
    }
}

/// One day of forecast with derived suitability fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherDay {
    pub date: NaiveDate,
    pub condition: String,
    /// (low, high) in °C
    pub temperature_range: (f64, f64),
    pub precipitation_mm: f64,
    pub rain_mm: f64,
    pub snow_mm: f64,
    /// Percentage bucketed from precipitation volume
    pub precipitation_chance: u8,
    pub suitable_for_outdoor: bool,
    pub suitability_reasons: Vec<String>,
    pub advisories: Vec<String>,
}

impl WeatherDay {
    /// Build a forecast day from raw measurements, deriving chance,
    /// advisories, and outdoor suitability
    #[must_use]
    pub fn from_measurements(
        date: NaiveDate,
        condition: String,
        low_c: f64,
        high_c: f64,
        precipitation_mm: f64,
        rain_mm: f64,
        snow_mm: f64,
    ) -> Self {
        let precipitation_chance = precipitation_chance_bucket(precipitation_mm);
        let is_thunderstorm = condition.to_lowercase().contains("thunderstorm");

        let mut advisories = Vec::new();
        if is_thunderstorm {
            advisories.push("Thunderstorms expected".to_owned());
        }
        if precipitation_mm >= HEAVY_PRECIP_MM {
            advisories.push("Heavy precipitation expected".to_owned());
        }
        if snow_mm >= SIGNIFICANT_SNOW_MM {
            advisories.push("Significant snowfall expected".to_owned());
        }
        if high_c >= HEAT_ADVISORY_HIGH_C {
            advisories.push("High heat, plan for shade and water".to_owned());
        }
        if low_c <= COLD_ADVISORY_LOW_C {
            advisories.push("Severe cold, limit outdoor exposure".to_owned());
        }

        let mut suitability_reasons = Vec::new();
        if is_thunderstorm {
            suitability_reasons.push("thunderstorms".to_owned());
        }
        if precipitation_chance >= 80 {
            suitability_reasons.push(format!("{precipitation_chance}% precipitation chance"));
        }
        if snow_mm >= SIGNIFICANT_SNOW_MM {
            suitability_reasons.push(format!("{snow_mm:.0}mm snowfall"));
        }
        if high_c < OUTDOOR_MIN_HIGH_C {
            suitability_reasons.push(format!("daytime high only {high_c:.0}°C"));
        }

        Self {
            date,
            condition,
            temperature_range: (low_c, high_c),
            precipitation_mm,
            rain_mm,
            snow_mm,
            precipitation_chance,
            suitable_for_outdoor: suitability_reasons.is_empty(),
            suitability_reasons,
            advisories,
        }
    }
}

/// Bucket precipitation volume into a coarse chance percentage
fn precipitation_chance_bucket(precipitation_mm: f64) -> u8 {
    if precipitation_mm <= 0.0 {
        5
    } else if precipitation_mm < 1.0 {
        20
    } else if precipitation_mm < 5.0 {
        50
    } else if precipitation_mm < 15.0 {
        80
    } else {
        95
    }
}

/// Human-readable summary of a week's forecast, used in prompts and snapshots
#[must_use]
pub fn summarize_forecast(days: &[WeatherDay]) -> String {
    if days.is_empty() {
        return "No forecast available".to_owned();
    }

    let outdoor_days = days.iter().filter(|d| d.suitable_for_outdoor).count();
    let avg_high: f64 =
        days.iter().map(|d| d.temperature_range.1).sum::<f64>() / days.len() as f64;
    let total_precip: f64 = days.iter().map(|d| d.precipitation_mm).sum();

    let mut conditions: Vec<&str> = days.iter().map(|d| d.condition.as_str()).collect();
    conditions.sort_unstable();
    conditions.dedup();

    let mut summary = format!(
        "{} of {} days suitable for outdoor activities; avg high {:.0}°C; \
         {:.0}mm total precipitation; conditions: {}",
        outdoor_days,
        days.len(),
        avg_high,
        total_precip,
        conditions.join(", ")
    );

    let mut advisories: Vec<&str> = days
        .iter()
        .flat_map(|d| d.advisories.iter().map(String::as_str))
        .collect();
    advisories.sort_unstable();
    advisories.dedup();
    if !advisories.is_empty() {
        summary.push_str("; advisories: ");
        summary.push_str(&advisories.join(", "));
    }

    summary
}

/// Forecast lookup parameters
#[derive(Debug, Clone)]
pub struct WeatherQuery {
    /// Free-form place name, geocoded when coordinates are absent
    pub location: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub week_start: NaiveDate,
}

/// Source of weekly forecasts
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn get_weekly_forecast(&self, query: &WeatherQuery) -> AppResult<Vec<WeatherDay>>;
}

/// Open-Meteo client (geocoding + daily forecast, no API key required)
pub struct OpenMeteoWeatherService {
    client: reqwest::Client,
    forecast_days: u8,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct ForecastResponse {
    daily: DailyForecast,
}

#[derive(Deserialize)]
struct DailyForecast {
    time: Vec<NaiveDate>,
    weathercode: Vec<u16>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_sum: Vec<f64>,
    rain_sum: Vec<f64>,
    snowfall_sum: Vec<f64>,
}

impl OpenMeteoWeatherService {
    #[must_use]
    pub fn new(forecast_days: u8) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            forecast_days,
        }
    }

    async fn geocode(&self, location: &str) -> Result<(f64, f64), WeatherError> {
        let response: GeocodingResponse = self
            .client
            .get(GEOCODING_URL)
            .query(&[("name", location), ("count", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .results
            .first()
            .map(|r| (r.latitude, r.longitude))
            .ok_or_else(|| WeatherError::LocationNotFound(location.to_owned()))
    }

    async fn fetch_daily(&self, lat: f64, lon: f64) -> Result<Vec<WeatherDay>, WeatherError> {
        let response: ForecastResponse = self
            .client
            .get(FORECAST_URL)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                (
                    "daily",
                    "weathercode,temperature_2m_max,temperature_2m_min,\
                     precipitation_sum,rain_sum,snowfall_sum"
                        .to_owned(),
                ),
                ("timezone", "auto".to_owned()),
                ("forecast_days", self.forecast_days.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let daily = response.daily;
        let n = daily.time.len();
        if daily.weathercode.len() != n
            || daily.temperature_2m_max.len() != n
            || daily.temperature_2m_min.len() != n
        {
            return Err(WeatherError::MalformedResponse(
                "daily arrays have mismatched lengths".to_owned(),
            ));
        }

        let days = (0..n)
            .map(|i| {
                WeatherDay::from_measurements(
                    daily.time[i],
                    wmo_code_condition(daily.weathercode[i]).to_owned(),
                    daily.temperature_2m_min[i],
                    daily.temperature_2m_max[i],
                    daily.precipitation_sum.get(i).copied().unwrap_or(0.0),
                    daily.rain_sum.get(i).copied().unwrap_or(0.0),
                    daily.snowfall_sum.get(i).copied().unwrap_or(0.0),
                )
            })
            .collect();
        Ok(days)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeatherService {
    async fn get_weekly_forecast(&self, query: &WeatherQuery) -> AppResult<Vec<WeatherDay>> {
        let (lat, lon) = match (query.coordinates, query.location.as_deref()) {
            (Some(coords), _) => coords,
            (None, Some(location)) => self.geocode(location).await?,
            (None, None) => return Err(WeatherError::MissingLocation.into()),
        };

        let days = self.fetch_daily(lat, lon).await?;
        debug!(days = days.len(), lat, lon, "forecast retrieved");
        Ok(days)
    }
}

/// Map a WMO weather code to a condition label
#[must_use]
pub const fn wmo_code_condition(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 => "Light rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 | 67 => "Freezing rain",
        71 => "Light snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        77 => "Snow grains",
        80 | 81 => "Rain showers",
        82 => "Violent rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(condition: &str, low: f64, high: f64, precip: f64, snow: f64) -> WeatherDay {
        WeatherDay::from_measurements(
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            condition.to_owned(),
            low,
            high,
            precip,
            precip - snow,
            snow,
        )
    }

    #[test]
    fn test_precipitation_chance_buckets() {
        assert_eq!(precipitation_chance_bucket(0.0), 5);
        assert_eq!(precipitation_chance_bucket(0.5), 20);
        assert_eq!(precipitation_chance_bucket(3.0), 50);
        assert_eq!(precipitation_chance_bucket(10.0), 80);
        assert_eq!(precipitation_chance_bucket(20.0), 95);
    }

    #[test]
    fn test_heavy_precipitation_day() {
        let wet = day("Heavy rain", 12.0, 18.0, 20.0, 0.0);
        assert_eq!(wet.precipitation_chance, 95);
        assert!(!wet.suitable_for_outdoor);
        assert!(wet
            .advisories
            .iter()
            .any(|a| a == "Heavy precipitation expected"));
    }

    #[test]
    fn test_clear_mild_day_is_suitable() {
        let nice = day("Clear sky", 14.0, 24.0, 0.0, 0.0);
        assert!(nice.suitable_for_outdoor);
        assert!(nice.advisories.is_empty());
        assert_eq!(nice.precipitation_chance, 5);
    }

    #[test]
    fn test_cold_day_unsuitable_with_reason() {
        let cold = day("Clear sky", -10.0, 2.0, 0.0, 0.0);
        assert!(!cold.suitable_for_outdoor);
        assert!(cold.suitability_reasons.iter().any(|r| r.contains("2°C")));
        assert!(cold
            .advisories
            .iter()
            .any(|a| a.contains("Severe cold")));
    }

    #[test]
    fn test_thunderstorm_short_circuits_suitability() {
        let storm = day("Thunderstorm", 18.0, 26.0, 0.5, 0.0);
        assert!(!storm.suitable_for_outdoor);
        assert!(storm.advisories.iter().any(|a| a.contains("Thunderstorms")));
    }

    #[test]
    fn test_summary_counts_outdoor_days_and_advisories() {
        let days = vec![
            day("Clear sky", 14.0, 24.0, 0.0, 0.0),
            day("Heavy rain", 12.0, 18.0, 20.0, 0.0),
        ];
        let summary = summarize_forecast(&days);
        assert!(summary.starts_with("1 of 2 days suitable"));
        assert!(summary.contains("Heavy precipitation expected"));
    }

    #[test]
    fn test_empty_forecast_summary() {
        assert_eq!(summarize_forecast(&[]), "No forecast available");
    }

    #[test]
    fn test_wmo_codes() {
        assert_eq!(wmo_code_condition(0), "Clear sky");
        assert_eq!(wmo_code_condition(95), "Thunderstorm");
        assert_eq!(wmo_code_condition(200), "Unknown");
    }
}
