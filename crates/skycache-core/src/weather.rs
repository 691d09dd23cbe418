use serde::{Deserialize, Serialize};

/// Normalized weather record returned to clients and stored in the cache.
///
/// Every optional field serializes as `null` when the provider did not
/// supply it, so consumers can tell "unknown" apart from zero. The one
/// exception is `current`, which is omitted entirely when the provider
/// sent no current-conditions block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub city: String,
    pub date: Option<String>,
    pub timezone: Option<String>,
    pub summary: Option<String>,
    pub conditions: Option<String>,
    pub temperature: Temperature,
    pub precipitation: Precipitation,
    pub wind: Wind,
    pub sun: Sun,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentConditions>,
}

/// Temperatures in degrees Celsius.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub average: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub feels_like: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    pub amount_mm: Option<f64>,
    pub chance_percent: Option<f64>,
    pub types: Option<Vec<String>>,
    pub snow: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_kmh: Option<f64>,
    pub gust_kmh: Option<f64>,
    pub direction_degrees: Option<f64>,
}

/// Local sunrise/sunset times as reported by the provider (`HH:MM:SS`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sun {
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub time: Option<String>,
    pub conditions: Option<String>,
    pub temp_c: Option<f64>,
    pub feels_like_c: Option<f64>,
}
