//! Provider payload normalization.
//!
//! Turns the loosely structured Visual Crossing timeline response into a
//! [`WeatherResult`]. Missing optional fields never fail; they become `None`.

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::weather::{CurrentConditions, Precipitation, Sun, Temperature, WeatherResult, Wind};

const UNKNOWN_CITY: &str = "Unknown";

/// Normalize a raw provider payload.
///
/// Some deployments wrap the timeline response in a `message` object; it is
/// unwrapped when present. Only a payload without a top-level object is an
/// error.
pub fn normalize(raw: &Value) -> Result<WeatherResult> {
    let outer = raw.as_object().ok_or_else(|| {
        CoreError::malformed_payload(format!("expected a JSON object, got {}", kind(raw)))
    })?;
    let msg = outer
        .get("message")
        .and_then(Value::as_object)
        .unwrap_or(outer);

    let city = non_empty_str(msg, "resolvedAddress")
        .or_else(|| non_empty_str(msg, "address"))
        .unwrap_or_else(|| UNKNOWN_CITY.to_string());

    let empty = Map::new();
    let today = msg
        .get("days")
        .and_then(Value::as_array)
        .and_then(|days| days.first())
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let current = msg
        .get("currentConditions")
        .and_then(Value::as_object)
        .filter(|block| !block.is_empty())
        .map(|block| CurrentConditions {
            time: str_field(block, "datetime"),
            conditions: str_field(block, "conditions"),
            temp_c: num_field(block, "temp"),
            feels_like_c: num_field(block, "feelslike"),
        });

    Ok(WeatherResult {
        city,
        date: str_field(today, "datetime"),
        timezone: str_field(msg, "timezone"),
        summary: str_field(today, "description").or_else(|| str_field(msg, "description")),
        conditions: str_field(today, "conditions"),
        temperature: Temperature {
            average: num_field(today, "temp"),
            high: num_field(today, "tempmax"),
            low: num_field(today, "tempmin"),
            feels_like: num_field(today, "feelslike"),
        },
        precipitation: Precipitation {
            amount_mm: num_field(today, "precip"),
            chance_percent: num_field(today, "precipprob"),
            types: str_list(today, "preciptype"),
            snow: num_field(today, "snow"),
        },
        wind: Wind {
            speed_kmh: num_field(today, "windspeed"),
            gust_kmh: num_field(today, "windgust"),
            direction_degrees: num_field(today, "winddir"),
        },
        sun: Sun {
            sunrise: str_field(today, "sunrise"),
            sunset: str_field(today, "sunset"),
        },
        current,
    })
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    str_field(obj, key).filter(|s| !s.is_empty())
}

fn num_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

fn str_list(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    obj.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
