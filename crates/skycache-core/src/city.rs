//! City names and the cache keys derived from them.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, Result};

/// Maximum length of a city name, in characters, after trimming.
pub const MAX_CITY_LEN: usize = 60;

/// Letters (including accented Latin), spaces, comma, period, apostrophe, hyphen.
static CITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-zÀ-ÖØ-öø-ÿ ,.'\-]+$").expect("city pattern is a valid regex")
});

/// A validated, trimmed city name.
///
/// Construction goes through [`CityName::parse`], so holding a `CityName`
/// means the input already passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityName(String);

impl CityName {
    /// Trim and validate a raw city name from a request.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_city("City name must not be empty"));
        }
        if trimmed.chars().count() > MAX_CITY_LEN {
            return Err(CoreError::invalid_city(format!(
                "City name must be at most {MAX_CITY_LEN} characters"
            )));
        }
        if !CITY_PATTERN.is_match(trimmed) {
            return Err(CoreError::invalid_city("City contains invalid characters"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key for this city.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_city(&self.0)
    }
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key under which a normalized result is cached.
///
/// Inputs that differ only by case or surrounding whitespace share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub const PREFIX: &'static str = "weather:";

    pub fn for_city(city: &str) -> Self {
        Self(format!("{}{}", Self::PREFIX, city.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
