pub mod city;
pub mod error;
pub mod normalize;
pub mod weather;

pub use city::{CacheKey, CityName, MAX_CITY_LEN};
pub use error::{CoreError, Result};
pub use normalize::normalize;
pub use weather::{CurrentConditions, Precipitation, Sun, Temperature, WeatherResult, Wind};
