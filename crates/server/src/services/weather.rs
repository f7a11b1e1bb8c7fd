use serde::{Deserialize, Serialize};

use crate::{
    db::models::Weather,
    error::{AppError, Result},
};

/// Current conditions at a coordinate, reduced to the four site conditions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub wind_speed: f64,
    pub weather_code: i64,
    pub condition: Weather,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i64,
}

/// Maps a WMO weather code to a site condition.
pub fn condition_for_code(code: i64) -> Weather {
    match code {
        0 | 1 => Weather::Sunny,
        2 | 3 | 45 | 48 => Weather::Cloudy,
        51..=67 | 71..=77 | 80..=86 => Weather::Rainy,
        95..=99 => Weather::Storm,
        _ => Weather::Cloudy,
    }
}

#[derive(Clone)]
pub struct WeatherService {
    client: reqwest::Client,
    api_url: String,
}

impl WeatherService {
    pub fn new(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
        }
    }

    pub async fn forecast(&self, latitude: f64, longitude: f64) -> Result<Forecast> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<ForecastResponse>()
            .await?;

        let current = resp
            .current_weather
            .ok_or_else(|| AppError::Upstream("Forecast response had no current weather".to_string()))?;

        Ok(Forecast {
            latitude,
            longitude,
            temperature: current.temperature,
            wind_speed: current.windspeed,
            weather_code: current.weathercode,
            condition: condition_for_code(current.weathercode),
        })
    }
}
